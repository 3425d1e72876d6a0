//! Device grouping.
//!
//! Collapses redundant pair members (`-r1`/`-r2`), virtual instances
//! (`-v1`) and fan-out families into one display node each. Input is
//! sorted up front, so the result does not depend on arrival order.

use super::classify::Classifier;
use crate::config::{GroupingConfig, MixedReplicaPolicy};
use crate::types::{DeviceGroup, GroupKey, ReplicaKind, ReplicaSuffix, SiteId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Device -> group assignment plus group metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    pub assignment: BTreeMap<String, GroupKey>,
    pub groups: BTreeMap<GroupKey, DeviceGroup>,
}

impl Grouping {
    pub fn key_of(&self, device: &str) -> Option<&GroupKey> {
        self.assignment.get(device)
    }
}

type ReplicaMember = (String, ReplicaSuffix);

/// Groups `devices` relative to `target`.
pub fn group<I, S>(
    devices: I,
    classifier: &mut Classifier,
    target: &SiteId,
    config: &GroupingConfig,
) -> Grouping
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let sorted: BTreeSet<String> = devices
        .into_iter()
        .map(|d| d.as_ref().to_string())
        .collect();

    let mut fan_out: BTreeMap<GroupKey, Vec<String>> = BTreeMap::new();
    let mut replicas: BTreeMap<String, Vec<ReplicaMember>> = BTreeMap::new();
    let mut singles: Vec<String> = Vec::new();

    for name in &sorted {
        let attrs = classifier.attributes(name);
        if config.fan_out && attrs.category.is_fan_out() {
            if let Some(site) = &attrs.site {
                let key = GroupKey::fan_out(site, attrs.category);
                fan_out.entry(key).or_default().push(name.clone());
                continue;
            }
        }

        let split = attrs.replica.as_ref().and_then(|suffix| {
            let base = name.strip_suffix(&format!("-{}", suffix))?;
            Some((base.to_string(), suffix.clone()))
        });
        match split {
            Some((base, suffix)) => replicas
                .entry(base)
                .or_default()
                .push((name.clone(), suffix)),
            None => singles.push(name.clone()),
        }
    }

    let mut out = Grouping::default();

    for (key, members) in fan_out {
        let label = match members.as_slice() {
            [only] => only.clone(),
            // key is "<site>-<tag>*"
            _ => key.as_str().trim_end_matches('*').to_string(),
        };
        insert_group(&mut out, classifier, key, members, label);
    }

    for (base, members) in replicas {
        for (key, part) in partition(&base, members, target, config.mixed_replicas) {
            let label = replica_label(&base, &part);
            let names = part.into_iter().map(|(name, _)| name).collect();
            insert_group(&mut out, classifier, key, names, label);
        }
    }

    for name in singles {
        let key = GroupKey::device(&name);
        let label = name.clone();
        insert_group(&mut out, classifier, key, vec![name], label);
    }

    debug!(
        devices = out.assignment.len(),
        groups = out.groups.len(),
        policy = config.mixed_replicas.as_str(),
        "grouped devices"
    );
    out
}

/// Splits one base's members into groups according to the mixed-kind policy.
fn partition(
    base: &str,
    members: Vec<ReplicaMember>,
    target: &SiteId,
    policy: MixedReplicaPolicy,
) -> Vec<(GroupKey, Vec<ReplicaMember>)> {
    let kinds: BTreeSet<ReplicaKind> = members.iter().map(|(_, s)| s.kind).collect();

    let split = kinds.len() == 1
        || match policy {
            MixedReplicaPolicy::SplitEverywhere => true,
            MixedReplicaPolicy::MergeEverywhere => false,
            MixedReplicaPolicy::SplitAtTarget => {
                SiteId::of_device(base).as_ref() == Some(target)
            }
        };

    if !split {
        return vec![(GroupKey::mixed(base), members)];
    }

    let mut by_kind: BTreeMap<ReplicaKind, Vec<ReplicaMember>> = BTreeMap::new();
    for member in members {
        by_kind.entry(member.1.kind).or_default().push(member);
    }
    by_kind
        .into_iter()
        .map(|(kind, part)| (GroupKey::replica(base, kind), part))
        .collect()
}

/// `base-r[1,2]` for one kind, `base-[r1,v1]` for a merged group,
/// the bare name for a single member.
fn replica_label(base: &str, members: &[ReplicaMember]) -> String {
    if let [(only, _)] = members {
        return only.clone();
    }

    let mut suffixes: Vec<&ReplicaSuffix> = members.iter().map(|(_, s)| s).collect();
    suffixes.sort_by(|x, y| {
        x.kind
            .cmp(&y.kind)
            .then_with(|| numeric(&x.digits).cmp(&numeric(&y.digits)))
            .then_with(|| x.digits.cmp(&y.digits))
    });

    let first_kind = suffixes.first().map(|s| s.kind);
    if suffixes.iter().all(|s| Some(s.kind) == first_kind) {
        let digits: Vec<&str> = suffixes.iter().map(|s| s.digits.as_str()).collect();
        let letter = first_kind.map_or('r', |k| k.letter());
        format!("{}-{}[{}]", base, letter, digits.join(","))
    } else {
        let parts: Vec<String> = suffixes.iter().map(|s| s.to_string()).collect();
        format!("{}-[{}]", base, parts.join(","))
    }
}

fn numeric(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}

fn insert_group(
    out: &mut Grouping,
    classifier: &mut Classifier,
    key: GroupKey,
    members: Vec<String>,
    label: String,
) {
    let Some(first) = members.first() else {
        return;
    };
    let lead = classifier.attributes(first).clone();

    let sites: BTreeSet<SiteId> = members
        .iter()
        .filter_map(|m| classifier.attributes(m).site.clone())
        .collect();

    for member in &members {
        out.assignment.insert(member.clone(), key.clone());
    }

    out.groups.insert(
        key.clone(),
        DeviceGroup {
            key,
            members,
            label,
            category: lead.category,
            role: lead.role,
            color: lead.color,
            sites: sites.into_iter().collect(),
        },
    );
}
