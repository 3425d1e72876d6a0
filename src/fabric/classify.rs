//! Device classification from naming conventions.
//!
//! A device name like `bjs11-11-es-mgmt-cor-r1` carries its site,
//! its role in the fabric and an optional replica suffix. Roles are
//! assigned by an ordered rule table: the first rule that matches wins.

use crate::types::{Category, DeviceAttributes, ReplicaKind, ReplicaSuffix, SiteId};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::trace;

/// `<base>-<kind><digits>` where kind is `r` (physical) or `v` (virtual)
static REPLICA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)-([rv])(\d+)$").expect("Invalid replica regex"));

/// How a rule tests a device name.
pub enum Matcher {
    Contains(&'static str),
    AnyOf(&'static [&'static str]),
    AllOf(&'static [&'static str]),
    EndsWith(&'static str),
}

impl Matcher {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::Contains(needle) => name.contains(needle),
            Matcher::AnyOf(needles) => needles.iter().any(|n| name.contains(n)),
            Matcher::AllOf(needles) => needles.iter().all(|n| name.contains(n)),
            Matcher::EndsWith(suffix) => name.ends_with(suffix),
        }
    }
}

/// A single classification rule.
pub struct Rule {
    pub id: &'static str,
    pub matcher: Matcher,
    pub category: Category,
    pub role: &'static str,
}

/// Most specific first.
pub static RULES: &[Rule] = &[
    Rule {
        id: "mgmt-cor-physical",
        matcher: Matcher::Contains("-mgmt-cor-r"),
        category: Category::ManagementCorePhysical,
        role: "Management Core",
    },
    Rule {
        id: "mgmt-cor-virtual",
        matcher: Matcher::Contains("-mgmt-cor-v"),
        category: Category::ManagementCoreVirtual,
        role: "Virtual Mgmt Core",
    },
    Rule {
        id: "edge-services-core",
        matcher: Matcher::AnyOf(&["-es-cor-r", "-fnc-cor-r"]),
        category: Category::EdgeServicesCore,
        role: "Edge Services Core",
    },
    Rule {
        id: "es-c1-compute",
        matcher: Matcher::AllOf(&["-es-c1-b", "-t1-r"]),
        category: Category::ComputeFabricMember,
        role: "ES-C1 Compute",
    },
    Rule {
        id: "es-c1-mgmt",
        matcher: Matcher::Contains("-es-c1-mgmt"),
        category: Category::ComputeFabricMember,
        role: "ES-C1 Mgmt",
    },
    Rule {
        id: "es-e1-mgmt",
        matcher: Matcher::Contains("-es-e1-mgmt"),
        category: Category::EdgeManagement,
        role: "E1 Edge Mgmt",
    },
    Rule {
        id: "es-e2-mgmt",
        matcher: Matcher::Contains("-es-e2-mgmt"),
        category: Category::EdgeManagement,
        role: "E2 Edge Mgmt",
    },
    Rule {
        id: "es-x1-mgmt",
        matcher: Matcher::Contains("-es-x1-mgmt"),
        category: Category::X1Management,
        role: "X1 Mgmt",
    },
    // Brick-stripped fabric names from ROOT documents
    Rule {
        id: "bfc-fabric",
        matcher: Matcher::EndsWith("-es-c1"),
        category: Category::BfcFabric,
        role: "BFC Fabric",
    },
    Rule {
        id: "onefabric",
        matcher: Matcher::EndsWith("-es-e1"),
        category: Category::OneFabric,
        role: "OneFabric",
    },
    Rule {
        id: "transit-access",
        matcher: Matcher::Contains("-tt-acc"),
        category: Category::TransitAccess,
        role: "Transit Access",
    },
    Rule {
        id: "nap-core",
        matcher: Matcher::Contains("-np-cor"),
        category: Category::TransitAccess,
        role: "NAP Core",
    },
    Rule {
        id: "cv1-agg",
        matcher: Matcher::Contains("-cv1-agg"),
        category: Category::Aggregation,
        role: "CV1 Agg",
    },
    Rule {
        id: "corp-core",
        matcher: Matcher::Contains("-co-cor"),
        category: Category::Aggregation,
        role: "Corp Core",
    },
    Rule {
        id: "corp-agg",
        matcher: Matcher::Contains("-co-agg"),
        category: Category::Aggregation,
        role: "Corp Agg",
    },
];

/// First rule matching `name`, if any.
pub fn match_rule(name: &str) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.matcher.matches(name))
}

/// Derives all attributes of a device from its name. Pure.
pub fn classify(name: &str) -> DeviceAttributes {
    let (category, role) = match match_rule(name) {
        Some(rule) => {
            trace!(device = name, rule = rule.id, "classified");
            (rule.category, rule.role)
        }
        None => (Category::Unknown, "Unknown"),
    };

    DeviceAttributes {
        site: SiteId::of_device(name),
        category,
        role,
        color: category.color(),
        replica: split_replica(name).map(|(_, suffix)| suffix),
    }
}

/// Splits `base-r12` into (`base`, r12). Names without a suffix give None.
pub fn split_replica(name: &str) -> Option<(&str, ReplicaSuffix)> {
    let caps = REPLICA_RE.captures(name)?;
    let base = caps.get(1)?.as_str();
    let kind = caps[2].chars().next().and_then(ReplicaKind::from_letter)?;
    Some((
        base,
        ReplicaSuffix {
            kind,
            digits: caps[3].to_string(),
        },
    ))
}

/// Per-run attribute cache. Each distinct name is classified once.
#[derive(Debug, Default)]
pub struct Classifier {
    cache: HashMap<String, DeviceAttributes>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attributes(&mut self, name: &str) -> &DeviceAttributes {
        self.cache
            .entry(name.to_string())
            .or_insert_with(|| classify(name))
    }

    /// Distinct names classified so far
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_mgmt_core() {
        let attrs = classify("bjs11-11-es-mgmt-cor-r1");
        assert_eq!(attrs.category, Category::ManagementCorePhysical);
        assert_eq!(attrs.role, "Management Core");
        assert_eq!(attrs.color, "#FFE6CC");
        assert_eq!(attrs.site.map(|s| s.to_string()), Some("bjs11-11".into()));
        assert_eq!(attrs.replica.map(|r| r.to_string()), Some("r1".into()));
    }

    #[test]
    fn test_classify_virtual_core() {
        let attrs = classify("bjs11-11-es-mgmt-cor-v1");
        assert_eq!(attrs.category, Category::ManagementCoreVirtual);
        assert_eq!(attrs.replica.map(|r| r.kind), Some(ReplicaKind::Virtual));
    }

    #[test]
    fn test_classify_compute_fabric_needs_both_markers() {
        assert_eq!(
            classify("bjs11-11-es-c1-b11-t1-r13").category,
            Category::ComputeFabricMember
        );
        // brick marker alone is not enough
        assert_eq!(classify("bjs11-11-es-c1-b11-r13").category, Category::Unknown);
    }

    #[test]
    fn test_classify_fabric_names() {
        let bfc = classify("nrt12-56-es-c1");
        assert_eq!(bfc.category, Category::BfcFabric);
        assert_eq!(bfc.site.map(|s| s.to_string()), Some("nrt12-56".into()));
        let one = classify("nrt12-57-es-e1");
        assert_eq!(one.category, Category::OneFabric);
        assert_eq!(one.color, "#E1D5E7");
        // suffix match only, brick members are not fabric names
        assert_ne!(classify("nrt12-56-es-c1-b4").category, Category::BfcFabric);
        assert_eq!(classify("nrt12-56-es-c1-mgmt-r1").category, Category::ComputeFabricMember);
    }

    #[test]
    fn test_x1_mgmt_is_not_fan_out() {
        let attrs = classify("bjs11-11-es-x1-mgmt-r1");
        assert_eq!(attrs.category, Category::X1Management);
        assert_eq!(attrs.color, "#F8CECC");
        assert!(!attrs.category.is_fan_out());
        assert!(classify("bjs11-11-es-e1-mgmt-r1").category.is_fan_out());
    }

    #[test]
    fn test_first_match_wins() {
        // also contains "-es-c1-mgmt", but the mgmt-core rule is earlier
        let rule = match_rule("x1-1-es-c1-mgmt-cor-r1").expect("Should match");
        assert_eq!(rule.id, "mgmt-cor-physical");
    }

    #[test]
    fn test_classify_unknown_is_neutral() {
        let attrs = classify("fw2");
        assert_eq!(attrs.category, Category::Unknown);
        assert_eq!(attrs.role, "Unknown");
        assert_eq!(attrs.color, crate::types::NEUTRAL_COLOR);
        assert!(attrs.site.is_none());
        assert!(attrs.replica.is_none());
    }

    #[test]
    fn test_rule_ids_unique() {
        let mut ids: Vec<&str> = RULES.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), RULES.len());
    }

    #[test]
    fn test_split_replica() {
        let (base, suffix) = split_replica("bjs11-11-es-cor-r101").expect("Should split");
        assert_eq!(base, "bjs11-11-es-cor");
        assert_eq!(suffix.kind, ReplicaKind::Physical);
        assert_eq!(suffix.digits, "101");
        assert!(split_replica("bjs11-11-co-agg-r").is_none());
        assert!(split_replica("fw2").is_none());
        assert!(split_replica("-r1").is_none());
    }

    #[test]
    fn test_classifier_caches() {
        let mut classifier = Classifier::new();
        let first = classifier.attributes("bjs11-11-tt-acc-r1").clone();
        let second = classifier.attributes("bjs11-11-tt-acc-r1").clone();
        assert_eq!(first, second);
        assert_eq!(first.category, Category::TransitAccess);
        assert_eq!(classifier.cached(), 1);
    }
}
