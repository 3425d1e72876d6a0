//! Site filtering: the target site's groups plus their direct neighbors.

use crate::types::{GroupKey, SiteId, TopologyGraph};
use std::collections::BTreeSet;
use tracing::debug;

/// Restricts `graph` to groups local to `target` and groups one hop away.
/// Edges survive only if both endpoints do.
pub fn filter_to_site(graph: &TopologyGraph, target: &SiteId) -> TopologyGraph {
    let local: BTreeSet<&GroupKey> = graph
        .groups
        .values()
        .filter(|g| g.has_member_at(target))
        .map(|g| &g.key)
        .collect();

    let mut retained = local.clone();
    for edge in &graph.edges {
        for key in &local {
            if let Some(other) = edge.other(key) {
                retained.insert(other);
            }
        }
    }

    let groups = graph
        .groups
        .iter()
        .filter(|(key, _)| retained.contains(key))
        .map(|(key, g)| (key.clone(), g.clone()))
        .collect();

    let edges = graph
        .edges
        .iter()
        .filter(|e| retained.contains(&e.a) && retained.contains(&e.b))
        .cloned()
        .collect();

    let out = TopologyGraph { groups, edges };
    debug!(
        site = %target,
        local = local.len(),
        kept_groups = out.groups.len(),
        dropped_groups = graph.groups.len() - out.groups.len(),
        kept_edges = out.edges.len(),
        "filtered to site"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GroupingConfig;
    use crate::fabric::canonical::canonicalize;
    use crate::fabric::classify::Classifier;
    use crate::fabric::group::group;
    use crate::types::{EdgeCategory, RawEdge};

    fn graph(devices: &[&str], links: &[(&str, &str)], target: &SiteId) -> TopologyGraph {
        let grouping = group(
            devices.iter(),
            &mut Classifier::new(),
            target,
            &GroupingConfig::default(),
        );
        let raw: Vec<RawEdge> = links
            .iter()
            .map(|(a, b)| RawEdge::new(a, b, EdgeCategory::Physical))
            .collect();
        let edges = canonicalize(&raw, &grouping, false).edges;
        TopologyGraph {
            groups: grouping.groups,
            edges,
        }
    }

    fn keys(g: &TopologyGraph) -> Vec<&str> {
        g.groups.keys().map(|k| k.as_str()).collect()
    }

    #[test]
    fn test_keeps_local_and_adjacent() {
        let target = SiteId::parse("s1-1").expect("valid site");
        let g = graph(
            &["s1-1-foo", "s2-2-foo", "s3-3-bar"],
            &[("s1-1-foo", "s2-2-foo")],
            &target,
        );
        let out = filter_to_site(&g, &target);
        assert_eq!(keys(&out), vec!["s1-1-foo", "s2-2-foo"]);
        assert_eq!(out.edges.len(), 1);
    }

    #[test]
    fn test_two_hop_neighbors_dropped() {
        let target = SiteId::parse("s1-1").expect("valid site");
        let g = graph(
            &["s1-1-a", "s2-2-b", "s3-3-c", "s4-4-d"],
            &[("s1-1-a", "s2-2-b"), ("s2-2-b", "s3-3-c"), ("s3-3-c", "s4-4-d")],
            &target,
        );
        let out = filter_to_site(&g, &target);
        assert_eq!(keys(&out), vec!["s1-1-a", "s2-2-b"]);
        assert_eq!(out.edges.len(), 1);
    }

    #[test]
    fn test_edges_between_neighbors_survive() {
        let target = SiteId::parse("s1-1").expect("valid site");
        let g = graph(
            &["s1-1-a", "s2-2-b", "s3-3-c"],
            &[("s1-1-a", "s2-2-b"), ("s1-1-a", "s3-3-c"), ("s2-2-b", "s3-3-c")],
            &target,
        );
        let out = filter_to_site(&g, &target);
        assert_eq!(out.groups.len(), 3);
        assert_eq!(out.edges.len(), 3);
    }

    #[test]
    fn test_closure_holds() {
        let target = SiteId::parse("s1-1").expect("valid site");
        let g = graph(
            &["s1-1-a-r1", "s1-1-a-r2", "s2-2-b", "s3-3-c", "fw2", "s1-1-lonely"],
            &[("s1-1-a-r1", "s2-2-b"), ("s2-2-b", "s3-3-c"), ("fw2", "s1-1-a-r2"), ("s3-3-c", "fw2")],
            &target,
        );
        let out = filter_to_site(&g, &target);
        for (key, grp) in &out.groups {
            let adjacent = out
                .edges
                .iter()
                .filter_map(|e| e.other(key))
                .any(|other| out.groups[other].has_member_at(&target));
            assert!(grp.has_member_at(&target) || adjacent, "{key} not justified");
        }
        for e in &out.edges {
            assert!(out.groups.contains_key(&e.a) && out.groups.contains_key(&e.b));
        }
        assert!(out.groups.contains_key(&GroupKey::device("s1-1-lonely")));
        assert!(!out.groups.contains_key(&GroupKey::device("s3-3-c")));
    }

    #[test]
    fn test_no_local_groups_gives_empty_graph() {
        let target = SiteId::parse("s9-9").expect("valid site");
        let g = graph(&["s1-1-a", "s2-2-b"], &[("s1-1-a", "s2-2-b")], &target);
        let out = filter_to_site(&g, &target);
        assert_eq!(out, TopologyGraph::default());
    }
}
