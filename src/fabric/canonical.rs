//! Connection canonicalization.
//!
//! Raw edges are rewritten onto group keys, then reduced to one edge
//! per unordered group pair (or per pair and category).

use super::group::Grouping;
use crate::types::{CanonicalEdge, EdgeCategory, GroupKey, RawEdge};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Counters for what canonicalization threw away
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanonicalStats {
    pub self_loops: usize,
    pub duplicates: usize,
    pub unresolved: usize,
}

/// Canonical edges in first-seen order plus drop counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Canonicalized {
    pub edges: Vec<CanonicalEdge>,
    pub stats: CanonicalStats,
}

type PairKey = (GroupKey, GroupKey, Option<EdgeCategory>);

pub fn canonicalize(edges: &[RawEdge], grouping: &Grouping, by_category: bool) -> Canonicalized {
    let mut seen: HashSet<PairKey> = HashSet::new();
    let mut out = Canonicalized::default();

    for raw in edges {
        let (Some(src), Some(dst)) = (grouping.key_of(&raw.source), grouping.key_of(&raw.target))
        else {
            out.stats.unresolved += 1;
            continue;
        };

        let Some(edge) = CanonicalEdge::between(src.clone(), dst.clone(), raw.category) else {
            trace!(
                group = %src,
                interface = raw.interface.as_deref().unwrap_or("-"),
                "dropped intra-group link"
            );
            out.stats.self_loops += 1;
            continue;
        };

        let key = (
            edge.a.clone(),
            edge.b.clone(),
            by_category.then_some(edge.category),
        );
        if seen.insert(key) {
            out.edges.push(edge);
        } else {
            out.stats.duplicates += 1;
        }
    }

    debug!(
        raw = edges.len(),
        canonical = out.edges.len(),
        self_loops = out.stats.self_loops,
        duplicates = out.stats.duplicates,
        unresolved = out.stats.unresolved,
        "canonicalized edges"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GroupingConfig;
    use crate::fabric::classify::Classifier;
    use crate::fabric::group::group;
    use crate::types::SiteId;

    fn grouping(devices: &[&str]) -> Grouping {
        let target = SiteId::parse("s1-1").expect("valid site");
        group(
            devices.iter(),
            &mut Classifier::new(),
            &target,
            &GroupingConfig::default(),
        )
    }

    #[test]
    fn test_pair_link_is_self_loop() {
        let g = grouping(&["x-r1", "x-r2"]);
        let edges = vec![RawEdge::new("x-r1", "x-r2", EdgeCategory::Physical)];
        let out = canonicalize(&edges, &g, false);
        assert!(out.edges.is_empty());
        assert_eq!(out.stats.self_loops, 1);
    }

    #[test]
    fn test_bidirectional_duplicates_collapse() {
        let g = grouping(&["a-r1", "a-r2", "b-r1", "b-r2"]);
        let edges = vec![
            RawEdge::new("a-r1", "b-r1", EdgeCategory::Physical),
            RawEdge::new("b-r2", "a-r2", EdgeCategory::Physical),
        ];
        let out = canonicalize(&edges, &g, false);
        assert_eq!(out.edges.len(), 1);
        assert_eq!(out.stats.duplicates, 1);
        assert_eq!(out.edges[0].a.as_str(), "a-r*");
        assert_eq!(out.edges[0].b.as_str(), "b-r*");
    }

    #[test]
    fn test_first_seen_category_wins() {
        let g = grouping(&["a", "b"]);
        let edges = vec![
            RawEdge::new("b", "a", EdgeCategory::Ring),
            RawEdge::new("a", "b", EdgeCategory::Peer),
        ];
        let out = canonicalize(&edges, &g, false);
        assert_eq!(out.edges.len(), 1);
        assert_eq!(out.edges[0].category, EdgeCategory::Ring);
    }

    #[test]
    fn test_by_category_keeps_one_per_category() {
        let g = grouping(&["a", "b"]);
        let edges = vec![
            RawEdge::new("a", "b", EdgeCategory::Ring),
            RawEdge::new("b", "a", EdgeCategory::Peer),
            RawEdge::new("b", "a", EdgeCategory::Ring),
        ];
        let out = canonicalize(&edges, &g, true);
        let cats: Vec<EdgeCategory> = out.edges.iter().map(|e| e.category).collect();
        assert_eq!(cats, vec![EdgeCategory::Ring, EdgeCategory::Peer]);
        assert_eq!(out.stats.duplicates, 1);
    }

    #[test]
    fn test_unresolved_endpoints_dropped() {
        let g = grouping(&["a"]);
        let edges = vec![RawEdge::new("a", "ghost", EdgeCategory::Physical)];
        let out = canonicalize(&edges, &g, false);
        assert!(out.edges.is_empty());
        assert_eq!(out.stats.unresolved, 1);
    }

    #[test]
    fn test_no_self_loops_and_unique_pairs() {
        let g = grouping(&["a-r1", "a-r2", "b", "c-r1", "c-r2", "d"]);
        let names = ["a-r1", "a-r2", "b", "c-r1", "c-r2", "d"];
        let mut edges = Vec::new();
        for x in names {
            for y in names {
                edges.push(RawEdge::new(x, y, EdgeCategory::Physical));
            }
        }
        let out = canonicalize(&edges, &g, false);
        let mut pairs = HashSet::new();
        for e in &out.edges {
            assert!(e.a < e.b);
            assert!(pairs.insert((e.a.clone(), e.b.clone())));
        }
        // 4 groups, every pair connected
        assert_eq!(out.edges.len(), 6);
        assert_eq!(
            out.stats.self_loops + out.stats.duplicates + out.edges.len(),
            edges.len()
        );
    }
}
