//! Grid layout.
//!
//! Groups are partitioned into buckets (local, intra-domain,
//! inter-domain, peripheral) and placed bucket by bucket on a
//! fixed-pitch grid, sorted by group key inside each bucket.

use crate::config::LayoutConfig;
use crate::types::{Bucket, Category, DeviceGroup, LayoutNode, SiteId, SiteRelation, TopologyGraph};
use tracing::debug;

/// Bucket for one group relative to the target site.
pub fn bucket_of(group: &DeviceGroup, target: &SiteId) -> Bucket {
    match group.relation_to(target) {
        SiteRelation::Local => Bucket::Local,
        _ if group.category == Category::Unknown => Bucket::Peripheral,
        SiteRelation::IntraDomain => Bucket::IntraDomain,
        SiteRelation::InterDomain => Bucket::InterDomain,
        SiteRelation::Unplaced => Bucket::Peripheral,
    }
}

/// Places every group of `graph`. Same graph and config, same positions.
pub fn layout(graph: &TopologyGraph, target: &SiteId, config: &LayoutConfig) -> Vec<LayoutNode> {
    let mut nodes = Vec::with_capacity(graph.groups.len());
    let mut top = config.origin_y;

    for bucket in Bucket::ALL {
        // BTreeMap iteration is already key order
        let members: Vec<&DeviceGroup> = graph
            .groups
            .values()
            .filter(|g| bucket_of(g, target) == bucket)
            .collect();
        if members.is_empty() {
            continue;
        }

        let columns = config.columns.for_bucket(bucket).max(1);
        for (i, group) in (0u32..).zip(&members) {
            nodes.push(LayoutNode {
                key: group.key.clone(),
                bucket,
                x: config.origin_x + (i % columns) * config.pitch_x,
                y: top + (i / columns) * config.pitch_y,
                width: config.node_width,
                height: config.node_height,
            });
        }

        let rows = (members.len() as u32).div_ceil(columns);
        debug!(bucket = bucket.as_str(), nodes = members.len(), rows, "placed bucket");
        top += rows * config.pitch_y + config.bucket_gap;
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GroupingConfig;
    use crate::fabric::classify::Classifier;
    use crate::fabric::group::group;

    fn target() -> SiteId {
        SiteId::parse("bjs11-11").expect("valid site")
    }

    fn graph(devices: &[&str]) -> TopologyGraph {
        let grouping = group(
            devices.iter(),
            &mut Classifier::new(),
            &target(),
            &GroupingConfig::default(),
        );
        TopologyGraph {
            groups: grouping.groups,
            edges: Vec::new(),
        }
    }

    fn placed<'a>(nodes: &'a [LayoutNode], key: &str) -> &'a LayoutNode {
        nodes
            .iter()
            .find(|n| n.key.as_str() == key)
            .expect("node placed")
    }

    #[test]
    fn test_bucket_assignment() {
        let g = graph(&[
            "bjs11-11-es-cor-r1",
            "bjs11-50-es-cor-r1",
            "pkx140-140-es-cor-r1",
            "bjs11-11-weird",
            "pkx140-140-weird",
            "fw2",
        ]);
        let buckets: Vec<(&str, Bucket)> = g
            .groups
            .values()
            .map(|grp| (grp.label.as_str(), bucket_of(grp, &target())))
            .collect();
        assert_eq!(
            buckets,
            vec![
                ("bjs11-11-es-cor-r1", Bucket::Local),
                ("bjs11-11-weird", Bucket::Local),
                ("bjs11-50-es-cor-r1", Bucket::IntraDomain),
                ("fw2", Bucket::Peripheral),
                ("pkx140-140-es-cor-r1", Bucket::InterDomain),
                ("pkx140-140-weird", Bucket::Peripheral),
            ]
        );
    }

    #[test]
    fn test_buckets_placed_in_order() {
        let g = graph(&["fw2", "pkx140-140-es-cor-r1", "bjs11-50-es-cor-r1", "bjs11-11-es-cor-r1"]);
        let nodes = layout(&g, &target(), &LayoutConfig::default());
        let order: Vec<Bucket> = nodes.iter().map(|n| n.bucket).collect();
        assert_eq!(
            order,
            vec![Bucket::Local, Bucket::IntraDomain, Bucket::InterDomain, Bucket::Peripheral]
        );
        let ys: Vec<u32> = nodes.iter().map(|n| n.y).collect();
        // one row each: 100, then + 150 pitch + 150 gap
        assert_eq!(ys, vec![100, 400, 700, 1000]);
        assert!(nodes.iter().all(|n| n.x == 120 && n.width == 220 && n.height == 90));
    }

    #[test]
    fn test_rows_wrap_at_column_count() {
        let devices: Vec<String> = (1..=5).map(|i| format!("bjs11-11-dev{i}")).collect();
        let g = graph(&devices.iter().map(String::as_str).collect::<Vec<_>>());
        let nodes = layout(&g, &target(), &LayoutConfig::default());
        let fifth = placed(&nodes, "bjs11-11-dev5");
        assert_eq!((fifth.x, fifth.y), (120, 250));
        let fourth = placed(&nodes, "bjs11-11-dev4");
        assert_eq!((fourth.x, fourth.y), (120 + 3 * 280, 100));
    }

    #[test]
    fn test_next_bucket_starts_below_last_row() {
        let mut devices: Vec<String> = (1..=5).map(|i| format!("bjs11-11-dev{i}")).collect();
        devices.push("bjs11-50-es-cor-r1".to_string());
        let g = graph(&devices.iter().map(String::as_str).collect::<Vec<_>>());
        let nodes = layout(&g, &target(), &LayoutConfig::default());
        let intra = placed(&nodes, "bjs11-50-es-cor-r1");
        // two local rows: 100 + 2*150 + 150
        assert_eq!(intra.y, 550);
        let last_local = nodes
            .iter()
            .filter(|n| n.bucket == Bucket::Local)
            .map(|n| n.y + n.height)
            .max()
            .expect("local nodes");
        assert!(intra.y > last_local);
    }

    #[test]
    fn test_layout_is_deterministic_and_non_overlapping() {
        let devices = [
            "bjs11-11-es-cor-r1",
            "bjs11-11-es-cor-r2",
            "bjs11-11-es-mgmt-cor-r1",
            "bjs11-11-tt-acc-r1",
            "bjs11-11-co-agg-r1",
            "bjs11-50-es-cor-r1",
            "pkx140-140-es-cor-r1",
            "fw2",
            "fw3",
        ];
        let g = graph(&devices);
        let first = layout(&g, &target(), &LayoutConfig::default());
        let second = layout(&g, &target(), &LayoutConfig::default());
        assert_eq!(first, second);
        assert_eq!(first.len(), g.groups.len());

        for (i, a) in first.iter().enumerate() {
            for b in &first[i + 1..] {
                let apart_x = a.x + a.width <= b.x || b.x + b.width <= a.x;
                let apart_y = a.y + a.height <= b.y || b.y + b.height <= a.y;
                assert!(apart_x || apart_y, "{} overlaps {}", a.key, b.key);
            }
        }
    }

    #[test]
    fn test_custom_columns() {
        let mut config = LayoutConfig::default();
        config.columns.local = 1;
        let g = graph(&["bjs11-11-a", "bjs11-11-b"]);
        let nodes = layout(&g, &target(), &config);
        assert_eq!(nodes[0].x, nodes[1].x);
        assert_eq!(nodes[1].y, nodes[0].y + 150);
    }
}
