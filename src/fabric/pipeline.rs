//! End-to-end run: extraction output in, diagram document out.

use super::canonical::canonicalize;
use super::classify::Classifier;
use super::drawio::{emit, DiagramDocument};
use super::extract::{extract, ExtractContext, Extraction, SourceFormat};
use super::filter::filter_to_site;
use super::group::group;
use super::layout::layout;
use crate::config::Config;
use crate::error::TopologyResult;
use crate::types::{
    Bucket, Category, EdgeCategory, GroupKey, LayoutNode, SiteId, TopologyGraph,
};
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Per-invocation switches that are not part of the config file
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Restrict to the target site and its direct neighbors
    pub filter: bool,
    /// Overrides `[canonical] by_category` when set
    pub by_category: Option<bool>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            filter: true,
            by_category: None,
        }
    }
}

/// Informational counters for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub devices: usize,
    pub raw_edges: usize,
    pub groups: usize,
    pub canonical_edges: usize,
    pub self_loops: usize,
    pub duplicates: usize,
    pub unresolved: usize,
    pub nodes: usize,
    pub connectors: usize,
    /// Share of raw edges removed by canonicalization (0.0 - 1.0)
    pub dedup_ratio: f64,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Devices:          {}", self.devices)?;
        writeln!(f, "Raw connections:  {}", self.raw_edges)?;
        writeln!(f, "Groups:           {}", self.groups)?;
        writeln!(
            f,
            "Connections:      {} ({} self-loops, {} duplicates, {} unresolved dropped)",
            self.canonical_edges, self.self_loops, self.duplicates, self.unresolved
        )?;
        writeln!(f, "Dedup ratio:      {:.1}%", self.dedup_ratio * 100.0)?;
        write!(f, "Diagram:          {} nodes, {} connectors", self.nodes, self.connectors)
    }
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct Outcome {
    pub site: SiteId,
    pub graph: TopologyGraph,
    pub nodes: Vec<LayoutNode>,
    pub document: DiagramDocument,
    pub summary: Summary,
}

/// Reads every source of one format and merges them in order.
pub fn extract_all<'a, I>(format: SourceFormat, sources: I, ctx: &ExtractContext) -> Extraction
where
    I: IntoIterator<Item = &'a str>,
{
    sources
        .into_iter()
        .fold(Extraction::default(), |mut acc, content| {
            acc.merge(extract(format, content, ctx));
            acc
        })
}

/// Runs grouping through emission for `site`.
/// The only error is a malformed site identifier.
pub fn run(
    site: &str,
    extraction: &Extraction,
    config: &Config,
    options: &RunOptions,
) -> TopologyResult<Outcome> {
    let target = SiteId::parse(site)?;
    let by_category = options.by_category.unwrap_or(config.canonical.by_category);

    info!(
        site = %target,
        devices = extraction.devices.len(),
        edges = extraction.edges.len(),
        "building topology"
    );

    let mut classifier = Classifier::new();
    let grouping = group(&extraction.devices, &mut classifier, &target, &config.grouping);
    let canonical = canonicalize(&extraction.edges, &grouping, by_category);

    let full = TopologyGraph {
        groups: grouping.groups,
        edges: canonical.edges,
    };
    let group_count = full.groups.len();
    let edge_count = full.edges.len();

    let graph = if options.filter {
        filter_to_site(&full, &target)
    } else {
        full
    };

    let nodes = layout(&graph, &target, &config.layout);
    let title = format!("{} Topology", target.to_string().to_uppercase());
    let document = emit(&graph, &nodes, &title, config.diagram.first_cell_id);

    let raw_edges = extraction.edges.len();
    let summary = Summary {
        devices: extraction.devices.len(),
        raw_edges,
        groups: group_count,
        canonical_edges: edge_count,
        self_loops: canonical.stats.self_loops,
        duplicates: canonical.stats.duplicates,
        unresolved: canonical.stats.unresolved,
        nodes: document.shapes.len(),
        connectors: document.connectors.len(),
        dedup_ratio: if raw_edges == 0 {
            0.0
        } else {
            1.0 - edge_count as f64 / raw_edges as f64
        },
    };

    info!(
        classified = classifier.cached(),
        groups = summary.groups,
        connections = summary.canonical_edges,
        nodes = summary.nodes,
        connectors = summary.connectors,
        "topology ready"
    );

    Ok(Outcome {
        site: target,
        graph,
        nodes,
        document,
        summary,
    })
}

// ═══════════════════════════════════════
//  Analysis report
// ═══════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub key: GroupKey,
    pub label: String,
    pub role: &'static str,
    pub category: Category,
    pub bucket: Bucket,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    pub from: String,
    pub to: String,
    pub category: EdgeCategory,
}

/// Machine-readable dump of a run
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub site: String,
    pub summary: Summary,
    pub groups: Vec<GroupReport>,
    pub connections: Vec<ConnectionReport>,
}

impl Outcome {
    /// Groups in placement order, connections in edge order.
    pub fn analysis(&self) -> Analysis {
        let groups = self
            .nodes
            .iter()
            .filter_map(|node| {
                let g = self.graph.groups.get(&node.key)?;
                Some(GroupReport {
                    key: g.key.clone(),
                    label: g.label.clone(),
                    role: g.role,
                    category: g.category,
                    bucket: node.bucket,
                    members: g.members.clone(),
                })
            })
            .collect();

        let label = |key: &GroupKey| {
            self.graph
                .groups
                .get(key)
                .map_or_else(|| key.to_string(), |g| g.label.clone())
        };
        let connections = self
            .graph
            .edges
            .iter()
            .map(|e| ConnectionReport {
                from: label(&e.a),
                to: label(&e.b),
                category: e.category,
            })
            .collect();

        Analysis {
            site: self.site.to_string(),
            summary: self.summary.clone(),
            groups,
            connections,
        }
    }
}
