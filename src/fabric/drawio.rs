//! draw.io document emission.
//!
//! Placed groups become rounded vertex cells, canonical edges become
//! orthogonal connectors. Cell ids count up from a fixed base: shapes
//! first in placement order, then connectors in edge order.

#![allow(clippy::write_with_newline)]
use crate::types::{
    Bucket, CanonicalEdge, Category, DeviceGroup, EdgeCategory, GroupKey, LayoutNode, TopologyGraph,
};
use std::collections::HashMap;
use std::fmt::Write;
use tracing::debug;

// ── Strokes ──
const SHAPE_STROKE: &str = "#000000";
const INTER_DOMAIN_STROKE: &str = "#666666";
const COMPUTE_LINK: &str = "#0066CC";
const INTER_SITE_LINK: &str = "#999999";
const DEFAULT_LINK: &str = "#333333";

const MIN_PAGE_WIDTH: u32 = 3000;
const MIN_PAGE_HEIGHT: u32 = 2000;

// ═══════════════════════════════════════
//  Document model
// ═══════════════════════════════════════

/// One vertex cell
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: u32,
    /// Rich text: bold group label over italic role
    pub label: String,
    pub fill: &'static str,
    pub stroke: &'static str,
    pub stroke_width: f32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One edge cell between two shapes
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub id: u32,
    pub source: u32,
    pub target: u32,
    pub stroke: &'static str,
    pub stroke_width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramDocument {
    pub title: String,
    pub shapes: Vec<Shape>,
    pub connectors: Vec<Connector>,
}

/// Connector stroke for one canonical edge.
pub fn connector_style(
    edge: &CanonicalEdge,
    a: &DeviceGroup,
    b: &DeviceGroup,
) -> (&'static str, f32) {
    let compute = edge.category == EdgeCategory::ComputeFabric
        || a.category == Category::ComputeFabricMember
        || b.category == Category::ComputeFabricMember;
    if compute {
        return (COMPUTE_LINK, 4.0);
    }

    let cross_site = !a.sites.is_empty() && !b.sites.is_empty() && a.sites != b.sites;
    if edge.category == EdgeCategory::InterSite || cross_site {
        return (INTER_SITE_LINK, 2.5);
    }

    let color = match edge.category {
        EdgeCategory::Customer => "#0066CC",
        EdgeCategory::Ring | EdgeCategory::Bgp => "#009900",
        EdgeCategory::Peer | EdgeCategory::FirewallPeer => "#CC0000",
        EdgeCategory::Switch => "#CC6600",
        _ => DEFAULT_LINK,
    };
    (color, 2.5)
}

fn shape_stroke(bucket: Bucket) -> (&'static str, f32) {
    match bucket {
        Bucket::InterDomain => (INTER_DOMAIN_STROKE, 3.0),
        _ => (SHAPE_STROKE, 2.0),
    }
}

/// Builds the document for `nodes` (already placed) and `graph.edges`.
/// Edges whose endpoints were not placed are left out.
pub fn emit(
    graph: &TopologyGraph,
    nodes: &[LayoutNode],
    title: &str,
    first_cell_id: u32,
) -> DiagramDocument {
    let mut next_id = first_cell_id;
    let mut ids: HashMap<&GroupKey, u32> = HashMap::new();
    let mut shapes = Vec::with_capacity(nodes.len());

    for node in nodes {
        let Some(group) = graph.groups.get(&node.key) else {
            continue;
        };
        let (stroke, stroke_width) = shape_stroke(node.bucket);
        shapes.push(Shape {
            id: next_id,
            label: format!("<b>{}</b><br/><i>{}</i>", esc(&group.label), esc(group.role)),
            fill: group.color,
            stroke,
            stroke_width,
            x: node.x,
            y: node.y,
            width: node.width,
            height: node.height,
        });
        ids.insert(&node.key, next_id);
        next_id += 1;
    }

    let mut connectors = Vec::with_capacity(graph.edges.len());
    for edge in &graph.edges {
        let (Some(&source), Some(&target)) = (ids.get(&edge.a), ids.get(&edge.b)) else {
            continue;
        };
        let (Some(a), Some(b)) = (graph.groups.get(&edge.a), graph.groups.get(&edge.b)) else {
            continue;
        };
        let (stroke, stroke_width) = connector_style(edge, a, b);
        connectors.push(Connector {
            id: next_id,
            source,
            target,
            stroke,
            stroke_width,
        });
        next_id += 1;
    }

    debug!(shapes = shapes.len(), connectors = connectors.len(), "emitted cells");
    DiagramDocument {
        title: title.to_string(),
        shapes,
        connectors,
    }
}

// ═══════════════════════════════════════
//  Serialization
// ═══════════════════════════════════════

impl DiagramDocument {
    fn page_size(&self) -> (u32, u32) {
        let width = self.shapes.iter().map(|s| s.x + s.width).max().unwrap_or(0);
        let height = self.shapes.iter().map(|s| s.y + s.height).max().unwrap_or(0);
        (
            (width + 200).max(MIN_PAGE_WIDTH),
            (height + 200).max(MIN_PAGE_HEIGHT),
        )
    }

    /// Uncompressed `mxfile` XML
    pub fn to_xml(&self) -> String {
        let mut s = String::with_capacity(1024 + 400 * (self.shapes.len() + self.connectors.len()));
        let (page_w, page_h) = self.page_size();

        s.push_str("<mxfile host=\"app.diagrams.net\">\n");
        let _ = write!(s, "  <diagram name=\"{}\" id=\"topology\">\n", esc(&self.title));
        let _ = write!(s,
            "    <mxGraphModel dx=\"1422\" dy=\"794\" grid=\"1\" gridSize=\"10\" guides=\"1\" tooltips=\"1\" connect=\"1\" arrows=\"1\" fold=\"1\" page=\"1\" pageScale=\"1\" pageWidth=\"{}\" pageHeight=\"{}\" math=\"0\" shadow=\"0\">\n",
            page_w, page_h);
        s.push_str("      <root>\n");
        s.push_str("        <mxCell id=\"0\"/>\n");
        s.push_str("        <mxCell id=\"1\" parent=\"0\"/>\n");

        for shape in &self.shapes {
            let style = format!(
                "rounded=1;whiteSpace=wrap;html=1;fillColor={};strokeColor={};strokeWidth={};fontSize=12;shadow=1;",
                shape.fill, shape.stroke, shape.stroke_width
            );
            let _ = write!(s,
                "        <mxCell id=\"{}\" value=\"{}\" style=\"{}\" vertex=\"1\" parent=\"1\">\n",
                shape.id, esc(&shape.label), esc(&style));
            let _ = write!(s,
                "          <mxGeometry x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" as=\"geometry\"/>\n",
                shape.x, shape.y, shape.width, shape.height);
            s.push_str("        </mxCell>\n");
        }

        for conn in &self.connectors {
            let style = format!(
                "edgeStyle=orthogonalEdgeStyle;rounded=1;orthogonalLoop=1;jettySize=auto;html=1;strokeColor={};strokeWidth={};shadow=1;",
                conn.stroke, conn.stroke_width
            );
            let _ = write!(s,
                "        <mxCell id=\"{}\" value=\"\" style=\"{}\" edge=\"1\" parent=\"1\" source=\"{}\" target=\"{}\">\n",
                conn.id, esc(&style), conn.source, conn.target);
            s.push_str("          <mxGeometry relative=\"1\" as=\"geometry\"/>\n");
            s.push_str("        </mxCell>\n");
        }

        s.push_str("      </root>\n");
        s.push_str("    </mxGraphModel>\n");
        s.push_str("  </diagram>\n");
        s.push_str("</mxfile>\n");
        s
    }
}

fn esc(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
