//! Raw record extraction.
//!
//! Turns one source document into a device set plus raw adjacency
//! records. Line-oriented `.attr` sources are scanned with ordered
//! keyword rules. Brick documents are walked as JSON; fabric ROOT
//! documents are YAML, which also admits plain JSON. Nothing in here
//! fails: bad input just yields fewer edges.

use crate::error::TopologyError;
use crate::types::{EdgeCategory, RawEdge, SiteId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use serde_yaml::Value as YamlValue;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace, warn};

/// Routing-session advertisements, never drawn as links.
pub const ROUTING_ADJACENCY_DENYLIST: &[&str] = &["IBGPNEIGH", "EBGPNEIGH", "RRCLIENTNEIGH"];

/// Neighbor types a fabric ROOT document contributes as devices
const FABRIC_NEIGHBOR_TYPES: &[&str] = &["bfc", "onefabric"];

/// Fabric a ROOT document belongs to when no root device is given
pub const DEFAULT_FABRIC: &str = "es-c1";

static DSN_PARENT_CHILD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<-->\s+([a-z0-9-]+)").expect("Invalid DSN regex"));
static DSN_IBGP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"IBGP-NEIGH\s+([a-z0-9-]+)").expect("Invalid DSN regex"));
static DSN_SWITCH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^<])-->\s+([a-z0-9-]+)").expect("Invalid DSN regex"));
static BRICK_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-b\d+$").expect("Invalid brick regex"));

// ═══════════════════════════════════════
//  Formats and output
// ═══════════════════════════════════════

/// Supported source document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Corp NAP `.attr` (HOSTNAME / CUSTOMERLAG / RINGLAG / PEER)
    Attr,
    /// DSN `.attr` (PARENT-CHILD-INTF / IBGP-NEIGH / SWITCH INTF)
    Dsn,
    /// SwitchBuilder brick JSON (DEVICE_DETAILS / NODES_AND_INTERFACES)
    Brick,
    /// Fabric ROOT YAML or JSON (neighbors / bricks)
    FabricRoot,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Attr => "attr",
            SourceFormat::Dsn => "dsn",
            SourceFormat::Brick => "brick",
            SourceFormat::FabricRoot => "fabric-root",
        }
    }
}

impl FromStr for SourceFormat {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "attr" | "corp-nap" => Ok(SourceFormat::Attr),
            "dsn" => Ok(SourceFormat::Dsn),
            "brick" => Ok(SourceFormat::Brick),
            "fabric-root" | "root" => Ok(SourceFormat::FabricRoot),
            _ => Err(TopologyError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device names seen plus raw edges, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub devices: BTreeSet<String>,
    pub edges: Vec<RawEdge>,
}

impl Extraction {
    /// Appends another extraction (devices unioned, edges concatenated).
    pub fn merge(&mut self, other: Extraction) {
        self.devices.extend(other.devices);
        self.edges.extend(other.edges);
    }

    fn push_edge(&mut self, edge: RawEdge) {
        self.devices.insert(edge.source.clone());
        self.devices.insert(edge.target.clone());
        self.edges.push(edge);
    }
}

/// Caller-supplied context for a source
#[derive(Debug, Clone, Default)]
pub struct ExtractContext {
    /// Initial "current device" for line sources; root device for fabric-root
    pub hostname: Option<String>,
}

impl ExtractContext {
    /// Context for a run against `site`. DSN dumps come from the corp
    /// aggregation pair, so they default to `<site>-co-agg-r`; ROOT
    /// documents describe the site's `es-c1` fabric.
    pub fn for_source(format: SourceFormat, site: &SiteId, hostname: Option<&str>) -> Self {
        let hostname = match (hostname, format) {
            (Some(h), _) => Some(h.to_string()),
            (None, SourceFormat::Dsn) => Some(format!("{}-co-agg-r", site)),
            (None, SourceFormat::FabricRoot) => Some(format!("{}-{}", site, DEFAULT_FABRIC)),
            (None, _) => None,
        };
        Self { hostname }
    }
}

/// Extracts devices and raw edges from one source document.
pub fn extract(format: SourceFormat, content: &str, ctx: &ExtractContext) -> Extraction {
    let out = match format {
        SourceFormat::Attr => extract_lines(ATTR_RULES, content, ctx),
        SourceFormat::Dsn => extract_lines(DSN_RULES, content, ctx),
        SourceFormat::Brick => extract_brick(content),
        SourceFormat::FabricRoot => extract_fabric_root(content, ctx),
    };
    debug!(
        format = format.as_str(),
        devices = out.devices.len(),
        edges = out.edges.len(),
        "extracted source"
    );
    out
}

/// Device tokens are lowercase alphanumerics and hyphens.
pub fn is_device_token(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

// ═══════════════════════════════════════
//  Line-oriented sources
// ═══════════════════════════════════════

/// One keyword rule for line sources.
pub struct LineRule {
    pub id: &'static str,
    pub applies: fn(&str) -> bool,
    pub link: fn(&str) -> Option<(String, EdgeCategory)>,
}

/// Corp NAP rules. When several apply to one line, the last one wins.
pub static ATTR_RULES: &[LineRule] = &[
    LineRule {
        id: "customer-lag",
        applies: is_customer_lag,
        link: customer_link,
    },
    LineRule {
        id: "ring-lag",
        applies: is_ring_lag,
        link: ring_link,
    },
    LineRule {
        id: "peer",
        applies: is_peer,
        link: peer_link,
    },
];

/// DSN rules. When several apply to one line, the last one wins.
pub static DSN_RULES: &[LineRule] = &[
    LineRule {
        id: "parent-child",
        applies: is_parent_child,
        link: parent_child_link,
    },
    LineRule {
        id: "ibgp-neigh",
        applies: is_dsn_ibgp,
        link: dsn_ibgp_link,
    },
    LineRule {
        id: "switch",
        applies: is_dsn_switch,
        link: dsn_switch_link,
    },
];

fn is_customer_lag(line: &str) -> bool {
    line.starts_with("CUSTOMERLAG") && line.contains("DESC")
}

fn customer_link(line: &str) -> Option<(String, EdgeCategory)> {
    last_device_token(line).map(|t| (t, EdgeCategory::Customer))
}

fn is_ring_lag(line: &str) -> bool {
    line.starts_with("RINGLAG") && line.contains("DESC")
}

fn ring_link(line: &str) -> Option<(String, EdgeCategory)> {
    last_device_token(line).map(|t| (t, EdgeCategory::Ring))
}

fn is_peer(line: &str) -> bool {
    line.contains("PEER") && line.split_whitespace().count() >= 3
}

fn peer_link(line: &str) -> Option<(String, EdgeCategory)> {
    let category = if line.contains("FWPEER") {
        EdgeCategory::FirewallPeer
    } else {
        EdgeCategory::Peer
    };
    last_device_token(line).map(|t| (t, category))
}

fn is_parent_child(line: &str) -> bool {
    line.contains("DSN PARENT-CHILD-INTF") && line.contains("<-->")
}

fn parent_child_link(line: &str) -> Option<(String, EdgeCategory)> {
    capture_device(&DSN_PARENT_CHILD_RE, line).map(|t| (t, EdgeCategory::Physical))
}

fn is_dsn_ibgp(line: &str) -> bool {
    line.contains("IBGP-NEIGH") && line.contains("IP")
}

fn dsn_ibgp_link(line: &str) -> Option<(String, EdgeCategory)> {
    capture_device(&DSN_IBGP_RE, line).map(|t| (t, EdgeCategory::Bgp))
}

fn is_dsn_switch(line: &str) -> bool {
    line.contains("DSN NAME") && line.contains("SWITCH INTF") && line.contains("-->")
}

fn dsn_switch_link(line: &str) -> Option<(String, EdgeCategory)> {
    capture_device(&DSN_SWITCH_RE, line).map(|t| (t, EdgeCategory::Switch))
}

fn last_device_token(line: &str) -> Option<String> {
    line.split_whitespace()
        .last()
        .filter(|t| is_device_token(t))
        .map(str::to_string)
}

fn capture_device(re: &Regex, line: &str) -> Option<String> {
    re.captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|t| is_device_token(t))
        .map(str::to_string)
}

/// `HOSTNAME <device>` declarations switch the current device.
/// Outer None: not a declaration. Inner None: the name is unusable.
fn hostname_decl(line: &str) -> Option<Option<&str>> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "HOSTNAME" {
        return None;
    }
    Some(tokens.next().filter(|t| is_device_token(t)))
}

fn is_denylisted(line: &str) -> bool {
    ROUTING_ADJACENCY_DENYLIST
        .iter()
        .any(|kw| line.starts_with(kw))
}

/// Accumulator threaded through every line of one source.
#[derive(Debug, Default)]
struct LineState {
    hostname: Option<String>,
    out: Extraction,
}

fn extract_lines(rules: &[LineRule], content: &str, ctx: &ExtractContext) -> Extraction {
    let mut initial = LineState::default();
    if let Some(host) = ctx.hostname.as_deref().filter(|h| is_device_token(h)) {
        initial.out.devices.insert(host.to_string());
        initial.hostname = Some(host.to_string());
    }

    content
        .lines()
        .fold(initial, |state, line| scan_line(rules, state, line))
        .out
}

fn scan_line(rules: &[LineRule], mut state: LineState, line: &str) -> LineState {
    let line = line.trim();
    if line.is_empty() {
        return state;
    }

    if let Some(decl) = hostname_decl(line) {
        match decl {
            Some(host) => {
                state.out.devices.insert(host.to_string());
                state.hostname = Some(host.to_string());
            }
            None => {
                // Following records belong to an unnamed device
                debug!(line, "unusable HOSTNAME, context cleared");
                state.hostname = None;
            }
        }
        return state;
    }

    if is_denylisted(line) {
        return state;
    }

    let Some(rule) = rules.iter().rev().find(|r| (r.applies)(line)) else {
        return state;
    };

    // No current device: an edge would have an unknown source
    let Some(source) = state.hostname.clone() else {
        return state;
    };

    if let Some((target, category)) = (rule.link)(line) {
        trace!(rule = rule.id, source = %source, target = %target, "line matched");
        state.out.push_edge(RawEdge::new(&source, &target, category));
    }
    state
}

// ═══════════════════════════════════════
//  Structured sources
// ═══════════════════════════════════════

fn parse_json(content: &str, format: SourceFormat) -> Option<Value> {
    match serde_json::from_str(content) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(format = format.as_str(), error = %e, "unparseable source, skipping");
            None
        }
    }
}

fn extract_brick(content: &str) -> Extraction {
    let mut out = Extraction::default();
    let Some(data) = parse_json(content, SourceFormat::Brick) else {
        return out;
    };

    if let Some(details) = data.get("DEVICE_DETAILS").and_then(Value::as_object) {
        out.devices
            .extend(details.keys().filter(|k| is_device_token(k)).cloned());
    }

    let Some(nodes) = data.get("NODES_AND_INTERFACES").and_then(Value::as_object) else {
        return out;
    };

    for (device, interfaces) in nodes {
        if !is_device_token(device) {
            continue;
        }
        out.devices.insert(device.clone());

        let Some(interfaces) = interfaces.as_object() else {
            continue;
        };
        for (iface, details) in interfaces {
            let Some(remote) = details
                .get("remote_device")
                .and_then(Value::as_str)
                .filter(|r| is_device_token(r))
            else {
                continue;
            };
            let category = EdgeCategory::from_type_field(
                details.get("interface_type").and_then(Value::as_str),
            );
            out.push_edge(RawEdge::new(device, remote, category).with_interface(iface));
        }
    }
    out
}

/// `nrt12-56-es-c1-b4` -> `nrt12-56-es-c1`
pub fn strip_brick_suffix(name: &str) -> String {
    BRICK_SUFFIX_RE.replace(name, "").into_owned()
}

fn parse_yaml(content: &str, format: SourceFormat) -> Option<YamlValue> {
    match serde_yaml::from_str::<YamlValue>(content) {
        Ok(v) if v.is_mapping() => Some(v),
        Ok(_) => {
            warn!(format = format.as_str(), "source is not a mapping, skipping");
            None
        }
        Err(e) => {
            warn!(format = format.as_str(), error = %e, "unparseable source, skipping");
            None
        }
    }
}

/// Entries of the mapping under `key`. Scalar keys are rendered as text.
fn yaml_entries<'a>(node: &'a YamlValue, key: &str) -> Vec<(String, &'a YamlValue)> {
    let Some(map) = node.get(key).and_then(YamlValue::as_mapping) else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(k, v)| {
            let k = match k {
                YamlValue::String(s) => s.clone(),
                YamlValue::Number(n) => n.to_string(),
                _ => return None,
            };
            Some((k, v))
        })
        .collect()
}

fn extract_fabric_root(content: &str, ctx: &ExtractContext) -> Extraction {
    let mut out = Extraction::default();
    let Some(data) = parse_yaml(content, SourceFormat::FabricRoot) else {
        return out;
    };

    for (name, details) in yaml_entries(&data, "neighbors") {
        let kind = details.get("type").and_then(YamlValue::as_str).unwrap_or("");
        let name = strip_brick_suffix(&name);
        if FABRIC_NEIGHBOR_TYPES.contains(&kind) && is_device_token(&name) {
            trace!(device = %name, kind, "fabric neighbor");
            out.devices.insert(name);
        }
    }

    let Some(root) = ctx.hostname.as_deref().filter(|h| is_device_token(h)) else {
        warn!("fabric-root source without a root device, links skipped");
        return out;
    };
    out.devices.insert(root.to_string());

    for (brick_id, brick) in yaml_entries(&data, "bricks") {
        for (name, _) in yaml_entries(brick, "neighbors") {
            let neighbor = strip_brick_suffix(&name);
            if !is_device_token(&neighbor) {
                continue;
            }
            // Undeclared neighbors stay out of the device set and
            // get dropped at canonicalization.
            out.edges.push(
                RawEdge::new(root, &neighbor, EdgeCategory::Physical).with_interface(&brick_id),
            );
        }
    }
    out
}
