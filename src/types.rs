//! Core data types shared across the engine
//!
//! Device names, sites, raw and canonical edges, display groups
//! and placed layout nodes.

use crate::error::{TopologyError, TopologyResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Leading `<domain><index>-<subindex>` of a device name.
static DEVICE_SITE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]+\d+)-(\d+)(?:-|$)").expect("Invalid site regex"));

/// A target site must be exactly `<domain><index>-<subindex>`.
static TARGET_SITE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]+\d+)-(\d+)$").expect("Invalid site regex"));

/// Neutral fill for anything the classifier does not recognize
pub const NEUTRAL_COLOR: &str = "#FFFFFF";

// ═══════════════════════════════════════
//  Edges
// ═══════════════════════════════════════

/// Kind of adjacency a raw record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeCategory {
    Physical,
    Ring,
    Peer,
    FirewallPeer,
    Customer,
    Bgp,
    Switch,
    IntraSite,
    InterSite,
    LocalPair,
    ComputeFabric,
}

impl EdgeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeCategory::Physical => "physical",
            EdgeCategory::Ring => "ring",
            EdgeCategory::Peer => "peer",
            EdgeCategory::FirewallPeer => "firewall-peer",
            EdgeCategory::Customer => "customer",
            EdgeCategory::Bgp => "bgp",
            EdgeCategory::Switch => "switch",
            EdgeCategory::IntraSite => "intra-site",
            EdgeCategory::InterSite => "inter-site",
            EdgeCategory::LocalPair => "local-pair",
            EdgeCategory::ComputeFabric => "compute-fabric",
        }
    }

    /// Interprets a declared `interface_type`-style field.
    /// Absent or unrecognized values fall back to `Physical`.
    pub fn from_type_field(field: Option<&str>) -> Self {
        let Some(raw) = field else {
            return EdgeCategory::Physical;
        };
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "ring" => EdgeCategory::Ring,
            "peer" | "nap-inter-region" => EdgeCategory::Peer,
            "firewall-peer" | "fwpeer" | "nap-firewall" => EdgeCategory::FirewallPeer,
            "customer" => EdgeCategory::Customer,
            "bgp" => EdgeCategory::Bgp,
            "switch" => EdgeCategory::Switch,
            "intra-site" | "intra-az" => EdgeCategory::IntraSite,
            "inter-site" | "inter-az" => EdgeCategory::InterSite,
            "local-pair" | "local" => EdgeCategory::LocalPair,
            "compute-fabric" | "es-c1" => EdgeCategory::ComputeFabric,
            _ => EdgeCategory::Physical,
        }
    }
}

impl fmt::Display for EdgeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One adjacency record as extracted from a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEdge {
    pub source: String,
    pub target: String,
    pub interface: Option<String>,
    pub category: EdgeCategory,
}

impl RawEdge {
    pub fn new(source: &str, target: &str, category: EdgeCategory) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            interface: None,
            category,
        }
    }

    pub fn with_interface(mut self, interface: &str) -> Self {
        self.interface = Some(interface.to_string());
        self
    }
}

// ═══════════════════════════════════════
//  Sites
// ═══════════════════════════════════════

/// `<domain>-<subindex>`, e.g. `bjs11-11`: availability domain `bjs11`,
/// data-center index `11`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SiteId {
    pub domain: String,
    pub subindex: String,
}

impl SiteId {
    /// Strict parse of a user-supplied target site.
    pub fn parse(site: &str) -> TopologyResult<Self> {
        let caps = TARGET_SITE_RE
            .captures(site)
            .ok_or_else(|| TopologyError::InvalidSite(site.to_string()))?;
        Ok(Self {
            domain: caps[1].to_string(),
            subindex: caps[2].to_string(),
        })
    }

    /// Site prefix of a device name, if it follows the naming convention.
    pub fn of_device(name: &str) -> Option<Self> {
        let caps = DEVICE_SITE_RE.captures(name)?;
        Some(Self {
            domain: caps[1].to_string(),
            subindex: caps[2].to_string(),
        })
    }

    /// How `other` sits relative to this (target) site.
    pub fn relation(&self, other: Option<&SiteId>) -> SiteRelation {
        match other {
            None => SiteRelation::Unplaced,
            Some(o) if o == self => SiteRelation::Local,
            Some(o) if o.domain == self.domain => SiteRelation::IntraDomain,
            Some(_) => SiteRelation::InterDomain,
        }
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.domain, self.subindex)
    }
}

/// Position of a device's site relative to the target site.
/// Ordered from closest to farthest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SiteRelation {
    Local,
    IntraDomain,
    InterDomain,
    Unplaced,
}

// ═══════════════════════════════════════
//  Devices
// ═══════════════════════════════════════

/// Presentation category assigned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    ManagementCorePhysical,
    ManagementCoreVirtual,
    EdgeServicesCore,
    ComputeFabricMember,
    EdgeManagement,
    X1Management,
    BfcFabric,
    OneFabric,
    TransitAccess,
    Aggregation,
    Unknown,
}

impl Category {
    pub fn color(&self) -> &'static str {
        match self {
            Category::ManagementCorePhysical => "#FFE6CC",
            Category::ManagementCoreVirtual => "#FFE6CC",
            Category::EdgeServicesCore => "#D5E8D4",
            Category::ComputeFabricMember => "#DAE8FC",
            Category::EdgeManagement => "#FFF2CC",
            Category::X1Management => "#F8CECC",
            Category::BfcFabric => "#D5E8D4",
            Category::OneFabric => "#E1D5E7",
            Category::TransitAccess => "#E6D0DE",
            Category::Aggregation => "#D0E0E3",
            Category::Unknown => NEUTRAL_COLOR,
        }
    }

    /// Short tag used in collapsed fan-out labels (`bjs11-11-es-c1`)
    pub fn tag(&self) -> &'static str {
        match self {
            Category::ManagementCorePhysical => "mgmt-cor",
            Category::ManagementCoreVirtual => "mgmt-cor-v",
            Category::EdgeServicesCore => "es-cor",
            Category::ComputeFabricMember => "es-c1",
            Category::EdgeManagement => "es-mgmt",
            Category::X1Management => "es-x1-mgmt",
            Category::BfcFabric => "bfc",
            Category::OneFabric => "onefabric",
            Category::TransitAccess => "tt-acc",
            Category::Aggregation => "agg",
            Category::Unknown => "unknown",
        }
    }

    /// Categories with many interchangeable members, collapsed per site.
    pub fn is_fan_out(&self) -> bool {
        matches!(self, Category::ComputeFabricMember | Category::EdgeManagement)
    }
}

/// Trailing replica marker kind (`-r1` physical pair, `-v1` virtual instance)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReplicaKind {
    Physical,
    Virtual,
}

impl ReplicaKind {
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'r' => Some(ReplicaKind::Physical),
            'v' => Some(ReplicaKind::Virtual),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            ReplicaKind::Physical => 'r',
            ReplicaKind::Virtual => 'v',
        }
    }
}

/// A parsed `-<kind><digits>` suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaSuffix {
    pub kind: ReplicaKind,
    pub digits: String,
}

impl fmt::Display for ReplicaSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.letter(), self.digits)
    }
}

/// Everything derived from a device name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAttributes {
    pub site: Option<SiteId>,
    pub category: Category,
    pub role: &'static str,
    pub color: &'static str,
    pub replica: Option<ReplicaSuffix>,
}

// ═══════════════════════════════════════
//  Groups and graph
// ═══════════════════════════════════════

/// Stable identity of a display node.
///
/// Plain device names never contain `*`, so the composite forms
/// cannot collide with a singleton key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn device(name: &str) -> Self {
        GroupKey(name.to_string())
    }

    pub fn replica(base: &str, kind: ReplicaKind) -> Self {
        GroupKey(format!("{}-{}*", base, kind.letter()))
    }

    pub fn mixed(base: &str) -> Self {
        GroupKey(format!("{}-*", base))
    }

    pub fn fan_out(site: &SiteId, category: Category) -> Self {
        GroupKey(format!("{}-{}*", site, category.tag()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One display node: one or more devices collapsed together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceGroup {
    pub key: GroupKey,
    /// Sorted, deduplicated
    pub members: Vec<String>,
    pub label: String,
    pub category: Category,
    pub role: &'static str,
    pub color: &'static str,
    /// Distinct member sites, sorted
    pub sites: Vec<SiteId>,
}

impl DeviceGroup {
    pub fn has_member_at(&self, site: &SiteId) -> bool {
        self.sites.iter().any(|s| s == site)
    }

    /// Closest relation any member has to `target`.
    pub fn relation_to(&self, target: &SiteId) -> SiteRelation {
        self.sites
            .iter()
            .map(|s| target.relation(Some(s)))
            .min()
            .unwrap_or(SiteRelation::Unplaced)
    }
}

/// Direction-agnostic connection between two groups; `a < b` always.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalEdge {
    pub a: GroupKey,
    pub b: GroupKey,
    pub category: EdgeCategory,
}

impl CanonicalEdge {
    /// Orders the endpoints. Returns None for a self-pair.
    pub fn between(x: GroupKey, y: GroupKey, category: EdgeCategory) -> Option<Self> {
        match x.cmp(&y) {
            std::cmp::Ordering::Less => Some(Self { a: x, b: y, category }),
            std::cmp::Ordering::Greater => Some(Self { a: y, b: x, category }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// The endpoint opposite `key`, if `key` is an endpoint.
    pub fn other(&self, key: &GroupKey) -> Option<&GroupKey> {
        if &self.a == key {
            Some(&self.b)
        } else if &self.b == key {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// Groups plus canonical edges: the input to layout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyGraph {
    pub groups: BTreeMap<GroupKey, DeviceGroup>,
    /// First-seen order
    pub edges: Vec<CanonicalEdge>,
}

// ═══════════════════════════════════════
//  Layout
// ═══════════════════════════════════════

/// Layout partition, in placement order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    Local,
    IntraDomain,
    InterDomain,
    Peripheral,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::Local,
        Bucket::IntraDomain,
        Bucket::InterDomain,
        Bucket::Peripheral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Local => "local",
            Bucket::IntraDomain => "intra-domain",
            Bucket::InterDomain => "inter-domain",
            Bucket::Peripheral => "peripheral",
        }
    }
}

/// A group placed on the grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutNode {
    pub key: GroupKey,
    pub bucket: Bucket,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
