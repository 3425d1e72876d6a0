//! Error taxonomy for the topology engine
//!
//! Almost every stage is total: malformed records are skipped and
//! unresolvable references are dropped. Only configuration problems
//! surface as errors.

/// Errors surfaced by the topology engine
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("invalid target site '{0}' (expected <domain><index>-<subindex>, e.g. bjs11-11)")]
    InvalidSite(String),

    #[error("unknown source format '{0}' (expected one of: attr, dsn, brick, fabric-root)")]
    UnknownFormat(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type TopologyResult<T> = Result<T, TopologyError>;
