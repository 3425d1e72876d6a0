//! Topology engine: raw adjacency records in, draw.io diagram out.
//!
//! Stages run strictly in order and each one returns freshly owned data:
//! extract -> classify -> group -> canonicalize -> filter -> layout -> emit.

pub mod canonical;
pub mod classify;
pub mod drawio;
pub mod extract;
pub mod filter;
pub mod group;
pub mod layout;
pub mod pipeline;

pub use extract::{ExtractContext, SourceFormat};
pub use pipeline::{extract_all, run, RunOptions};
