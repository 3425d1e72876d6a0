//! Configuration management for fabricdraw
//!
//! Grid geometry, grouping policy and canonicalization options.
//! Every field has a default, so a partial (or missing) file is fine.
//!
//! Config file location: ~/.config/fabricdraw/config.toml

use crate::error::{TopologyError, TopologyResult};
use crate::types::Bucket;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub grouping: GroupingConfig,
    pub canonical: CanonicalConfig,
    pub diagram: DiagramConfig,
}

/// Fixed-pitch grid geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub origin_x: u32,
    pub origin_y: u32,
    pub pitch_x: u32,
    pub pitch_y: u32,
    pub node_width: u32,
    pub node_height: u32,
    /// Extra vertical space between the last row of one bucket and the next
    pub bucket_gap: u32,
    pub columns: BucketColumns,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 120,
            origin_y: 100,
            pitch_x: 280,
            pitch_y: 150,
            node_width: 220,
            node_height: 90,
            bucket_gap: 150,
            columns: BucketColumns::default(),
        }
    }
}

/// Column count per layout bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketColumns {
    pub local: u32,
    pub intra_domain: u32,
    pub inter_domain: u32,
    pub peripheral: u32,
}

impl Default for BucketColumns {
    fn default() -> Self {
        Self {
            local: 4,
            intra_domain: 5,
            inter_domain: 5,
            peripheral: 5,
        }
    }
}

impl BucketColumns {
    pub fn for_bucket(&self, bucket: Bucket) -> u32 {
        match bucket {
            Bucket::Local => self.local,
            Bucket::IntraDomain => self.intra_domain,
            Bucket::InterDomain => self.inter_domain,
            Bucket::Peripheral => self.peripheral,
        }
    }
}

/// Device grouping options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    pub mixed_replicas: MixedReplicaPolicy,
    /// Collapse fan-out categories (compute fabric, edge mgmt) per site
    pub fan_out: bool,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            mixed_replicas: MixedReplicaPolicy::default(),
            fan_out: true,
        }
    }
}

/// What to do when one base name has both `-rN` and `-vN` members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MixedReplicaPolicy {
    /// Separate groups per kind at the target site, one merged group elsewhere
    #[default]
    SplitAtTarget,
    SplitEverywhere,
    MergeEverywhere,
}

impl MixedReplicaPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MixedReplicaPolicy::SplitAtTarget => "split-at-target",
            MixedReplicaPolicy::SplitEverywhere => "split-everywhere",
            MixedReplicaPolicy::MergeEverywhere => "merge-everywhere",
        }
    }
}

/// Connection dedup options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalConfig {
    /// Keep one edge per (pair, category) instead of one per pair
    pub by_category: bool,
}

/// Emitted document options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    /// Ids 0 and 1 are the draw.io root and default layer
    pub first_cell_id: u32,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self { first_cell_id: 2 }
    }
}

impl Config {
    /// Get the default config file path
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("fabricdraw");
        Ok(config_dir.join("config.toml"))
    }

    /// Load config from `path` (or the default location).
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::path()?,
        };

        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {:?}", parent))?;
            }
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }

    /// Reject geometry that would collapse the grid
    pub fn validate(&self) -> TopologyResult<()> {
        let l = &self.layout;
        if l.pitch_x == 0 || l.pitch_y == 0 {
            return Err(TopologyError::InvalidConfig(
                "layout pitch must be non-zero".to_string(),
            ));
        }
        // Neighbouring cells must not overlap
        if l.pitch_x < l.node_width {
            return Err(TopologyError::InvalidConfig(format!(
                "layout.pitch_x ({}) must be at least node_width ({})",
                l.pitch_x, l.node_width
            )));
        }
        if l.pitch_y < l.node_height {
            return Err(TopologyError::InvalidConfig(format!(
                "layout.pitch_y ({}) must be at least node_height ({})",
                l.pitch_y, l.node_height
            )));
        }
        for bucket in Bucket::ALL {
            if l.columns.for_bucket(bucket) == 0 {
                return Err(TopologyError::InvalidConfig(format!(
                    "layout.columns.{} must be at least 1",
                    bucket.as_str().replace('-', "_")
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.layout.pitch_x, 280);
        assert_eq!(config.layout.columns.local, 4);
        assert_eq!(config.grouping.mixed_replicas, MixedReplicaPolicy::SplitAtTarget);
        assert!(config.grouping.fan_out);
        assert!(!config.canonical.by_category);
        assert_eq!(config.diagram.first_cell_id, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml_str = r#"
[layout]
pitch_x = 300

[layout.columns]
local = 6

[grouping]
mixed_replicas = "merge-everywhere"
"#;
        let config: Config = toml::from_str(toml_str).expect("Should parse");
        assert_eq!(config.layout.pitch_x, 300);
        assert_eq!(config.layout.pitch_y, 150);
        assert_eq!(config.layout.columns.local, 6);
        assert_eq!(config.layout.columns.inter_domain, 5);
        assert_eq!(config.grouping.mixed_replicas, MixedReplicaPolicy::MergeEverywhere);
        assert!(config.grouping.fan_out);
    }

    #[test]
    fn test_validate_rejects_zero_columns() {
        let mut config = Config::default();
        config.layout.columns.inter_domain = 0;
        assert_eq!(
            config.validate(),
            Err(TopologyError::InvalidConfig(
                "layout.columns.inter_domain must be at least 1".to_string()
            ))
        );
    }

    #[test]
    fn test_validate_rejects_overlapping_cells() {
        let mut config = Config::default();
        config.layout.pitch_x = 200;
        assert_eq!(
            config.validate(),
            Err(TopologyError::InvalidConfig(
                "layout.pitch_x (200) must be at least node_width (220)".to_string()
            ))
        );

        let mut config = Config::default();
        config.layout.node_height = 151;
        assert_eq!(
            config.validate(),
            Err(TopologyError::InvalidConfig(
                "layout.pitch_y (150) must be at least node_height (151)".to_string()
            ))
        );

        // touching cells are fine
        let mut config = Config::default();
        config.layout.pitch_x = config.layout.node_width;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.canonical.by_category = true;
        config.layout.bucket_gap = 40;
        config.save(&path).expect("save");

        let loaded = Config::load(Some(&path)).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = Config::load(Some(&dir.path().join("absent.toml"))).expect("load");
        assert_eq!(loaded, Config::default());
    }
}
