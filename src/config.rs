//! Configuration schema for archgraph.
//!
//! The config controls which manifests are imported, how deep dependency
//! resolution goes, and which dependency constraints are checked.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::import::ResolutionLimits;
use crate::lang::ForbiddenDependency;

/// File names probed, in order, when no config is given explicitly.
pub const CONFIG_FILE_NAMES: &[&str] = &["archgraph.yaml", ".archgraph.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub resolution: ResolutionLimits,
    #[serde(default)]
    pub constraints: Vec<ConstraintConfig>,
}

/// Which fact manifests take part in an import.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ImportConfig {
    /// Glob patterns for manifest paths to skip (e.g., "**/generated/**")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Manifest files or directories used only to materialize referenced units
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
}

/// A forbidden dependency between two groups of units.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConstraintConfig {
    pub name: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Find a config file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.import.excluded_paths.iter().any(|pattern| {
            globset::Glob::new(pattern)
                .map(|glob| glob.compile_matcher().is_match(&*path_str))
                .unwrap_or(false)
        })
    }

    /// Compile the configured constraints.
    pub fn forbidden_dependencies(&self) -> anyhow::Result<Vec<ForbiddenDependency>> {
        self.constraints
            .iter()
            .map(|c| {
                ForbiddenDependency::from_config(c)
                    .map_err(|e| anyhow::anyhow!("invalid constraint {:?}: {}", c.name, e))
            })
            .collect()
    }
}

/// Validate a config for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    for pattern in &config.import.excluded_paths {
        globset::Glob::new(pattern).map_err(|e| {
            anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e)
        })?;
    }

    let limits = [
        ("max_passes_for_member_types", config.resolution.max_passes_for_member_types),
        ("max_passes_for_accessed_types", config.resolution.max_passes_for_accessed_types),
        ("max_passes_for_supertypes", config.resolution.max_passes_for_supertypes),
        ("max_passes_for_annotation_types", config.resolution.max_passes_for_annotation_types),
    ];
    for (name, limit) in limits {
        if limit == Some(0) {
            anyhow::bail!("resolution.{} must be at least 1 (or null for unlimited)", name);
        }
    }

    for constraint in &config.constraints {
        if constraint.name.is_empty() {
            anyhow::bail!(
                "constraint from {:?} to {:?} has no name",
                constraint.from,
                constraint.to
            );
        }
        for pattern in [&constraint.from, &constraint.to] {
            globset::Glob::new(pattern).map_err(|e| {
                anyhow::anyhow!(
                    "invalid pattern {:?} in constraint {:?}: {}",
                    pattern,
                    constraint.name,
                    e
                )
            })?;
        }
    }

    Ok(())
}
