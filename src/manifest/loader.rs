//! Manifest discovery and tier merging.
//!
//! Tiers, lowest to highest priority:
//! 1. **Project** - `$CWD/config-chain.yaml`
//! 2. **User** - `~/.config-chain/config-chain.yaml`
//!
//! Both are merged key by key, user over project. `CONFIG_CHAIN_MANIFEST`
//! names an explicit manifest that overrides both.

use super::types::Manifest;
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable naming an explicit manifest.
pub const MANIFEST_ENV: &str = "CONFIG_CHAIN_MANIFEST";

/// File name looked up in each tier directory.
pub const MANIFEST_FILE: &str = "config-chain.yaml";

/// Manifest tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ManifestTier {
    Project = 0,
    User = 1,
    Explicit = 2,
}

impl std::fmt::Display for ManifestTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestTier::Project => write!(f, "project"),
            ManifestTier::User => write!(f, "user"),
            ManifestTier::Explicit => write!(f, "explicit"),
        }
    }
}

/// Candidate manifest files for each tier.
#[derive(Debug, Clone)]
pub struct ManifestPaths {
    pub project_file: Option<PathBuf>,
    pub user_file: Option<PathBuf>,
}

impl Default for ManifestPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ManifestPaths {
    /// Discover the default project and user manifest locations.
    pub fn discover() -> Self {
        Self {
            project_file: Some(PathBuf::from(MANIFEST_FILE)),
            user_file: dirs::home_dir().map(|h| h.join(".config-chain").join(MANIFEST_FILE)),
        }
    }

    pub fn with_files(project_file: Option<PathBuf>, user_file: Option<PathBuf>) -> Self {
        Self {
            project_file,
            user_file,
        }
    }
}

/// Loads a manifest from the explicit path or the merged tiers.
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    manifest: Manifest,
    sources: Vec<(ManifestTier, PathBuf)>,
}

impl ManifestLoader {
    /// Load the explicit manifest if `CONFIG_CHAIN_MANIFEST` is set, else the tiers.
    pub fn load() -> Result<Self> {
        if let Ok(explicit) = std::env::var(MANIFEST_ENV) {
            return Self::load_explicit(explicit);
        }
        Self::load_with_paths(ManifestPaths::discover())
    }

    /// Load a single manifest file. Errors are not ignored.
    pub fn load_explicit(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let value = read_yaml(&path)?;
        let manifest = serde_json::from_value(value)
            .with_context(|| format!("invalid manifest {}", path.display()))?;
        Ok(Self {
            manifest,
            sources: vec![(ManifestTier::Explicit, path)],
        })
    }

    /// Merge the project and user tiers.
    ///
    /// Unreadable tier files are skipped with a warning. At least one tier
    /// must provide a manifest.
    pub fn load_with_paths(paths: ManifestPaths) -> Result<Self> {
        let tiers = [
            (ManifestTier::Project, paths.project_file),
            (ManifestTier::User, paths.user_file),
        ];

        let mut merged = Value::Null;
        let mut sources = Vec::new();
        for (tier, path) in tiers {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            match read_yaml(&path) {
                Ok(value) => {
                    merged = overlay(merged, value);
                    sources.push((tier, path));
                }
                Err(e) => warn!(tier = %tier, path = %path.display(), error = %e, "ignoring unreadable manifest"),
            }
        }

        if sources.is_empty() {
            bail!(
                "no manifest found; create {} or set {}",
                MANIFEST_FILE,
                MANIFEST_ENV
            );
        }
        let manifest = serde_json::from_value(merged).context("invalid merged manifest")?;
        Ok(Self { manifest, sources })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn into_manifest(self) -> Manifest {
        self.manifest
    }

    /// Files that contributed, lowest priority first.
    pub fn sources(&self) -> &[(ManifestTier, PathBuf)] {
        &self.sources
    }
}

fn read_yaml(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read manifest {}", path.display()))?;
    let value = serde_yaml::from_str(&content)
        .with_context(|| format!("cannot parse manifest {}", path.display()))?;
    Ok(value)
}

/// Merge `top` over `base`: objects key by key, anything else replaced.
/// A null in `top` leaves `base` untouched.
fn overlay(base: Value, top: Value) -> Value {
    match (base, top) {
        (Value::Object(mut base), Value::Object(top)) => {
            for (key, value) in top {
                let merged = match base.remove(&key) {
                    Some(existing) => overlay(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (base, Value::Null) => base,
        (_, top) => top,
    }
}
