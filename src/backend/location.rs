//! Locating files for file-backed sources.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Namespace context a backend resolves locations against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// Name of the namespace the backend serves.
    pub namespace: String,
    /// Install root of the code. Defaults to the directory of the executable.
    pub code_root: Option<PathBuf>,
    /// Working directory. Defaults to the process working directory.
    pub working_dir: Option<PathBuf>,
}

impl Scope {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn code_root(&self) -> Result<PathBuf> {
        if let Some(ref root) = self.code_root {
            return Ok(root.clone());
        }
        let exe = std::env::current_exe()?;
        exe.parent().map(Path::to_path_buf).ok_or_else(|| {
            ConfigError::source("location", format!("{} has no parent", exe.display()))
        })
    }

    pub fn working_dir(&self) -> Result<PathBuf> {
        match self.working_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

/// Where a file-backed source looks for its file.
///
/// Deserializes from `code_root`, `working_dir`, `user_config` or a
/// `{path: <dir>}` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "LocationRepr")]
pub enum Location {
    /// Relative to the install root of the code.
    CodeRoot,
    /// Relative to the working directory.
    #[default]
    WorkingDir,
    /// Relative to the user's configuration directory (e.g. `~/.config`).
    UserConfig,
    /// Relative to an explicit directory.
    Path(PathBuf),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LocationRepr {
    Named(NamedLocation),
    Path { path: PathBuf },
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum NamedLocation {
    CodeRoot,
    WorkingDir,
    UserConfig,
}

impl From<LocationRepr> for Location {
    fn from(repr: LocationRepr) -> Self {
        match repr {
            LocationRepr::Named(NamedLocation::CodeRoot) => Location::CodeRoot,
            LocationRepr::Named(NamedLocation::WorkingDir) => Location::WorkingDir,
            LocationRepr::Named(NamedLocation::UserConfig) => Location::UserConfig,
            LocationRepr::Path { path } => Location::Path(path),
        }
    }
}

impl Location {
    /// Resolve `file` against this location. Absolute files are returned as is.
    pub fn resolve(&self, file: &Path, scope: &Scope) -> Result<PathBuf> {
        if file.is_absolute() {
            return Ok(file.to_path_buf());
        }
        let base = match self {
            Location::CodeRoot => scope.code_root()?,
            Location::WorkingDir => scope.working_dir()?,
            Location::UserConfig => dirs::config_dir().ok_or_else(|| {
                ConfigError::source("location", "no user configuration directory")
            })?,
            Location::Path(dir) => dir.clone(),
        };
        Ok(base.join(file))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::CodeRoot => write!(f, "code_root"),
            Location::WorkingDir => write!(f, "working_dir"),
            Location::UserConfig => write!(f, "user_config"),
            Location::Path(dir) => write!(f, "{}", dir.display()),
        }
    }
}
