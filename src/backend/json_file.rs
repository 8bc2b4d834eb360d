//! JSON file source: a flat object of key to value.

use super::{Location, Scope, Source};
use crate::error::{ConfigError, Result};
use crate::value::Lookup;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const KIND: &str = "JsonFileSource";

/// Reads keys from a JSON object stored in a file.
///
/// The file is located lazily, on every read, so a missing file only matters
/// when a value is actually requested.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    file: PathBuf,
    location: Location,
    compulsory: bool,
    uncapitalize: bool,
}

impl JsonFileSource {
    pub fn new(file: impl Into<PathBuf>, location: Location) -> Self {
        Self {
            file: file.into(),
            location,
            compulsory: false,
            uncapitalize: true,
        }
    }

    /// Fail with `FileMissing` instead of reporting `Absent` when the file is missing.
    pub fn compulsory(mut self, compulsory: bool) -> Self {
        self.compulsory = compulsory;
        self
    }

    /// Look up lower-cased names (the default) or names as declared.
    pub fn uncapitalize(mut self, uncapitalize: bool) -> Self {
        self.uncapitalize = uncapitalize;
        self
    }

    pub fn path(&self, scope: &Scope) -> Result<PathBuf> {
        self.location.resolve(&self.file, scope)
    }

    fn load(path: &Path) -> Result<Map<String, Value>> {
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ConfigError::source(
                KIND,
                format!("{} does not contain a JSON object", path.display()),
            )),
            Err(err) => Err(ConfigError::source(
                KIND,
                format!("{}: {}", path.display(), err),
            )),
        }
    }

    fn missing(&self, path: PathBuf) -> ConfigError {
        ConfigError::FileMissing {
            kind: KIND.to_string(),
            path,
        }
    }
}

impl Source for JsonFileSource {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn supports_write(&self) -> bool {
        true
    }

    fn key_for(&self, name: &str) -> String {
        if self.uncapitalize {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    fn read(&self, name: &str, scope: &Scope) -> Result<Lookup> {
        let path = self.path(scope)?;
        if !path.exists() {
            if self.compulsory {
                return Err(self.missing(path));
            }
            return Ok(Lookup::Absent);
        }
        let map = Self::load(&path)?;
        Ok(map.get(&self.key_for(name)).cloned().into())
    }

    fn write(&self, name: &str, value: &Value, scope: &Scope) -> Result<()> {
        let path = self.path(scope)?;
        let mut map = if path.exists() {
            Self::load(&path)?
        } else if self.compulsory {
            return Err(self.missing(path));
        } else {
            Map::new()
        };
        map.insert(self.key_for(name), value.clone());

        let content = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| ConfigError::source(KIND, e))?;

        // Replace the file in one rename so readers never see a partial write.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let mut staged = NamedTempFile::new_in(&dir)?;
        staged.write_all(content.as_bytes())?;
        staged.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json_file({} @ {})", self.file.display(), self.location)
    }
}
