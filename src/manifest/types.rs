//! Manifest types: a namespace declared in YAML.
//!
//! ```yaml
//! name: app.configuration
//! backends:
//!   - kind: env
//!   - kind: json_file
//!     file: config.json
//!     location: code_root
//!   - kind: json_file
//!     file: config.json
//!     location: working_dir
//!   - kind: sqlite
//!     file: settings.db
//!     location: { path: /var/lib/app }
//!     table: settings
//!     write: true
//! items:
//!   TOKEN: { type: string, empty: false, default: Asdf }
//! ```

use crate::backend::{
    Backend, BackendOptions, EnvSource, JsonFileSource, Location, MemorySource, SqliteSource,
};
use crate::error::{ConfigError, Result};
use crate::item::{ConfigItem, Precedence};
use crate::namespace::NamespaceBuilder;
use crate::spec::ItemSpec;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// A namespace declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_name")]
    pub name: String,

    /// Install root used by `code_root` locations.
    #[serde(default)]
    pub code_root: Option<PathBuf>,

    /// Directory used by `working_dir` locations.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    #[serde(default)]
    pub precedence: Precedence,

    /// Default chain, ascending precedence.
    #[serde(default)]
    pub backends: Vec<BackendDecl>,

    #[serde(default)]
    pub items: BTreeMap<String, ItemDecl>,

    /// Plain members.
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

fn default_name() -> String {
    format!("app.{}", crate::registry::CONFIGURATION_SUFFIX)
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            name: default_name(),
            code_root: None,
            working_dir: None,
            precedence: Precedence::default(),
            backends: Vec::new(),
            items: BTreeMap::new(),
            values: BTreeMap::new(),
        }
    }
}

/// An item declaration: its spec plus optional explicit backends.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemDecl {
    #[serde(flatten)]
    pub spec: ItemSpec,

    #[serde(default)]
    pub backends: Option<Vec<BackendDecl>>,

    #[serde(default)]
    pub precedence: Option<Precedence>,
}

/// A backend declaration, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendDecl {
    Env {
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        write: bool,
        #[serde(default)]
        volatile: Option<bool>,
    },
    JsonFile {
        file: PathBuf,
        #[serde(default)]
        location: Location,
        #[serde(default)]
        compulsory: bool,
        #[serde(default = "default_uncapitalize")]
        uncapitalize: bool,
        #[serde(default)]
        write: bool,
        #[serde(default)]
        volatile: Option<bool>,
    },
    Sqlite {
        file: PathBuf,
        #[serde(default)]
        location: Location,
        table: String,
        #[serde(default)]
        compulsory: bool,
        #[serde(default)]
        write: bool,
        #[serde(default)]
        volatile: Option<bool>,
    },
    Memory {
        #[serde(default)]
        values: BTreeMap<String, Value>,
        #[serde(default)]
        write: bool,
        #[serde(default)]
        volatile: Option<bool>,
    },
}

fn default_uncapitalize() -> bool {
    true
}

impl BackendDecl {
    /// Build the declared backend.
    pub fn build(&self) -> Result<Backend> {
        match self {
            BackendDecl::Env {
                prefix,
                write,
                volatile,
            } => {
                let source = match prefix {
                    Some(prefix) => EnvSource::with_prefix(prefix.clone()),
                    None => EnvSource::new(),
                };
                Backend::new(Arc::new(source), options(*write, *volatile))
            }
            BackendDecl::JsonFile {
                file,
                location,
                compulsory,
                uncapitalize,
                write,
                volatile,
            } => {
                let source = JsonFileSource::new(file.clone(), location.clone())
                    .compulsory(*compulsory)
                    .uncapitalize(*uncapitalize);
                Backend::new(Arc::new(source), options(*write, *volatile))
            }
            BackendDecl::Sqlite {
                file,
                location,
                table,
                compulsory,
                write,
                volatile,
            } => {
                let source =
                    SqliteSource::new(file.clone(), location.clone(), table)?.compulsory(*compulsory);
                Backend::new(Arc::new(source), options(*write, *volatile))
            }
            BackendDecl::Memory {
                values,
                write,
                volatile,
            } => {
                let source = values
                    .iter()
                    .fold(MemorySource::new(), |source, (name, value)| {
                        source.with_value(name.clone(), value.clone())
                    });
                Backend::new(Arc::new(source), options(*write, *volatile))
            }
        }
    }
}

fn options(write: bool, volatile: Option<bool>) -> BackendOptions {
    BackendOptions { write, volatile }
}

fn build_chain(decls: &[BackendDecl]) -> Result<Vec<Backend>> {
    decls.iter().map(BackendDecl::build).collect()
}

impl Manifest {
    /// Parse a manifest from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Manifest(e.to_string()))
    }

    /// Turn the manifest into namespace declarations.
    pub fn to_builder(&self) -> Result<NamespaceBuilder> {
        let mut builder = NamespaceBuilder::new(self.name.clone()).precedence(self.precedence);
        if let Some(ref root) = self.code_root {
            builder = builder.code_root(root.clone());
        }
        if let Some(ref dir) = self.working_dir {
            builder = builder.working_dir(dir.clone());
        }
        if !self.backends.is_empty() {
            builder = builder.backends(build_chain(&self.backends)?);
        }
        for (name, value) in &self.values {
            builder = builder.value(name.clone(), value.clone());
        }
        for (name, decl) in &self.items {
            let mut item = ConfigItem::new(decl.spec.clone());
            if let Some(ref decls) = decl.backends {
                item = item.with_backends(build_chain(decls)?);
            }
            if let Some(precedence) = decl.precedence {
                item = item.with_precedence(precedence);
            }
            builder = builder.item(name.clone(), item);
        }
        Ok(builder)
    }
}
