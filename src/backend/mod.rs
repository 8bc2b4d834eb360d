//! Backend capability contract.
//!
//! A [`Source`] is the concrete lookup primitive (environment, JSON file,
//! SQLite table, memory). A [`Backend`] wraps a shared source with the
//! per-item state the resolution engine needs:
//! - writable / volatile flags, checked against the source's class capabilities
//! - the cached value (an explicit [`Lookup`], never a truthiness check)
//! - the owner name and namespace scope, propagated once at binding

mod env;
mod json_file;
mod location;
mod memory;
mod sqlite;

pub use env::EnvSource;
pub use json_file::JsonFileSource;
pub use location::{Location, Scope};
pub use memory::MemorySource;
pub use sqlite::SqliteSource;

use crate::binding::assign_once;
use crate::error::{ConfigError, Result};
use crate::value::Lookup;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A configuration source.
///
/// Reads and writes may block on I/O; there is no implicit timeout.
pub trait Source: Send + Sync {
    /// Class name used in errors and logs.
    fn kind(&self) -> &'static str;

    /// Whether instances of this class may be made writable.
    fn supports_write(&self) -> bool {
        false
    }

    /// Whether instances of this class may change outside this process.
    fn supports_volatile(&self) -> bool {
        true
    }

    /// Map an item name to the key used inside the source.
    fn key_for(&self, name: &str) -> String {
        name.to_string()
    }

    /// Look up `name`. A missing value is `Absent`, not an error.
    fn read(&self, name: &str, scope: &Scope) -> Result<Lookup>;

    /// Commit `value` for `name` to the underlying source.
    fn write(&self, name: &str, _value: &Value, _scope: &Scope) -> Result<()> {
        Err(ConfigError::not_writable(format!(
            "{} for item {}",
            self.kind(),
            name
        )))
    }

    /// Human readable description for listings.
    fn describe(&self) -> String {
        self.kind().to_string()
    }
}

/// Capabilities requested when declaring a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendOptions {
    /// Accept writes through the configuration API.
    pub write: bool,
    /// Re-read on every access. `None` takes the source's class default.
    pub volatile: Option<bool>,
}

impl BackendOptions {
    pub fn writable() -> Self {
        Self {
            write: true,
            volatile: None,
        }
    }

    pub fn cached() -> Self {
        Self {
            write: false,
            volatile: Some(false),
        }
    }

    pub fn with_write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    pub fn with_volatile(mut self, volatile: bool) -> Self {
        self.volatile = Some(volatile);
        self
    }
}

/// A source in an item's chain, with its flags and cache.
#[derive(Clone)]
pub struct Backend {
    source: Arc<dyn Source>,
    writable: bool,
    volatile: bool,
    cached: Lookup,
    owner: Option<String>,
    scope: Arc<Scope>,
}

impl Backend {
    /// Declare a backend over `source`.
    ///
    /// Fails if a requested capability is not supported by the source class.
    pub fn new(source: Arc<dyn Source>, options: BackendOptions) -> Result<Self> {
        if options.write && !source.supports_write() {
            return Err(ConfigError::not_writable(format!(
                "{} backend",
                source.kind()
            )));
        }
        let volatile = match options.volatile {
            Some(true) if !source.supports_volatile() => {
                return Err(ConfigError::NotVolatile {
                    kind: source.kind().to_string(),
                });
            }
            Some(volatile) => volatile,
            None => source.supports_volatile(),
        };

        Ok(Self {
            source,
            writable: options.write,
            volatile,
            cached: Lookup::Absent,
            owner: None,
            scope: Arc::new(Scope::default()),
        })
    }

    /// Declare a backend with default options.
    pub fn of(source: impl Source + 'static) -> Result<Self> {
        Self::new(Arc::new(source), BackendOptions::default())
    }

    pub fn kind(&self) -> &'static str {
        self.source.kind()
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn is_volatile(&self) -> bool {
        self.volatile
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn cached(&self) -> &Lookup {
        &self.cached
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Record the item this backend serves and the namespace scope it lives in.
    pub fn bind(&mut self, owner: &str, scope: Arc<Scope>) -> Result<()> {
        assign_once(&mut self.owner, owner)?;
        self.scope = scope;
        Ok(())
    }

    /// Copy of this declaration with no owner and an empty cache.
    pub(crate) fn detached(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            writable: self.writable,
            volatile: self.volatile,
            cached: Lookup::Absent,
            owner: None,
            scope: Arc::clone(&self.scope),
        }
    }

    /// Value for `name`, served from the cache when the backend is not volatile.
    pub fn get(&mut self, name: &str) -> Result<Lookup> {
        if !self.volatile && self.cached.is_present() {
            trace!(item = %name, backend = self.kind(), "served from backend cache");
            return Ok(self.cached.clone());
        }
        let value = self.source.read(name, &self.scope)?;
        self.cached = value.clone();
        Ok(value)
    }

    /// Commit `value` to the source and refresh the cache.
    pub fn write(&mut self, name: &str, value: Value) -> Result<()> {
        if !self.writable {
            return Err(ConfigError::not_writable(format!(
                "{} for item {}",
                self.kind(),
                name
            )));
        }
        self.source.write(name, &value, &self.scope)?;
        self.cached = Lookup::Present(value);
        Ok(())
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("source", &self.source.describe())
            .field("writable", &self.writable)
            .field("volatile", &self.volatile)
            .field("cached", &self.cached)
            .field("owner", &self.owner)
            .finish()
    }
}
