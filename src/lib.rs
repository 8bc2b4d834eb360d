//! Config Chain Library
//!
//! Declarative configuration items resolved through an ordered chain of
//! backends (environment, JSON files, SQLite tables, memory), with
//! precedence, per-backend caching and write-back.

pub mod backend;
pub mod binding;
pub mod cli;
pub mod error;
pub mod item;
pub mod logging;
pub mod manifest;
pub mod namespace;
pub mod registry;
pub mod spec;
pub mod validate;
pub mod value;

pub use backend::{Backend, BackendOptions, Location, Scope, Source};
pub use error::{ConfigError, ErrorCode, Result};
pub use item::{BindContext, ConfigItem, ItemId, Precedence};
pub use namespace::{AttributeState, BACKENDS, Member, Namespace, NamespaceBuilder};
pub use registry::{Module, PlainModule, Registry};
pub use spec::{Coerce, ItemSpec, ValueType};
pub use validate::{SpecValidator, Validator};
pub use value::{Lookup, display_value};
