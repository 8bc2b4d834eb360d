//! Configuration items and the resolution algorithm.

use crate::backend::{Backend, Scope};
use crate::binding::assign_once;
use crate::error::{ConfigError, Result};
use crate::spec::ItemSpec;
use crate::validate::{SpecValidator, Validator};
use crate::value::Lookup;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`ConfigItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(u64);

impl ItemId {
    fn next() -> Self {
        Self(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// How the backend chain is walked on a read.
///
/// Both policies return the same value. They differ in which backends are
/// evaluated, which matters when reads are expensive or have side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    /// Evaluate every backend in order; the last non-absent result wins.
    #[default]
    FullScan,
    /// Evaluate from the highest precedence backend down; stop at the first hit.
    ShortCircuit,
}

/// What a namespace hands an item when binding it.
#[derive(Debug, Clone, Default)]
pub struct BindContext<'a> {
    pub scope: Arc<Scope>,
    /// Namespace default chain, adopted by items declared without backends.
    pub defaults: Option<&'a [Backend]>,
    pub precedence: Precedence,
}

/// A declared configuration value.
///
/// The chain is ordered by ascending precedence: later backends override
/// earlier ones.
pub struct ConfigItem {
    id: ItemId,
    name: Option<String>,
    spec: ItemSpec,
    backends: Option<Vec<Backend>>,
    precedence: Option<Precedence>,
    validator: Option<Arc<dyn Validator>>,
    bound: bool,
}

impl ConfigItem {
    /// Declare an item whose name is learnt when it is bound in a namespace.
    pub fn new(spec: ItemSpec) -> Self {
        Self {
            id: ItemId::next(),
            name: None,
            spec,
            backends: None,
            precedence: None,
            validator: None,
            bound: false,
        }
    }

    /// Declare an item with its name up front.
    pub fn named(name: impl Into<String>, spec: ItemSpec) -> Self {
        let mut item = Self::new(spec);
        item.name = Some(name.into());
        item
    }

    pub fn with_backends(mut self, backends: Vec<Backend>) -> Self {
        self.backends = Some(backends);
        self
    }

    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = Some(precedence);
        self
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn spec(&self) -> &ItemSpec {
        &self.spec
    }

    pub fn backends(&self) -> &[Backend] {
        self.backends.as_deref().unwrap_or_default()
    }

    pub fn precedence(&self) -> Precedence {
        self.precedence.unwrap_or_default()
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Set the item's name. Idempotent for the same name.
    pub fn assign_name(&mut self, name: &str) -> Result<()> {
        assign_once(&mut self.name, name)
    }

    /// Bind the item under `name`.
    ///
    /// The one-time work (default chain adoption, propagating the name into
    /// every backend, resolving the validator) runs on the first call only.
    /// A failed bind leaves the item exactly as it was.
    pub fn bind(&mut self, name: &str, ctx: &BindContext<'_>) -> Result<()> {
        let mut settled = self.name.clone();
        assign_once(&mut settled, name)?;
        if self.bound {
            return Ok(());
        }

        let mut backends = match self.backends {
            Some(ref chain) => chain.clone(),
            None => ctx
                .defaults
                .map(|chain| chain.iter().map(Backend::detached).collect())
                .ok_or_else(|| ConfigError::NoBackends {
                    name: name.to_string(),
                })?,
        };
        for backend in &mut backends {
            backend.bind(name, Arc::clone(&ctx.scope))?;
        }

        self.name = settled;
        self.backends = Some(backends);
        if self.precedence.is_none() {
            self.precedence = Some(ctx.precedence);
        }
        if self.validator.is_none() {
            self.validator = Some(Arc::new(SpecValidator::for_item(name, &self.spec)));
        }
        self.bound = true;
        debug!(item = %name, namespace = %ctx.scope.namespace, backends = self.backends().len(), "bound configuration item");
        Ok(())
    }

    /// Bind a named item outside of any namespace.
    fn ensure_bound(&mut self) -> Result<String> {
        let name = self.name.clone().ok_or_else(|| {
            ConfigError::not_resolvable("<unnamed>", "item has no name and is not bound in a namespace")
        })?;
        if !self.bound {
            self.bind(&name, &BindContext::default())?;
        }
        Ok(name)
    }

    /// Resolve the item's value.
    pub fn get(&mut self) -> Result<Value> {
        let name = self.ensure_bound()?;
        let precedence = self.precedence();
        let backends = self.backends.as_deref_mut().unwrap_or_default();

        let mut candidate = Lookup::Absent;
        match precedence {
            Precedence::FullScan => {
                for backend in backends.iter_mut() {
                    let lookup = backend.get(&name)?;
                    if lookup.is_present() {
                        trace!(item = %name, backend = backend.kind(), "backend has value");
                        candidate = lookup;
                    }
                }
            }
            Precedence::ShortCircuit => {
                for backend in backends.iter_mut().rev() {
                    let lookup = backend.get(&name)?;
                    if lookup.is_present() {
                        trace!(item = %name, backend = backend.kind(), "backend has value");
                        candidate = lookup;
                        break;
                    }
                }
            }
        }

        let value = match candidate {
            Lookup::Present(value) => value,
            Lookup::Absent => match self.spec.default {
                Lookup::Present(ref default) => {
                    debug!(item = %name, "no backend has a value, using default");
                    default.clone()
                }
                Lookup::Absent => return Err(ConfigError::undefined(&name)),
            },
        };

        let value = match self.spec.coerce {
            Some(ref coerce) => coerce.apply(value).map_err(|reason| ConfigError::Coerce {
                name: name.clone(),
                reason,
            })?,
            None => value,
        };
        self.validate(&name, &value)?;
        Ok(value)
    }

    /// Write `value` to every writable backend in the chain.
    ///
    /// Nothing is written when the chain has no writable backend. A failing
    /// backend stops the write; backends before it keep the new value.
    pub fn set(&mut self, value: Value) -> Result<()> {
        let name = self.ensure_bound()?;
        self.validate(&name, &value)?;

        let backends = self.backends.as_deref_mut().unwrap_or_default();
        if !backends.iter().any(Backend::is_writable) {
            return Err(ConfigError::not_writable(format!(
                "configuration item {} (no writable backend)",
                name
            )));
        }
        for backend in backends.iter_mut().filter(|b| b.is_writable()) {
            backend.write(&name, value.clone())?;
            debug!(item = %name, backend = backend.kind(), "wrote configuration value");
        }
        Ok(())
    }

    fn validate(&self, name: &str, value: &Value) -> Result<()> {
        match self.validator {
            Some(ref validator) => {
                validator
                    .validate(value)
                    .map_err(|reason| ConfigError::Invalid {
                        name: name.to_string(),
                        reason,
                    })
            }
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ConfigItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigItem")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("spec", &self.spec)
            .field("backends", &self.backends)
            .field("precedence", &self.precedence)
            .field("bound", &self.bound)
            .finish()
    }
}
