//! Namespace construction registry.
//!
//! Every namespace is constructed through a registry. Names ending with the
//! registry's suffix become configuration namespaces whose items resolve on
//! access; any other name becomes a plain module whose members are handed
//! back untouched.

use crate::namespace::{Member, Namespace, NamespaceBuilder};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// Suffix the process-wide registry matches on.
pub const CONFIGURATION_SUFFIX: &str = "configuration";

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Decides which namespaces get configuration semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    suffix: String,
}

impl Registry {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Install the process-wide registry.
    ///
    /// The first installation wins and is never removed; later calls return
    /// the registry already installed.
    pub fn install(suffix: &str) -> &'static Registry {
        GLOBAL.get_or_init(|| {
            debug!(suffix, "installed configuration registry");
            Registry::new(suffix)
        })
    }

    /// The process-wide registry, installed with [`CONFIGURATION_SUFFIX`] on first use.
    pub fn global() -> &'static Registry {
        Self::install(CONFIGURATION_SUFFIX)
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn matches(&self, name: &str) -> bool {
        name.ends_with(&self.suffix)
    }

    /// Construct the namespace declared by `builder`.
    pub fn construct(&self, builder: NamespaceBuilder) -> Module {
        if self.matches(builder.name()) {
            debug!(namespace = %builder.name(), "constructing configuration namespace");
            Module::Configuration(builder.build())
        } else {
            let (name, members) = builder.into_members();
            Module::Plain(PlainModule { name, members })
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(CONFIGURATION_SUFFIX)
    }
}

/// A constructed namespace.
#[derive(Debug)]
pub enum Module {
    Configuration(Namespace),
    Plain(PlainModule),
}

impl Module {
    pub fn name(&self) -> &str {
        match self {
            Module::Configuration(ns) => ns.name(),
            Module::Plain(module) => &module.name,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Module::Configuration(_))
    }

    pub fn as_configuration_mut(&mut self) -> Option<&mut Namespace> {
        match self {
            Module::Configuration(ns) => Some(ns),
            Module::Plain(_) => None,
        }
    }

    pub fn into_configuration(self) -> Option<Namespace> {
        match self {
            Module::Configuration(ns) => Some(ns),
            Module::Plain(_) => None,
        }
    }
}

/// Namespace without configuration semantics. Items are never resolved.
#[derive(Debug)]
pub struct PlainModule {
    name: String,
    members: BTreeMap<String, Member>,
}

impl PlainModule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, member: impl Into<Member>) {
        self.members.insert(name.into(), member.into());
    }
}
