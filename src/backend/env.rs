//! Process environment source.

use super::{Scope, Source};
use crate::error::{ConfigError, Result};
use crate::value::Lookup;

/// Reads `PREFIX` + upper-cased item name from the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    prefix: Option<String>,
}

impl EnvSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl Source for EnvSource {
    fn kind(&self) -> &'static str {
        "EnvSource"
    }

    fn key_for(&self, name: &str) -> String {
        match self.prefix {
            Some(ref prefix) => format!("{}{}", prefix, name.to_uppercase()),
            None => name.to_uppercase(),
        }
    }

    fn read(&self, name: &str, _scope: &Scope) -> Result<Lookup> {
        let key = self.key_for(name);
        match std::env::var(&key) {
            Ok(value) => Ok(Lookup::present(value)),
            Err(std::env::VarError::NotPresent) => Ok(Lookup::Absent),
            Err(err) => Err(ConfigError::source(self.kind(), format!("{}: {}", key, err))),
        }
    }

    fn describe(&self) -> String {
        match self.prefix {
            Some(ref prefix) => format!("env({}*)", prefix),
            None => "env".to_string(),
        }
    }
}
