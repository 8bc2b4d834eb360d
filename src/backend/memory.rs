//! In-process source, for embedding and tests.

use super::{Scope, Source};
use crate::error::Result;
use crate::value::Lookup;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Map-backed source that counts calls to its read primitive.
///
/// Keys are item names exactly as declared.
#[derive(Debug, Default)]
pub struct MemorySource {
    values: Mutex<HashMap<String, Value>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value);
        self
    }

    /// Change a value behind the backend's back.
    pub fn insert(&self, name: impl Into<String>, value: Value) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value);
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn value(&self, name: &str) -> Option<Value> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Number of times the read primitive ran.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of times the write primitive ran.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl Source for MemorySource {
    fn kind(&self) -> &'static str {
        "MemorySource"
    }

    fn supports_write(&self) -> bool {
        true
    }

    fn read(&self, name: &str, _scope: &Scope) -> Result<Lookup> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.value(name).into())
    }

    fn write(&self, name: &str, value: &Value, _scope: &Scope) -> Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.insert(name, value.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
