//! Validation hook for resolved values.

use crate::spec::{ItemSpec, ValueType, parse_bool};
use serde_json::Value;

/// Checks a value before it is returned from a read or committed by a write.
///
/// Validators are resolved lazily, when an item is bound and its name is known.
pub trait Validator: Send + Sync {
    fn validate(&self, value: &Value) -> Result<(), String>;
}

/// Default validator derived from an item's spec.
///
/// Always enforces the emptiness constraint. The type check only runs for
/// strict specs and accepts either a value of the declared type or its
/// textual form, so `"9"` read from the environment satisfies `integer`.
#[derive(Debug, Clone)]
pub struct SpecValidator {
    name: String,
    value_type: ValueType,
    empty: bool,
    strict: bool,
}

impl SpecValidator {
    pub fn for_item(name: &str, spec: &ItemSpec) -> Self {
        Self {
            name: name.to_string(),
            value_type: spec.value_type,
            empty: spec.empty,
            strict: spec.strict,
        }
    }
}

impl Validator for SpecValidator {
    fn validate(&self, value: &Value) -> Result<(), String> {
        if !self.empty && is_empty(value) {
            return Err(format!("{} must not be empty", self.name));
        }
        if !self.strict || is_empty(value) || matches_type(self.value_type, value) {
            Ok(())
        } else {
            Err(format!("expected {}, got {}", self.value_type, value))
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn matches_type(value_type: ValueType, value: &Value) -> bool {
    match (value_type, value) {
        (ValueType::Any, _) => true,
        (ValueType::String, Value::String(_)) => true,
        (ValueType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
        (ValueType::Integer, Value::String(s)) => s.trim().parse::<i64>().is_ok(),
        (ValueType::Float, Value::Number(_)) => true,
        (ValueType::Float, Value::String(s)) => s.trim().parse::<f64>().is_ok(),
        (ValueType::Boolean, Value::Bool(_)) => true,
        (ValueType::Boolean, Value::String(s)) => parse_bool(s).is_some(),
        (ValueType::Array, Value::Array(_)) => true,
        (ValueType::Object, Value::Object(_)) => true,
        _ => false,
    }
}
