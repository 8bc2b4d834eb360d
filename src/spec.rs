//! Item specs: semantic type, emptiness constraint, default and coercion.

use crate::value::Lookup;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Semantic type tag of a configuration item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    #[default]
    Any,
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Object,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Any => "any",
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Boolean => "boolean",
            ValueType::Array => "array",
            ValueType::Object => "object",
        };
        f.write_str(name)
    }
}

type CoerceFn = dyn Fn(Value) -> Result<Value, String> + Send + Sync;

/// Transform applied to the resolved value before it is returned.
#[derive(Clone)]
pub enum Coerce {
    /// Convert to the given semantic type.
    To(ValueType),
    /// Arbitrary transform.
    Custom(Arc<CoerceFn>),
}

impl Coerce {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Coerce::Custom(Arc::new(f))
    }

    pub fn apply(&self, value: Value) -> Result<Value, String> {
        match self {
            Coerce::To(target) => coerce_to(*target, value),
            Coerce::Custom(f) => f(value),
        }
    }
}

impl fmt::Debug for Coerce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coerce::To(target) => write!(f, "Coerce::To({})", target),
            Coerce::Custom(_) => f.write_str("Coerce::Custom(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for Coerce {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ValueType::deserialize(deserializer).map(Coerce::To)
    }
}

/// Schema fragment of a configuration item.
///
/// Deserializes from a mapping with the keys `type`, `empty`, `default`,
/// `coerce` and `strict`. A missing `default` key leaves the default `Absent`,
/// while `default: null` is a real null default.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemSpec {
    #[serde(default, rename = "type")]
    pub value_type: ValueType,

    /// Whether empty values (`null`, `""`, `[]`, `{}`) are permitted.
    #[serde(default = "default_empty")]
    pub empty: bool,

    #[serde(default, deserialize_with = "present")]
    pub default: Lookup,

    #[serde(default)]
    pub coerce: Option<Coerce>,

    /// Reject values that do not match `value_type`. Off by default, so
    /// values are returned as the source holds them.
    #[serde(default)]
    pub strict: bool,
}

fn default_empty() -> bool {
    true
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Lookup, D::Error> {
    Value::deserialize(deserializer).map(Lookup::Present)
}

impl Default for ItemSpec {
    fn default() -> Self {
        Self {
            value_type: ValueType::Any,
            empty: default_empty(),
            default: Lookup::Absent,
            coerce: None,
            strict: false,
        }
    }
}

impl ItemSpec {
    pub fn of(value_type: ValueType) -> Self {
        Self {
            value_type,
            ..Self::default()
        }
    }

    pub fn string() -> Self {
        Self::of(ValueType::String)
    }

    pub fn integer() -> Self {
        Self::of(ValueType::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(ValueType::Boolean)
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Lookup::Present(value.into());
        self
    }

    pub fn non_empty(mut self) -> Self {
        self.empty = false;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn with_coerce(mut self, coerce: Coerce) -> Self {
        self.coerce = Some(coerce);
        self
    }

    /// Build a spec from a JSON mapping (`{"type": .., "empty": .., ...}`).
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

// Bounds of the floats that convert to i64 exactly; 2^63 itself does not.
const I64_LOWER: f64 = i64::MIN as f64;
const I64_UPPER: f64 = i64::MAX as f64;

/// Convert a value to the given semantic type.
///
/// Strings are parsed for the scalar types since most sources (environment,
/// key-value stores) only carry text.
pub fn coerce_to(target: ValueType, value: Value) -> Result<Value, String> {
    match (target, value) {
        (ValueType::Any, value) => Ok(value),

        (ValueType::String, Value::String(s)) => Ok(Value::String(s)),
        (ValueType::String, Value::Null) => Ok(Value::String(String::new())),
        (ValueType::String, value) => Ok(Value::String(value.to_string())),

        (ValueType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
            Ok(Value::Number(n))
        }
        (ValueType::Integer, Value::Number(n)) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(f))
            .map(|f| Value::from(f as i64))
            .ok_or_else(|| format!("{} is not an integer in the 64-bit range", n)),
        (ValueType::Integer, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("'{}' is not an integer", s)),
        (ValueType::Integer, Value::Bool(b)) => Ok(Value::from(b as i64)),

        (ValueType::Float, Value::Number(n)) => n
            .as_f64()
            .map(Value::from)
            .ok_or_else(|| format!("{} is not a float", n)),
        (ValueType::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| format!("'{}' is not a float", s)),

        (ValueType::Boolean, Value::Bool(b)) => Ok(Value::Bool(b)),
        (ValueType::Boolean, Value::String(s)) => parse_bool(&s)
            .map(Value::Bool)
            .ok_or_else(|| format!("'{}' is not a boolean", s)),
        (ValueType::Boolean, Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => Err(format!("{} is not a boolean", n)),
        },

        (ValueType::Array | ValueType::Object, Value::String(s)) => {
            let parsed: Value =
                serde_json::from_str(&s).map_err(|e| format!("'{}' is not JSON: {}", s, e))?;
            coerce_to(target, parsed)
        }
        (ValueType::Array, value @ Value::Array(_)) => Ok(value),
        (ValueType::Object, value @ Value::Object(_)) => Ok(value),

        (target, value) => Err(format!("{} cannot be converted to {}", value, target)),
    }
}

/// Parse the usual textual spellings of a boolean.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
