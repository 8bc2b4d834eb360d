//! The result of asking a single source for a value.

use serde_json::Value;

/// Outcome of a source lookup.
///
/// `Absent` means "this source has no value for this name". It is distinct
/// from every `Present` value, including `null`, `""`, `0` and `false`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Lookup {
    #[default]
    Absent,
    Present(Value),
}

impl Lookup {
    pub fn present(value: impl Into<Value>) -> Self {
        Lookup::Present(value.into())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    pub fn is_present(&self) -> bool {
        !self.is_absent()
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Lookup::Present(value) => Some(value),
            Lookup::Absent => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Lookup::Present(value) => Some(value),
            Lookup::Absent => None,
        }
    }
}

impl From<Option<Value>> for Lookup {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(value) => Lookup::Present(value),
            None => Lookup::Absent,
        }
    }
}

/// Render a value for display: strings without quotes, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
