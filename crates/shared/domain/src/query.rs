//! Record and filter primitives shared by modules, the connection handle and federation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schemaless entity record.
pub type Record = Map<String, Value>;

/// Canonical join key of a value; `None` for `null`.
///
/// Keys compare by JSON text, so `7` and `"7"` are different keys.
#[must_use]
pub fn link_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(format!("{s:?}")),
        other => Some(other.to_string()),
    }
}

/// Membership test: `field` must equal one of `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub values: Vec<Value>,
}

impl Filter {
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { field: field.into(), values: vec![value.into()] }
    }

    #[must_use]
    pub fn any_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self { field: field.into(), values }
    }

    /// Builds a filter from a shape argument: a scalar means equality, an array means IN.
    #[must_use]
    pub fn from_arg(field: impl Into<String>, arg: &Value) -> Self {
        match arg {
            Value::Array(values) => Self::any_of(field, values.clone()),
            other => Self::eq(field, other.clone()),
        }
    }

    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        let Some(key) = record.get(&self.field).and_then(link_key) else {
            return false;
        };
        self.values.iter().filter_map(link_key).any(|candidate| candidate == key)
    }
}
