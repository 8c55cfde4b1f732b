//! Remote payload values
//!
//! Everything the two remotes hand back (plugin results, operation status
//! bodies, datastore entries) is one of a small set of shapes. [`RemoteValue`]
//! models exactly those shapes so result interpretation is an exhaustive
//! `match` instead of probing an open-ended dynamic value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar leaf of a [`RemoteValue`]
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Number(Number),
    Text(String),
}

/// Tagged union over the payload shapes observed from remote executors
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum RemoteValue {
    #[default]
    Null,
    Scalar(Scalar),
    List(Vec<RemoteValue>),
    Map(BTreeMap<String, RemoteValue>),
}

impl RemoteValue {
    /// Text scalar
    pub fn text(s: impl Into<String>) -> Self {
        Self::Scalar(Scalar::Text(s.into()))
    }

    /// Bool scalar
    pub fn bool(b: bool) -> Self {
        Self::Scalar(Scalar::Bool(b))
    }

    /// Empty map, the "nothing to report" shape used on the wire
    pub fn empty_map() -> Self {
        Self::Map(BTreeMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Truthiness as the remote inspection rules apply it.
    ///
    /// `null`, `false`, `0`, `""`, `[]` and `{}` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Scalar(Scalar::Bool(b)) => *b,
            Self::Scalar(Scalar::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Self::Scalar(Scalar::Text(s)) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(entries) => !entries.is_empty(),
        }
    }

    /// Look up a key when this value is a map
    pub fn field(&self, key: &str) -> Option<&RemoteValue> {
        match self {
            Self::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RemoteValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, RemoteValue>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Convert into a `serde_json::Value`
    pub fn to_json(&self) -> Value {
        Value::from(self.clone())
    }
}

impl From<Value> for RemoteValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n)),
            Value::String(s) => Self::Scalar(Scalar::Text(s)),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<RemoteValue> for Value {
    fn from(value: RemoteValue) -> Self {
        match value {
            RemoteValue::Null => Value::Null,
            RemoteValue::Scalar(Scalar::Bool(b)) => Value::Bool(b),
            RemoteValue::Scalar(Scalar::Number(n)) => Value::Number(n),
            RemoteValue::Scalar(Scalar::Text(s)) => Value::String(s),
            RemoteValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            RemoteValue::Map(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl From<&str> for RemoteValue {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for RemoteValue {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<bool> for RemoteValue {
    fn from(b: bool) -> Self {
        Self::bool(b)
    }
}

impl From<i64> for RemoteValue {
    fn from(n: i64) -> Self {
        Self::Scalar(Scalar::Number(n.into()))
    }
}

impl From<u64> for RemoteValue {
    fn from(n: u64) -> Self {
        Self::Scalar(Scalar::Number(n.into()))
    }
}

impl<T: Into<RemoteValue>> From<Vec<T>> for RemoteValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for RemoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(Scalar::Text(s)) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}
