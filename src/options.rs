//! Runtime option values bound to `:name` placeholders.
//!
//! An option map is supplied at optimize time. A key may be absent, bound to
//! `Null`, bound to a single scalar, or bound to a list of scalars whose
//! elements may themselves be null. Optimization flattens every concrete
//! value into an ordered list of [`BoundOption`]s that lines up with the bind
//! marks a backend will emit.
use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::{BqlError, Result};

/// The option map keyed by placeholder name (without the leading `:`).
pub type Options = HashMap<String, OptionValue>;

/// A single bindable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// The value a placeholder is bound to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Null,
    Scalar(Scalar),
    List(Vec<Option<Scalar>>),
}

/// One concrete, order-significant value destined for a bind mark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundOption {
    pub name: String,
    pub value: Scalar,
}

impl BoundOption {
    pub fn new(name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Int(i64::from(i))
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

macro_rules! option_value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for OptionValue {
                fn from(value: $ty) -> Self {
                    OptionValue::Scalar(value.into())
                }
            }
        )*
    };
}

option_value_from!(bool, i64, i32, f64, &str, String);

impl From<Scalar> for OptionValue {
    fn from(value: Scalar) -> Self {
        OptionValue::Scalar(value)
    }
}

impl OptionValue {
    /// A list option without null elements.
    pub fn list<T: Into<Scalar>>(items: impl IntoIterator<Item = T>) -> Self {
        OptionValue::List(items.into_iter().map(|v| Some(v.into())).collect())
    }

    /// Convert a JSON value supplied for `field`.
    pub fn from_json(field: &str, value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value as J;
        match value {
            J::Null => Ok(OptionValue::Null),
            J::Array(items) => items
                .iter()
                .map(|item| match item {
                    J::Null => Ok(None),
                    other => json_scalar(field, other).map(Some),
                })
                .collect::<Result<Vec<_>>>()
                .map(OptionValue::List),
            other => json_scalar(field, other).map(OptionValue::Scalar),
        }
    }

    /// Convert a TOML value supplied for `field`. TOML has no null, so a
    /// TOML document can only bind scalars and lists.
    pub fn from_toml(field: &str, value: &toml::Value) -> Result<Self> {
        match value {
            toml::Value::Array(items) => items
                .iter()
                .map(|item| toml_scalar(field, item).map(Some))
                .collect::<Result<Vec<_>>>()
                .map(OptionValue::List),
            other => toml_scalar(field, other).map(OptionValue::Scalar),
        }
    }
}

fn json_scalar(field: &str, value: &serde_json::Value) -> Result<Scalar> {
    use serde_json::Value as J;
    match value {
        J::Bool(b) => Ok(Scalar::Bool(*b)),
        J::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Scalar::Int(i))
            } else if let Some(x) = n.as_f64() {
                Ok(Scalar::Float(x))
            } else {
                Err(invalid(field, "number"))
            }
        }
        J::String(s) => Ok(Scalar::Text(s.clone())),
        J::Array(_) => Err(invalid(field, "nested array")),
        J::Object(_) => Err(invalid(field, "object")),
        J::Null => Err(invalid(field, "null")),
    }
}

fn toml_scalar(field: &str, value: &toml::Value) -> Result<Scalar> {
    match value {
        toml::Value::Boolean(b) => Ok(Scalar::Bool(*b)),
        toml::Value::Integer(i) => Ok(Scalar::Int(*i)),
        toml::Value::Float(x) => Ok(Scalar::Float(*x)),
        toml::Value::String(s) => Ok(Scalar::Text(s.clone())),
        toml::Value::Datetime(d) => Ok(Scalar::Text(d.to_string())),
        toml::Value::Array(_) => Err(invalid(field, "nested array")),
        toml::Value::Table(_) => Err(invalid(field, "table")),
    }
}

fn invalid(field: &str, kind: &str) -> BqlError {
    BqlError::InvalidOption {
        field: field.to_string(),
        kind: kind.to_string(),
    }
}

/// Build an option map from a JSON object.
pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Result<Options> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), OptionValue::from_json(k, v)?)))
        .collect()
}

/// Build an option map from a TOML table.
pub fn from_toml_table(table: &toml::Table) -> Result<Options> {
    table
        .iter()
        .map(|(k, v)| Ok((k.clone(), OptionValue::from_toml(k, v)?)))
        .collect()
}
