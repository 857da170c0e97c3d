//! Decoded XML-RPC values.
//!
//! # Design
//! The service's records are opaque field-name → value mappings whose schema
//! is subject to change, so the client never maps them onto fixed structs.
//! `Value` mirrors the XML-RPC type system directly and operations hand it
//! back unchanged, except where a coercion (`coerce_int`, `coerce_flag`) or a
//! shape check (`into_array`, `into_strings`) is part of the operation.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine as _;

use crate::error::ApiError;

/// A single XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Double(f64),
    /// `dateTime.iso8601` content, kept as sent.
    DateTime(String),
    Base64(Vec<u8>),
    Struct(BTreeMap<String, Value>),
    Array(Vec<Value>),
    Nil,
}

impl Value {
    /// XML-RPC type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "boolean",
            Value::String(_) => "string",
            Value::Double(_) => "double",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Base64(_) => "base64",
            Value::Struct(_) => "struct",
            Value::Array(_) => "array",
            Value::Nil => "nil",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::DateTime(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Look up a struct member. Returns `None` for non-structs.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_struct().and_then(|m| m.get(key))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Interpret a result as an integer. Integers pass through; strings are
    /// parsed after trimming whitespace.
    pub fn coerce_int(&self) -> Result<i64, ApiError> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| ApiError::Transport(format!("unexpected result: {s:?} is not an integer"))),
            other => Err(ApiError::unexpected("integer", other)),
        }
    }

    /// Interpret a result as a success flag: `true`, `1` or `"1"`.
    pub fn coerce_flag(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i == 1,
            Value::String(s) => s.trim().parse::<i64>().map(|i| i == 1).unwrap_or(false),
            _ => false,
        }
    }

    /// Unwrap an array result. `Nil` counts as an empty array, since the
    /// service sends nothing at all for some empty lists.
    pub fn into_array(self) -> Result<Vec<Value>, ApiError> {
        match self {
            Value::Array(items) => Ok(items),
            Value::Nil => Ok(Vec::new()),
            other => Err(ApiError::unexpected("array", &other)),
        }
    }

    /// Unwrap an array of scalars as strings.
    pub fn into_strings(self) -> Result<Vec<String>, ApiError> {
        self.into_array()?
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                Value::Int(_) | Value::Double(_) | Value::Bool(_) => Ok(item.to_string()),
                other => Err(ApiError::unexpected("string", &other)),
            })
            .collect()
    }

    /// Unwrap an array of structs.
    pub fn into_records(self) -> Result<Vec<BTreeMap<String, Value>>, ApiError> {
        self.into_array()?
            .into_iter()
            .map(|item| match item {
                Value::Struct(members) => Ok(members),
                other => Err(ApiError::unexpected("struct", &other)),
            })
            .collect()
    }

    /// Convert to JSON. Base64 payloads become base64 strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::String(s) | Value::DateTime(s) => serde_json::Value::String(s.clone()),
            Value::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Base64(bytes) => {
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            Value::Struct(members) => serde_json::Value::Object(
                members.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Nil => serde_json::Value::Null,
        }
    }
}

/// Scalars render as plain text; compound values render as JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Bool(b) => write!(f, "{}", u8::from(*b)),
            Value::String(s) | Value::DateTime(s) => f.write_str(s),
            Value::Double(d) => write!(f, "{d}"),
            Value::Nil => Ok(()),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<&[String]> for Value {
    fn from(items: &[String]) -> Self {
        Value::Array(items.iter().map(Value::from).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(members: BTreeMap<String, Value>) -> Self {
        Value::Struct(members)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Nil, Into::into)
    }
}
