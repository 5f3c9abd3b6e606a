//! Typed, multi-valued property values.
//!
//! A [`Value`] is the uniform storage unit for object properties. Every
//! variant except [`Value::Binary`] holds a list; single-valued access reads
//! element 0. Values are immutable: changing a property replaces the whole
//! `Value`, it never edits elements in place.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declared type of a property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Boolean,
    Date,
    Decimal,
    Integer,
    String,
    Uri,
    Binary,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PropertyType::Boolean => "boolean",
            PropertyType::Date => "date",
            PropertyType::Decimal => "decimal",
            PropertyType::Integer => "integer",
            PropertyType::String => "string",
            PropertyType::Uri => "uri",
            PropertyType::Binary => "binary",
        };
        f.write_str(s)
    }
}

/// A property value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum Value {
    Boolean(Vec<bool>),
    Date(Vec<DateTime<Utc>>),
    Decimal(Vec<f64>),
    Integer(Vec<i64>),
    String(Vec<String>),
    Uri(Vec<String>),
    Binary(Bytes),
}

impl Value {
    pub fn boolean(v: bool) -> Self {
        Value::Boolean(vec![v])
    }

    pub fn date(v: DateTime<Utc>) -> Self {
        Value::Date(vec![v])
    }

    pub fn decimal(v: f64) -> Self {
        Value::Decimal(vec![v])
    }

    pub fn integer(v: i64) -> Self {
        Value::Integer(vec![v])
    }

    pub fn string(v: impl Into<String>) -> Self {
        Value::String(vec![v.into()])
    }

    pub fn strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::String(values.into_iter().map(Into::into).collect())
    }

    pub fn uri(v: impl Into<String>) -> Self {
        Value::Uri(vec![v.into()])
    }

    pub fn binary(v: impl Into<Bytes>) -> Self {
        Value::Binary(v.into())
    }

    /// The declared type this value satisfies.
    pub fn property_type(&self) -> PropertyType {
        match self {
            Value::Boolean(_) => PropertyType::Boolean,
            Value::Date(_) => PropertyType::Date,
            Value::Decimal(_) => PropertyType::Decimal,
            Value::Integer(_) => PropertyType::Integer,
            Value::String(_) => PropertyType::String,
            Value::Uri(_) => PropertyType::Uri,
            Value::Binary(_) => PropertyType::Binary,
        }
    }

    /// Number of elements. A binary blob counts as one element.
    pub fn len(&self) -> usize {
        match self {
            Value::Boolean(v) => v.len(),
            Value::Date(v) => v.len(),
            Value::Decimal(v) => v.len(),
            Value::Integer(v) => v.len(),
            Value::String(v) | Value::Uri(v) => v.len(),
            Value::Binary(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => v.first().copied(),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(v) => v.first().copied(),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            Value::Decimal(v) => v.first().copied(),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => v.first().copied(),
            _ => None,
        }
    }

    /// First element of a string or uri value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) | Value::Uri(v) => v.first().map(String::as_str),
            _ => None,
        }
    }

    /// All elements of a string or uri value.
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Value::String(v) | Value::Uri(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(vec![v])
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::date(v)
    }
}
