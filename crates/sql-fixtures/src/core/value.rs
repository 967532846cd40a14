//! Scalar values carried by fixture columns.
//!
//! Fixture documents only contain scalars: null, booleans, integers, floats and
//! strings. Drivers convert a [`FixtureValue`] to whatever the target column
//! expects at bind time (see the PostgreSQL `ToSql` implementation), so the
//! value type itself stays free of any database type information.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserialize, Deserializer, Visitor};

/// A single column value from a fixture document.
#[derive(Debug, Clone, PartialEq)]
pub enum FixtureValue {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Integer value (YAML integers outside the i64 range are rejected).
    Int(i64),

    /// Floating point value.
    Float(f64),

    /// String value. Drivers may parse it into the column's type
    /// (timestamps, UUIDs, JSON, numerics).
    Text(String),

    /// Current timestamp at bind time (from `ON_INSERT_NOW()` / `ON_UPDATE_NOW()`).
    Now,
}

impl FixtureValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, FixtureValue::Null)
    }

    /// Integer payload, if this is an integer value.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FixtureValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// String payload, if this is a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FixtureValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Resolve the timestamp used for [`FixtureValue::Now`].
    pub fn now() -> DateTime<Utc> {
        Utc::now()
    }
}

impl fmt::Display for FixtureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureValue::Null => f.write_str("NULL"),
            FixtureValue::Bool(v) => write!(f, "{}", v),
            FixtureValue::Int(v) => write!(f, "{}", v),
            FixtureValue::Float(v) => write!(f, "{}", v),
            FixtureValue::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            FixtureValue::Now => f.write_str("NOW()"),
        }
    }
}

impl From<bool> for FixtureValue {
    fn from(v: bool) -> Self {
        FixtureValue::Bool(v)
    }
}

impl From<i32> for FixtureValue {
    fn from(v: i32) -> Self {
        FixtureValue::Int(i64::from(v))
    }
}

impl From<i64> for FixtureValue {
    fn from(v: i64) -> Self {
        FixtureValue::Int(v)
    }
}

impl From<f64> for FixtureValue {
    fn from(v: f64) -> Self {
        FixtureValue::Float(v)
    }
}

impl From<&str> for FixtureValue {
    fn from(v: &str) -> Self {
        FixtureValue::Text(v.to_string())
    }
}

impl From<String> for FixtureValue {
    fn from(v: String) -> Self {
        FixtureValue::Text(v)
    }
}

impl<T: Into<FixtureValue>> From<Option<T>> for FixtureValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FixtureValue::Null)
    }
}

struct FixtureValueVisitor;

impl<'de> Visitor<'de> for FixtureValueVisitor {
    type Value = FixtureValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a scalar value (null, bool, number or string)")
    }

    fn visit_unit<E: de::Error>(self) -> Result<FixtureValue, E> {
        Ok(FixtureValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<FixtureValue, E> {
        Ok(FixtureValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<FixtureValue, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<FixtureValue, E> {
        Ok(FixtureValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<FixtureValue, E> {
        Ok(FixtureValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FixtureValue, E> {
        i64::try_from(v)
            .map(FixtureValue::Int)
            .map_err(|_| E::custom(format!("integer {} is out of range for a 64-bit column", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<FixtureValue, E> {
        Ok(FixtureValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FixtureValue, E> {
        Ok(FixtureValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<FixtureValue, E> {
        Ok(FixtureValue::Text(v))
    }
}

impl<'de> Deserialize<'de> for FixtureValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FixtureValueVisitor)
    }
}
