//! Stored Values and Entries
//!
//! Every key maps to an [`Entry`]: the payload, an optional absolute expiry
//! instant, and the TTL exactly as the caller gave it. The payload shape is
//! chosen by the caller at write time and is one of the [`Value`] variants.

use crate::storage::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// The payload stored under a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Value {
    /// A single string
    String(String),
    /// An ordered sequence of strings (duplicates allowed)
    List(Vec<String>),
    /// A set of unique strings
    Set(BTreeSet<String>),
}

impl Value {
    /// Returns the type name of this value ("string", "list" or "set").
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
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

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(str::to_string).collect())
    }
}

impl From<BTreeSet<String>> for Value {
    fn from(items: BTreeSet<String>) -> Self {
        Value::Set(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<'a>(
            f: &mut fmt::Formatter<'_>,
            open: &str,
            close: &str,
            items: impl Iterator<Item = &'a String>,
        ) -> fmt::Result {
            write!(f, "{}", open)?;
            for (i, item) in items.enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?}", item)?;
            }
            write!(f, "{}", close)
        }

        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => join(f, "[", "]", items.iter()),
            Value::Set(items) => join(f, "{", "}", items.iter()),
        }
    }
}

/// A value that can be read as a TTL in seconds.
///
/// Integers and strings are both accepted; anything that is not a
/// non-negative integer is rejected with [`StoreError::InvalidTtl`].
pub trait IntoTtl {
    /// Converts `self` into a number of seconds.
    fn into_ttl_secs(self) -> StoreResult<u64>;
}

impl IntoTtl for u64 {
    fn into_ttl_secs(self) -> StoreResult<u64> {
        Ok(self)
    }
}

impl IntoTtl for u32 {
    fn into_ttl_secs(self) -> StoreResult<u64> {
        Ok(u64::from(self))
    }
}

impl IntoTtl for i64 {
    fn into_ttl_secs(self) -> StoreResult<u64> {
        u64::try_from(self).map_err(|_| StoreError::InvalidTtl(self.to_string()))
    }
}

impl IntoTtl for i32 {
    fn into_ttl_secs(self) -> StoreResult<u64> {
        i64::from(self).into_ttl_secs()
    }
}

impl IntoTtl for &str {
    fn into_ttl_secs(self) -> StoreResult<u64> {
        self.trim()
            .parse::<u64>()
            .map_err(|_| StoreError::InvalidTtl(self.to_string()))
    }
}

impl IntoTtl for String {
    fn into_ttl_secs(self) -> StoreResult<u64> {
        self.as_str().into_ttl_secs()
    }
}

impl IntoTtl for &String {
    fn into_ttl_secs(self) -> StoreResult<u64> {
        self.as_str().into_ttl_secs()
    }
}

/// The record stored for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The stored payload
    pub value: Value,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<SystemTime>,
    /// The TTL in seconds as supplied at write time
    pub raw_ttl: Option<u64>,
}

impl Entry {
    /// Creates an entry that never expires.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
            raw_ttl: None,
        }
    }

    /// Creates an entry expiring `ttl_secs` after `now`.
    ///
    /// Fails with [`StoreError::InvalidTtl`] if the expiry instant cannot be
    /// represented.
    pub fn with_ttl(value: Value, ttl_secs: u64, now: SystemTime) -> StoreResult<Self> {
        let expires_at = now
            .checked_add(Duration::from_secs(ttl_secs))
            .ok_or_else(|| StoreError::InvalidTtl(ttl_secs.to_string()))?;

        Ok(Self {
            value,
            expires_at: Some(expires_at),
            raw_ttl: Some(ttl_secs),
        })
    }

    /// Checks if this entry has expired as of `now`.
    ///
    /// An entry is still alive at the exact instant it expires.
    #[inline]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        matches!(self.expires_at, Some(exp) if now > exp)
    }

    /// Checks if a TTL was ever assigned, expired or not.
    #[inline]
    pub fn has_ttl(&self) -> bool {
        self.expires_at.is_some()
    }

    /// Returns the requested field of this entry.
    pub fn field(&self, field: Field) -> FieldValue {
        match field {
            Field::Value => FieldValue::Value(self.value.clone()),
            Field::ExpiresAt => FieldValue::ExpiresAt(self.expires_at),
            Field::RawTtl => FieldValue::RawTtl(self.raw_ttl),
        }
    }
}

/// Names one field of an [`Entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    Value,
    ExpiresAt,
    RawTtl,
}

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "value" => Ok(Field::Value),
            "expires_at" | "expires" => Ok(Field::ExpiresAt),
            "raw_ttl" | "ttl" | "tl" => Ok(Field::RawTtl),
            _ => Err(UnknownField(s.to_string())),
        }
    }
}

/// Returned when a field name does not match any [`Field`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field '{0}' (expected value, expires_at or raw_ttl)")]
pub struct UnknownField(pub String);

/// A single field read out of an [`Entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Value(Value),
    ExpiresAt(Option<SystemTime>),
    RawTtl(Option<u64>),
}
