// store.rs
use std::collections::HashMap;
use std::convert::{Infallible, TryFrom, TryInto};
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;
use rocket::serde::json::Value as JsonValue;
use thiserror::Error;

use crate::util::{shard_for, Key};

// Constants
pub const DEFAULT_SHARD_COUNT: usize = 8;

/// Error raised by [`Store::put`] when the entry cannot be stored.
///
/// A failed `put` never touches the store, so the caller may simply retry
/// with a valid key and value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Key must be a non-empty string")]
    EmptyKey,
    #[error("Missing value: allowed types are integer, float or string")]
    MissingValue,
    #[error("Invalid value type {0}: allowed types are integer, float or string")]
    UnsupportedKind(&'static str),
}

impl From<Infallible> for ValidationError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// A scalar held by the store. Integer, floating-point and text are the only
/// kinds accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// A raw query parameter. The text is kept as-is, no numeric conversion
/// is attempted.
impl TryFrom<Option<String>> for Value {
    type Error = ValidationError;

    fn try_from(raw: Option<String>) -> Result<Self, Self::Error> {
        raw.map(Value::Text).ok_or(ValidationError::MissingValue)
    }
}

impl TryFrom<JsonValue> for Value {
    type Error = ValidationError;

    fn try_from(json: JsonValue) -> Result<Self, Self::Error> {
        match json {
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Integer(i)),
                None => n
                    .as_f64()
                    .map(Value::Float)
                    .ok_or(ValidationError::UnsupportedKind("number")),
            },
            JsonValue::String(s) => Ok(Value::Text(s)),
            JsonValue::Null => Err(ValidationError::UnsupportedKind("null")),
            JsonValue::Bool(_) => Err(ValidationError::UnsupportedKind("bool")),
            JsonValue::Array(_) => Err(ValidationError::UnsupportedKind("array")),
            JsonValue::Object(_) => Err(ValidationError::UnsupportedKind("object")),
        }
    }
}

type Shard = RwLock<HashMap<Key, Value>>;

/// In-memory key-value store shared by every request handler.
///
/// Keys are spread over a fixed set of shards, each guarded by its own
/// reader-writer lock: concurrent `get`s never block each other and a `put`
/// only excludes access to the shard that owns its key.
pub struct Store {
    shards: Vec<Shard>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARD_COUNT)
    }

    pub fn with_shards(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>();
        Self { shards }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    // `insert` is the only mutation, so a poisoned shard still holds whole entries.
    fn read_shard(&self, index: usize) -> RwLockReadGuard<'_, HashMap<Key, Value>> {
        self.shards[index]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_shard(&self, index: usize) -> RwLockWriteGuard<'_, HashMap<Key, Value>> {
        self.shards[index]
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or overwrites the value for `key`.
    ///
    /// The value is validated before any lock is taken; on error the store
    /// is left exactly as it was.
    pub fn put<V>(&self, key: &str, value: V) -> Result<(), ValidationError>
    where
        V: TryInto<Value>,
        ValidationError: From<V::Error>,
    {
        if key.is_empty() {
            return Err(ValidationError::EmptyKey);
        }
        let value = value.try_into()?;
        let index = shard_for(key, self.shards.len());
        debug!("put {} ({}) into shard {}", key, value.kind(), index);
        self.write_shard(index).insert(key.to_string(), value);
        Ok(())
    }

    /// Returns the current value for `key`, `None` if it was never written.
    pub fn get(&self, key: &str) -> Option<Value> {
        let index = shard_for(key, self.shards.len());
        self.read_shard(index).get(key).cloned()
    }

    pub fn len(&self) -> usize {
        (0..self.shards.len())
            .map(|index| self.read_shard(index).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies every shard at call time and yields the entries one by one.
    /// Meant for operators, the request path never calls it.
    pub fn snapshot_for_debug(&self) -> impl Iterator<Item = (Key, Value)> {
        let copies = (0..self.shards.len())
            .map(|index| {
                self.read_shard(index)
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        copies.into_iter().flatten()
    }

    pub fn log_store_state(&self) {
        debug!("Current store state ({} shards):", self.shard_count());
        for (key, value) in self.snapshot_for_debug() {
            debug!("Key: {}, Value: {} ({})", key, value, value.kind());
        }
    }
}
