//! Records for logging.
//!
//! A [`Record`] is a map from string keys to loosely typed values. Training
//! steps return records (e.g. with a `"loss"` entry) and recorders consume
//! them.
use crate::error::BootrlError;
use chrono::prelude::{DateTime, Local};
use std::collections::{
    hash_map::{IntoIter, Iter, Keys},
    HashMap,
};

/// Values that can be stored in a [`Record`].
#[derive(Debug, Clone)]
pub enum RecordValue {
    /// A single floating point value, typically a metric like a loss.
    Scalar(f32),

    /// A timestamp.
    DateTime(DateTime<Local>),

    /// A one-dimensional array of floating point values.
    Array1(Vec<f32>),

    /// A text value.
    String(String),
}

/// A set of key-value pairs produced by a training or evaluation step.
#[derive(Debug, Clone)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record holding a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over the keys in the record.
    pub fn keys(&self) -> Keys<'_, String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a value under the given key.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the entries.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Returns the value for a key, if present.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges the entries of another record into this one.
    ///
    /// Entries of `record` overwrite entries with the same key.
    pub fn merge(self, record: Record) -> Self {
        Self(self.0.into_iter().chain(record.0).collect())
    }

    /// Returns the scalar value stored under a key.
    pub fn get_scalar(&self, k: &str) -> Result<f32, BootrlError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(BootrlError::RecordValueTypeError(k.into())),
            None => Err(BootrlError::RecordKeyError(k.into())),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, RecordValue);
    type IntoIter = IntoIter<String, RecordValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
