//! Store Module
//!
//! The shared in-memory key-value map.
//!
//! ## Concurrency Model
//! One `Mutex` around the whole `HashMap`. Every operation takes the lock
//! for its full duration, so operations from different connections are
//! serialized and none of them observes a half-applied mutation.
//! There is no read/write split: every operation costs about the same.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Mutex-guarded mapping from string keys to string values
///
/// Constructed once by the caller and shared with every connection
/// through an `Arc`.
#[derive(Debug, Default)]
pub struct Store {
    data: Mutex<HashMap<String, String>>,
}

impl Store {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `key`
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.data.lock().insert(key.into(), value.into());
    }

    /// Current value of `key`, if any
    pub fn get(&self, key: &str) -> Option<String> {
        self.data.lock().get(key).cloned()
    }

    /// Remove `key`. Returns 1 if a key was removed, 0 if it was absent.
    pub fn delete(&self, key: &str) -> u64 {
        match self.data.lock().remove(key) {
            Some(_) => 1,
            None => 0,
        }
    }

    /// 1 if `key` is present, 0 otherwise
    pub fn exists(&self, key: &str) -> u64 {
        u64::from(self.data.lock().contains_key(key))
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// True when no keys are stored
    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }
}
