//! Shared dictionary type.
//!
//! Dictionaries are the argument type generator procedures receive, so they
//! are reference types: every clone of a `Dictionary` sees the same entries.

use crate::error::{CoreError, CoreResult};
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// A string-keyed dictionary with shared ownership.
///
/// Uses `FxHashMap` for fast insertion and lookup. Iteration order is not
/// preserved.
#[derive(Clone, Default)]
pub struct Dictionary {
    items: Arc<RwLock<FxHashMap<Arc<str>, Value>>>,
}

impl Dictionary {
    /// Create a new empty dictionary.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dictionary with pre-allocated capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Arc::new(RwLock::new(FxHashMap::with_capacity_and_hasher(
                capacity,
                Default::default(),
            ))),
        }
    }

    /// Get the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Check if the dictionary is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Get a value by key.
    #[inline]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.items.read().get(key).cloned()
    }

    /// Get a value by key, reporting a missing key as an error.
    pub fn require(&self, key: &str) -> CoreResult<Value> {
        self.get(key).ok_or_else(|| CoreError::key(key))
    }

    /// Set a key-value pair, returning the previous value.
    #[inline]
    pub fn set(&self, key: impl Into<Arc<str>>, value: impl Into<Value>) -> Option<Value> {
        self.items.write().insert(key.into(), value.into())
    }

    /// Remove a key, returning its value.
    #[inline]
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.items.write().remove(key)
    }

    /// Check whether a key is present.
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.items.read().contains_key(key)
    }

    /// Snapshot of the keys.
    pub fn keys(&self) -> Vec<Arc<str>> {
        self.items.read().keys().cloned().collect()
    }

    /// Returns true if both handles share the same entries.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    /// Weak, type-erased handle used for allocation accounting.
    pub fn downgrade(&self) -> Weak<dyn Any + Send + Sync> {
        let weak: Weak<RwLock<FxHashMap<Arc<str>, Value>>> = Arc::downgrade(&self.items);
        weak
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.items.try_read() {
            Some(items) => f.debug_map().entries(items.iter()).finish(),
            None => f.write_str("{<locked>}"),
        }
    }
}

impl<K: Into<Arc<str>>, V: Into<Value>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let dict = Self::new();
        {
            let mut items = dict.items.write();
            for (k, v) in iter {
                items.insert(k.into(), v.into());
            }
        }
        dict
    }
}
