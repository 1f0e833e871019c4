use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A shared set of URLs that have already been claimed for processing
///
/// Clones share the same underlying set. [`MemoSet::insert`] is the claim
/// operation: exactly one caller gets `true` for a given key, no matter how
/// many tasks race on it.
#[derive(Debug, Clone, Default)]
pub struct MemoSet {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl MemoSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a key; returns true if it was not present before
    pub fn insert(&self, key: &str) -> bool {
        let mut set = self.lock();
        if set.contains(key) {
            false
        } else {
            set.insert(key.to_string())
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // The set holds no invariants a panicking holder could break
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
