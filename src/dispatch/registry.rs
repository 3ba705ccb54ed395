//! Handler and sender registries
//!
//! A registry can be mutated while a dispatch pass is in flight: dispatch
//! copies the entries under the lock and invokes them outside it, so a slow
//! entry never blocks registration. The price is that an entry removed
//! mid-pass may still see one trailing invocation; entries must tolerate
//! that.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Error;

/// Key identifying a registered handler or sender within one registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerKey(String);

impl HandlerKey {
    /// Create an explicit key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandlerKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for HandlerKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Keyed collection of shared entries, safe to mutate during dispatch.
///
/// Entries are kept in insertion order and that order is the dispatch
/// order. Re-inserting an existing key replaces the entry in place without
/// moving it.
pub struct Registry<T: ?Sized> {
    entries: Mutex<Vec<(HandlerKey, Arc<T>)>>,
    next_token: AtomicU64,
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(0),
        }
    }

    /// Insert under an explicit key. Last write wins.
    pub fn insert(&self, key: HandlerKey, entry: Arc<T>) -> HandlerKey {
        let mut entries = self.entries.lock();
        if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = entry;
        } else {
            entries.push((key.clone(), entry));
        }
        key
    }

    /// Insert under a generated key and return it for later removal.
    pub fn insert_anonymous(&self, entry: Arc<T>) -> HandlerKey {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.insert(HandlerKey::new(format!("entry-{token}")), entry)
    }

    /// Remove an entry, returning it.
    pub fn remove(&self, key: &HandlerKey) -> Result<Arc<T>, Error> {
        let mut entries = self.entries.lock();
        let position = entries
            .iter()
            .position(|(k, _)| k == key)
            .ok_or_else(|| Error::HandlerNotFound(key.clone()))?;
        Ok(entries.remove(position).1)
    }

    /// Copy of the current entries in insertion order.
    ///
    /// Iterate the copy outside the lock; the lock is held only for the
    /// duration of the clone.
    pub fn snapshot(&self) -> Vec<(HandlerKey, Arc<T>)> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_roundtrip() {
        let registry: Registry<str> = Registry::new();
        let key = registry.insert(HandlerKey::from("a"), Arc::from("alpha"));

        let removed = registry.remove(&key).unwrap();
        assert_eq!(&*removed, "alpha");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_absent_key_fails() {
        let registry: Registry<str> = Registry::new();
        let err = registry.remove(&HandlerKey::from("missing")).unwrap_err();
        assert!(matches!(err, Error::HandlerNotFound(_)));
    }

    #[test]
    fn test_replace_keeps_position() {
        let registry: Registry<str> = Registry::new();
        registry.insert(HandlerKey::from("a"), Arc::from("one"));
        registry.insert(HandlerKey::from("b"), Arc::from("two"));
        registry.insert(HandlerKey::from("a"), Arc::from("replaced"));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].0.as_str(), "a");
        assert_eq!(&*snapshot[0].1, "replaced");
        assert_eq!(snapshot[1].0.as_str(), "b");
    }

    #[test]
    fn test_generated_keys_unique() {
        let registry: Registry<str> = Registry::new();
        let first = registry.insert_anonymous(Arc::from("one"));
        let second = registry.insert_anonymous(Arc::from("two"));

        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_snapshot_isolated_from_removal() {
        let registry: Registry<str> = Registry::new();
        registry.insert(HandlerKey::from("a"), Arc::from("alpha"));

        let snapshot = registry.snapshot();
        registry.remove(&HandlerKey::from("a")).unwrap();

        // The copy taken before removal still carries the entry.
        assert_eq!(snapshot.len(), 1);
        assert!(registry.is_empty());
    }
}
