//! [`FieldStore`] – scoped annotations on host objects.
//!
//! A side table keyed by [`ObjectHandle`] identity. Annotations never extend
//! the owner's lifetime: handles are plain ids, and the attach layer calls
//! [`FieldStore::dispose_owner`] when the host reclaims the object. The
//! store supports concurrent get/set/remove; the set-then-take tag lifecycle
//! used by the crash safety net assumes a single writer at a time per owner.

use std::collections::HashMap;

use dashmap::DashMap;
use serde_json::Value;

use crate::model::ObjectHandle;

/// Concurrent owner → {key → value} side table.
#[derive(Debug, Default)]
pub struct FieldStore {
    inner: DashMap<ObjectHandle, HashMap<String, Value>>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value. `None` when the owner or key is absent.
    pub fn get(&self, owner: ObjectHandle, key: &str) -> Option<Value> {
        self.inner.get(&owner).and_then(|map| map.get(key).cloned())
    }

    /// Read a value as a string. `None` on absence or on a non-string value,
    /// mirroring a typed read that refuses a mismatched annotation.
    pub fn get_str(&self, owner: ObjectHandle, key: &str) -> Option<String> {
        match self.get(owner, key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Set `key` for `owner`, creating the owner's map on first use.
    pub fn set(&self, owner: ObjectHandle, key: impl Into<String>, value: Value) {
        self.inner.entry(owner).or_default().insert(key.into(), value);
    }

    /// Remove `key` and return its value, the read-and-clear step of the
    /// tag lifecycle. The owner's map is dropped once empty.
    pub fn take(&self, owner: ObjectHandle, key: &str) -> Option<Value> {
        let taken = self
            .inner
            .get_mut(&owner)
            .and_then(|mut map| map.remove(key));
        self.inner.remove_if(&owner, |_, map| map.is_empty());
        taken
    }

    /// Remove `key` for `owner`, dropping the owner's map once empty.
    pub fn remove(&self, owner: ObjectHandle, key: &str) {
        let _ = self.take(owner, key);
    }

    /// Drop every annotation for `owner`. Called by the attach layer when
    /// the host reclaims the object.
    pub fn dispose_owner(&self, owner: ObjectHandle) {
        self.inner.remove(&owner);
    }

    /// Number of owners currently annotated.
    pub fn owner_count(&self) -> usize {
        self.inner.len()
    }
}
