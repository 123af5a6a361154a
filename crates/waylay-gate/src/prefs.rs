//! [`Preferences`] – the explicit configuration object.
//!
//! A clone-shared handle over one key/value map. The embedder owns
//! persistence and change propagation; when the backing store changes it
//! pushes a fresh snapshot in via [`Preferences::replace_all`]. Readers
//! always get defaults for absent or mistyped keys.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

/// Shared preference map. Cloning shares the underlying storage.
#[derive(Clone, Debug, Default)]
pub struct Preferences {
    values: Arc<RwLock<HashMap<String, Value>>>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => b,
            _ => default,
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(|v| v.as_i64()).unwrap_or(default)
    }

    pub fn get_str(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) => s,
            _ => default.to_string(),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.values.write().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) {
        self.values.write().remove(key);
    }

    /// Swap in a full snapshot from the embedder's backing store.
    pub fn replace_all(&self, values: HashMap<String, Value>) {
        *self.values.write() = values;
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}
