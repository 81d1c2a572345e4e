//! In-memory document store.

use std::sync::RwLock;

use serde_json::{Map, Value};

use super::{DocumentStore, read_path, remove_path, write_path};
use crate::error::{DirectoryError, Result};

/// Ephemeral [`DocumentStore`] holding the JSON tree behind a lock.
///
/// Used by tests and by embedders that do not want persistence.
#[derive(Debug)]
pub struct MemoryStore {
    tree: RwLock<Value>,
}

impl MemoryStore {
    /// Create an empty [`MemoryStore`].
    pub fn new() -> Self {
        Self::with_tree(Value::Object(Map::new()))
    }

    /// Create a store seeded with an existing tree.
    pub fn with_tree(tree: Value) -> Self {
        Self {
            tree: RwLock::new(tree),
        }
    }

    /// Owned copy of the whole tree.
    pub fn snapshot(&self) -> Value {
        self.tree.read().expect("store lock poisoned").clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, path: &str) -> Result<Value> {
        let tree = self.tree.read().expect("store lock poisoned");
        read_path(&tree, path)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(path.to_owned()))
    }

    fn put(&self, path: &str, value: Value) -> Result<()> {
        let mut tree = self.tree.write().expect("store lock poisoned");
        write_path(&mut tree, path, value);
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let mut tree = self.tree.write().expect("store lock poisoned");
        remove_path(&mut tree, path)
            .map(drop)
            .ok_or_else(|| DirectoryError::NotFound(path.to_owned()))
    }
}
