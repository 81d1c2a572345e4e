//! File-backed document store, one JSON tree per file.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::RwLock;

use serde_json::{Map, Value};

use super::{DocumentStore, read_path, remove_path, write_path};
use crate::error::{DirectoryError, Result};

/// [`DocumentStore`] persisted as a single human-readable JSON file.
///
/// The whole tree is loaded at open and rewritten after every mutation.
/// That is acceptable for the directory's single-process, low-volume
/// deployment target; there is no write-ahead log and no atomicity across
/// paths.
pub struct JsonStore {
    path: PathBuf,
    tree: RwLock<Value>,
}

impl JsonStore {
    /// Open the store at `path`, loading the existing tree or starting from
    /// an empty one when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tree = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "starting empty database");
                Value::Object(Map::new())
            },
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            tree: RwLock::new(tree),
        })
    }

    fn save(&self, tree: &Value) -> Result<()> {
        fs::write(&self.path, serde_json::to_vec_pretty(tree)?)?;
        Ok(())
    }
}

impl DocumentStore for JsonStore {
    fn get(&self, path: &str) -> Result<Value> {
        let tree = self.tree.read().expect("store lock poisoned");
        read_path(&tree, path)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(path.to_owned()))
    }

    fn put(&self, path: &str, value: Value) -> Result<()> {
        let mut tree = self.tree.write().expect("store lock poisoned");
        write_path(&mut tree, path, value);
        self.save(&tree)
    }

    fn delete(&self, path: &str) -> Result<()> {
        let mut tree = self.tree.write().expect("store lock poisoned");
        remove_path(&mut tree, path)
            .ok_or_else(|| DirectoryError::NotFound(path.to_owned()))?;
        self.save(&tree)
    }
}
