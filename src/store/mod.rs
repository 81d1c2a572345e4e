//! Storage abstractions for the directory.
//!
//! The directory is layered over a generic path-addressable document store:
//! a single JSON tree whose nodes are reached by `/`-delimited paths such as
//! `/users/42` or `/username->id/alice`.

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

use serde_json::{Map, Value};

use crate::error::{DirectoryError, Result};

/// Path-addressable JSON document store.
pub trait DocumentStore: Send + Sync {
    /// Read the value at `path`. A missing path is a
    /// [`DirectoryError::NotFound`], never a default value.
    fn get(&self, path: &str) -> Result<Value>;

    /// Write `value` at `path`, creating intermediate objects as needed.
    fn put(&self, path: &str, value: Value) -> Result<()>;

    /// Remove the value at `path`. A missing path is a
    /// [`DirectoryError::NotFound`].
    fn delete(&self, path: &str) -> Result<()>;
}

/// Read `path`, mapping a missing path to `None` instead of an error.
pub(crate) fn optional<S: DocumentStore + ?Sized>(
    store: &S,
    path: &str,
) -> Result<Option<Value>> {
    match store.get(path) {
        Ok(value) => Ok(Some(value)),
        Err(DirectoryError::NotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

pub(crate) fn read_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments(path) {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

pub(crate) fn write_path(root: &mut Value, path: &str, value: Value) {
    let parts: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = parts.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = node
            .as_object_mut()
            .expect("node was just made an object")
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    node.as_object_mut()
        .expect("node was just made an object")
        .insert(last.to_string(), value);
}

pub(crate) fn remove_path(root: &mut Value, path: &str) -> Option<Value> {
    let parts: Vec<&str> = segments(path).collect();
    let (last, parents) = parts.split_last()?;

    let mut node = root;
    for segment in parents {
        node = node.as_object_mut()?.get_mut(*segment)?;
    }
    node.as_object_mut()?.remove(*last)
}
