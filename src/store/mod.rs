//! Store Module
//!
//! Typed key space on top of the skip list.
//!
//! ## Responsibilities
//! - Closed object model: every key holds either a string or a list
//! - Type-checked list operations (`WrongType` on mismatch)
//! - Snapshot load at open, snapshot save at close
//!
//! ## Object Model
//! ```text
//! ┌──────────────┐      ┌──────────────────────────────┐
//! │  key (bytes) │ ───▶ │ Object::String(bytes)        │
//! └──────────────┘      │ Object::List([bytes, ...])   │
//!                       └──────────────────────────────┘
//! ```
//!
//! An object is exclusively owned by its entry. `SET` replaces it wholesale,
//! `LPUSH` mutates a list in place.

pub mod snapshot;

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{LodeError, Result};
use crate::skiplist::SkipList;

/// Value held by a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    String(Bytes),
    List(Vec<Bytes>),
}

impl Object {
    /// Short type name, as reported in logs
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::String(_) => "string",
            Object::List(_) => "list",
        }
    }
}

/// The key space
pub struct Store {
    /// Ordered map from key to object
    data: SkipList<Bytes, Object>,

    /// Where the snapshot is read from and written to (None = memory only)
    snapshot_path: Option<PathBuf>,
}

impl Store {
    /// Create an empty, memory-only store
    pub fn new() -> Self {
        Self {
            data: SkipList::new(),
            snapshot_path: None,
        }
    }

    /// Open a store backed by a snapshot file
    ///
    /// A missing snapshot yields an empty store. An unreadable one is logged
    /// and also yields an empty store; startup never fails on the snapshot.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut store = Self {
            data: SkipList::new(),
            snapshot_path: Some(path.clone()),
        };

        match snapshot::load(&path, &mut store) {
            Ok(stats) => {
                tracing::info!(
                    "Loaded {} records from {} ({} lines skipped)",
                    stats.records_loaded,
                    path.display(),
                    stats.lines_skipped
                );
            }
            Err(e) => {
                tracing::warn!("Snapshot {} unreadable, starting empty: {}", path.display(), e);
                store.data.clear();
            }
        }

        store
    }

    // =========================================================================
    // String operations
    // =========================================================================

    /// Install a string value, discarding whatever the key held before
    pub fn set(&mut self, key: Bytes, value: Bytes) {
        self.data.insert(key, Object::String(value));
    }

    /// Get a string value
    ///
    /// Keys holding a list read as absent.
    pub fn get(&self, key: &[u8]) -> Option<&Bytes> {
        match self.data.get(key) {
            Some(Object::String(value)) => Some(value),
            Some(Object::List(_)) | None => None,
        }
    }

    // =========================================================================
    // List operations
    // =========================================================================

    /// Append one value to the list at `key`, creating it if absent
    pub fn lpush(&mut self, key: Bytes, value: Bytes) -> Result<usize> {
        self.lpush_many(key, vec![value])
    }

    /// Append values in order to the list at `key`, creating it if absent
    ///
    /// Returns the new length. A key holding a string is left untouched and
    /// `LodeError::WrongType` is returned.
    pub fn lpush_many(&mut self, key: Bytes, values: Vec<Bytes>) -> Result<usize> {
        match self.data.get_mut(key.as_ref()) {
            Some(Object::List(list)) => {
                list.extend(values);
                Ok(list.len())
            }
            Some(Object::String(_)) => Err(LodeError::WrongType),
            None if values.is_empty() => Ok(0),
            None => {
                let len = values.len();
                self.data.insert(key, Object::List(values));
                Ok(len)
            }
        }
    }

    /// All elements of the list at `key`, in insertion order
    ///
    /// An absent key is an empty list.
    pub fn lrange(&self, key: &[u8]) -> Result<&[Bytes]> {
        match self.data.get(key) {
            Some(Object::List(list)) => Ok(list),
            Some(Object::String(_)) => Err(LodeError::WrongType),
            None => Ok(&[]),
        }
    }

    // =========================================================================
    // Key space
    // =========================================================================

    /// Remove a key of any type; true if it existed
    pub fn del(&mut self, key: &[u8]) -> bool {
        self.data.remove(key).is_some()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.data.contains_key(key)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, &Object)> {
        self.data.iter()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Write the snapshot, returning the number of records written
    ///
    /// Memory-only stores write nothing.
    pub fn save(&self) -> Result<usize> {
        match &self.snapshot_path {
            Some(path) => {
                let written = snapshot::save(path, self)?;
                tracing::info!("Saved {} records to {}", written, path.display());
                Ok(written)
            }
            None => Ok(0),
        }
    }

    /// Flush the snapshot and drop the store
    pub fn close(self) -> Result<()> {
        self.save()?;
        Ok(())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
