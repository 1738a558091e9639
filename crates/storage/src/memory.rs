//! In-memory record store implementation.
//!
//! This module provides [`MemoryStore`], an in-memory implementation of
//! [`RecordStore`] suitable for testing, development, and single-process
//! deployments where durability is not required.
//!
//! # Features
//!
//! - **Thread-safe**: Uses [`parking_lot::RwLock`] for concurrent access
//! - **Atomic per key**: Every operation runs under one lock acquisition, so a create-over-create
//!   race yields exactly one winner
//! - **Ordered listing**: Keys are stored in a [`BTreeMap`] per collection
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use uptime_storage::{Collection, MemoryStore, RecordStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!
//!     store.create(Collection::Tokens, "abc", Bytes::from("{}")).await.unwrap();
//!     assert!(store.create(Collection::Tokens, "abc", Bytes::from("{}")).await.is_err());
//! }
//! ```
//!
//! # Limitations
//!
//! - Data is not persisted; all data is lost when the process exits

use std::{
    collections::{BTreeMap, HashMap, btree_map::Entry},
    sync::Arc,
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::{
    backend::RecordStore,
    error::{StorageError, StorageResult},
    types::{Collection, validate_key},
};

type Records = HashMap<Collection, BTreeMap<String, Bytes>>;

/// In-memory record store.
///
/// # Cloning
///
/// `MemoryStore` is cheaply cloneable via [`Arc`]. All clones share the same
/// underlying records.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<Records>>,
}

impl MemoryStore {
    /// Creates a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records in `collection`.
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        self.records.read().get(&collection).map_or(0, BTreeMap::len)
    }

    /// Returns `true` if `collection` holds no records.
    #[must_use]
    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    #[tracing::instrument(
        skip(self, key, record),
        fields(key = collection.log_key(key), size = record.len())
    )]
    async fn create(&self, collection: Collection, key: &str, record: Bytes) -> StorageResult<()> {
        validate_key(key)?;
        let mut records = self.records.write();

        match records.entry(collection).or_default().entry(key.to_owned()) {
            Entry::Occupied(_) => Err(StorageError::conflict(collection, key)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            },
        }
    }

    #[tracing::instrument(skip(self, key), fields(key = collection.log_key(key)))]
    async fn read(&self, collection: Collection, key: &str) -> StorageResult<Bytes> {
        validate_key(key)?;
        let records = self.records.read();

        records
            .get(&collection)
            .and_then(|c| c.get(key))
            .cloned()
            .ok_or_else(|| StorageError::not_found(collection, key))
    }

    #[tracing::instrument(
        skip(self, key, record),
        fields(key = collection.log_key(key), size = record.len())
    )]
    async fn update(&self, collection: Collection, key: &str, record: Bytes) -> StorageResult<()> {
        validate_key(key)?;
        let mut records = self.records.write();

        let slot = records
            .get_mut(&collection)
            .and_then(|c| c.get_mut(key))
            .ok_or_else(|| StorageError::not_found(collection, key))?;
        *slot = record;
        Ok(())
    }

    #[tracing::instrument(skip(self, key), fields(key = collection.log_key(key)))]
    async fn delete(&self, collection: Collection, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let mut records = self.records.write();

        records
            .get_mut(&collection)
            .and_then(|c| c.remove(key))
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(collection, key))
    }

    #[tracing::instrument(skip(self))]
    async fn list_keys(&self, collection: Collection) -> StorageResult<Vec<String>> {
        let records = self.records.read();
        Ok(records.get(&collection).map(|c| c.keys().cloned().collect()).unwrap_or_default())
    }
}
