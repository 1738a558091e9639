//! Record store trait definition.
//!
//! This module defines [`RecordStore`], the core persistence abstraction. All
//! storage implementations ([`MemoryStore`](crate::MemoryStore),
//! [`FileStore`](crate::FileStore), [`TimeoutStore`](crate::TimeoutStore))
//! implement this trait.
//!
//! # Design Philosophy
//!
//! - **Records are bytes**: no assumptions about the serialization format at the trait level;
//!   [`RecordStoreExt`] layers JSON on top.
//! - **Whole-record writes**: there is no partial update primitive. Field merging belongs to the
//!   caller, which must hold a per-key critical section ([`KeyLocks`](crate::KeyLocks)) around
//!   its read-merge-write.
//! - **Single-key atomicity**: every operation is atomic for its key. There are no multi-key
//!   transactions; cross-record consistency is the caller's job.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    error::{StorageError, StorageResult},
    types::Collection,
};

/// Abstract keyed record store.
///
/// Backends are expected to be thread-safe (`Send + Sync`) and to tolerate
/// concurrent operations on different keys.
///
/// # Key Operations
///
/// | Method | Missing key | Existing key |
/// |--------|-------------|--------------|
/// | [`create`](RecordStore::create) | stores | `Conflict` |
/// | [`read`](RecordStore::read) | `NotFound` | returns bytes |
/// | [`update`](RecordStore::update) | `NotFound` | replaces bytes |
/// | [`delete`](RecordStore::delete) | `NotFound` | removes |
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use uptime_storage::{Collection, MemoryStore, RecordStore};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let store = MemoryStore::new();
///
/// store.create(Collection::Users, "5551234567", Bytes::from("{}")).await.unwrap();
/// let record = store.read(Collection::Users, "5551234567").await.unwrap();
/// assert_eq!(record, Bytes::from("{}"));
/// # });
/// ```
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Stores a new record.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Conflict`] if `key` already holds a record.
    /// - [`StorageError::InvalidKey`] if `key` fails [`validate_key`](crate::validate_key).
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn create(&self, collection: Collection, key: &str, record: Bytes) -> StorageResult<()>;

    /// Reads a record.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if `key` holds no record.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn read(&self, collection: Collection, key: &str) -> StorageResult<Bytes>;

    /// Replaces an existing record wholesale.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if `key` holds no record.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn update(&self, collection: Collection, key: &str, record: Bytes) -> StorageResult<()>;

    /// Removes a record.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if `key` holds no record.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn delete(&self, collection: Collection, key: &str) -> StorageResult<()>;

    /// Lists every key currently stored in `collection`, in unspecified order.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn list_keys(&self, collection: Collection) -> StorageResult<Vec<String>>;
}

/// Typed JSON access on top of any [`RecordStore`].
///
/// `serde_json` serializes struct fields in declaration order, so a record
/// written twice with the same content yields identical bytes.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use uptime_storage::{Collection, MemoryStore, RecordStoreExt};
///
/// #[derive(Serialize, Deserialize, Debug, PartialEq)]
/// struct Note {
///     text: String,
/// }
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let store = MemoryStore::new();
/// let note = Note { text: "hi".into() };
/// store.create_json(Collection::Checks, "n1", &note).await.unwrap();
/// let back: Note = store.read_json(Collection::Checks, "n1").await.unwrap();
/// assert_eq!(back, note);
/// # });
/// ```
#[async_trait]
pub trait RecordStoreExt: RecordStore {
    /// Reads and decodes a JSON record.
    async fn read_json<T>(&self, collection: Collection, key: &str) -> StorageResult<T>
    where
        T: DeserializeOwned + Send,
    {
        let bytes = self.read(collection, key).await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::serialization_with_source(format!("decode {collection}/{key}"), e)
        })
    }

    /// Encodes and creates a JSON record.
    async fn create_json<T>(&self, collection: Collection, key: &str, value: &T) -> StorageResult<()>
    where
        T: Serialize + Sync,
    {
        let bytes = encode(collection, key, value)?;
        self.create(collection, key, bytes).await
    }

    /// Encodes and replaces a JSON record.
    async fn update_json<T>(&self, collection: Collection, key: &str, value: &T) -> StorageResult<()>
    where
        T: Serialize + Sync,
    {
        let bytes = encode(collection, key, value)?;
        self.update(collection, key, bytes).await
    }
}

impl<S: RecordStore + ?Sized> RecordStoreExt for S {}

fn encode<T: Serialize>(collection: Collection, key: &str, value: &T) -> StorageResult<Bytes> {
    serde_json::to_vec(value).map(Bytes::from).map_err(|e| {
        StorageError::serialization_with_source(format!("encode {collection}/{key}"), e)
    })
}
