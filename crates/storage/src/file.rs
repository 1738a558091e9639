//! Filesystem-backed record store.
//!
//! [`FileStore`] keeps one JSON document per record:
//!
//! ```text
//! <root>/
//! ├── users/<phone>.json
//! ├── tokens/<id>.json
//! └── checks/<id>.json
//! ```
//!
//! # Atomicity
//!
//! Writes go to `<key>.json.tmp` and are renamed over the target, so readers
//! never observe a half-written record. Operations on the same key are
//! serialized through an internal [`KeyLocks`] registry; a create therefore
//! cannot race another create, and an update cannot resurrect a record that a
//! concurrent delete just removed.
//!
//! Filesystem calls run on Tokio's blocking pool and cannot be cancelled.
//! When a [`TimeoutStore`](crate::TimeoutStore) gives up on a write, the
//! write may still complete afterwards: a `create` reported as
//! [`StorageError::Timeout`] can leave the record in place.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{fs, io::AsyncWriteExt};

use crate::{
    backend::RecordStore,
    error::{StorageError, StorageResult},
    lock::KeyLocks,
    types::{Collection, validate_key},
};

const RECORD_EXTENSION: &str = "json";
const TEMP_SUFFIX: &str = ".json.tmp";

/// Record store persisting each record as a file under a root directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
    locks: KeyLocks,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating one directory per collection.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if a collection directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        for collection in Collection::ALL {
            let dir = root.join(collection.as_str());
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::io_with_source(format!("create directory {}", dir.display()), e)
            })?;
        }
        Ok(Self { root, locks: KeyLocks::new() })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, collection: Collection, key: &str) -> PathBuf {
        self.root.join(collection.as_str()).join(format!("{key}.{RECORD_EXTENSION}"))
    }

    fn temp_path(&self, collection: Collection, key: &str) -> PathBuf {
        self.root.join(collection.as_str()).join(format!("{key}{TEMP_SUFFIX}"))
    }

    async fn exists(&self, collection: Collection, key: &str) -> StorageResult<bool> {
        match fs::metadata(self.record_path(collection, key)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io_with_source(
                format!("stat {collection}/{}", collection.log_key(key)),
                e,
            )),
        }
    }

    /// Writes `record` to a temp file, flushes it, and renames it into place.
    async fn write_atomically(
        &self,
        collection: Collection,
        key: &str,
        record: &[u8],
    ) -> StorageResult<()> {
        let temp = self.temp_path(collection, key);
        let io_err = |op: &str, e: std::io::Error| {
            let shown = collection.log_key(key);
            StorageError::io_with_source(format!("{op} {collection}/{shown}"), e)
        };

        let mut file = fs::File::create(&temp).await.map_err(|e| io_err("open", e))?;
        file.write_all(record).await.map_err(|e| io_err("write", e))?;
        file.sync_all().await.map_err(|e| io_err("sync", e))?;
        drop(file);

        fs::rename(&temp, self.record_path(collection, key)).await.map_err(|e| io_err("rename", e))
    }
}

#[async_trait]
impl RecordStore for FileStore {
    #[tracing::instrument(
        skip(self, key, record),
        fields(key = collection.log_key(key), size = record.len())
    )]
    async fn create(&self, collection: Collection, key: &str, record: Bytes) -> StorageResult<()> {
        validate_key(key)?;
        let _guard = self.locks.lock(collection, key).await;

        if self.exists(collection, key).await? {
            return Err(StorageError::conflict(collection, key));
        }
        self.write_atomically(collection, key, &record).await
    }

    #[tracing::instrument(skip(self, key), fields(key = collection.log_key(key)))]
    async fn read(&self, collection: Collection, key: &str) -> StorageResult<Bytes> {
        validate_key(key)?;
        let _guard = self.locks.lock(collection, key).await;

        match fs::read(self.record_path(collection, key)).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::not_found(collection, key))
            },
            Err(e) => Err(StorageError::io_with_source(
                format!("read {collection}/{}", collection.log_key(key)),
                e,
            )),
        }
    }

    #[tracing::instrument(
        skip(self, key, record),
        fields(key = collection.log_key(key), size = record.len())
    )]
    async fn update(&self, collection: Collection, key: &str, record: Bytes) -> StorageResult<()> {
        validate_key(key)?;
        let _guard = self.locks.lock(collection, key).await;

        if !self.exists(collection, key).await? {
            return Err(StorageError::not_found(collection, key));
        }
        self.write_atomically(collection, key, &record).await
    }

    #[tracing::instrument(skip(self, key), fields(key = collection.log_key(key)))]
    async fn delete(&self, collection: Collection, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let _guard = self.locks.lock(collection, key).await;

        match fs::remove_file(self.record_path(collection, key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::not_found(collection, key))
            },
            Err(e) => Err(StorageError::io_with_source(
                format!("delete {collection}/{}", collection.log_key(key)),
                e,
            )),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn list_keys(&self, collection: Collection) -> StorageResult<Vec<String>> {
        let dir = self.root.join(collection.as_str());
        let io_err =
            |e: std::io::Error| StorageError::io_with_source(format!("list {collection}"), e);

        let mut entries = fs::read_dir(&dir).await.map_err(io_err)?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_owned());
            }
        }
        Ok(keys)
    }
}
