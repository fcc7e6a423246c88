//! In-memory stores.
//!
//! Used as fakes in tests and anywhere a throwaway account is enough.
//! Interior state sits behind a `Mutex` so the stores are `Sync` and can be
//! shared with the parallel fetch path.

use super::backend::{
    BlobProperties, BlobStore, RecordStore, ResourceKind, StoreError, etag, validate_blob_name,
    validate_resource_name,
};
use crate::types::ItemRecord;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

type RowKey = (String, String);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A single table held in memory. `None` until the table is created.
pub struct MemoryRecordStore {
    table: String,
    rows: Mutex<Option<BTreeMap<RowKey, ItemRecord>>>,
}

impl MemoryRecordStore {
    /// A store whose table does not exist yet.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: Mutex::new(None),
        }
    }

    /// A store whose table exists and holds `records`.
    pub fn with_records(table: impl Into<String>, records: Vec<ItemRecord>) -> Self {
        let rows = records
            .into_iter()
            .map(|r| ((r.partition_key.clone(), r.row_key.clone()), r))
            .collect();
        Self {
            table: table.into(),
            rows: Mutex::new(Some(rows)),
        }
    }
}

impl RecordStore for MemoryRecordStore {
    fn table(&self) -> &str {
        &self.table
    }

    fn create_table(&self) -> Result<(), StoreError> {
        validate_resource_name(ResourceKind::Table, &self.table)?;
        let mut rows = lock(&self.rows);
        if rows.is_some() {
            return Err(StoreError::already_exists(ResourceKind::Table, &self.table));
        }
        *rows = Some(BTreeMap::new());
        Ok(())
    }

    fn list(&self) -> Result<Vec<ItemRecord>, StoreError> {
        lock(&self.rows)
            .as_ref()
            .map(|rows| rows.values().cloned().collect())
            .ok_or_else(|| StoreError::not_found(ResourceKind::Table, &self.table))
    }

    fn upsert(&self, record: ItemRecord) -> Result<(), StoreError> {
        let mut rows = lock(&self.rows);
        let rows = rows
            .as_mut()
            .ok_or_else(|| StoreError::not_found(ResourceKind::Table, &self.table))?;
        rows.insert(
            (record.partition_key.clone(), record.row_key.clone()),
            record,
        );
        Ok(())
    }
}

struct StoredBlob {
    bytes: Vec<u8>,
    properties: BlobProperties,
}

/// Blob containers held in memory.
#[derive(Default)]
pub struct MemoryBlobStore {
    containers: Mutex<BTreeMap<String, BTreeMap<String, StoredBlob>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style seeding for tests: creates the container if needed.
    pub fn with_blob(self, container: &str, name: &str, bytes: &[u8], content_type: &str) -> Self {
        lock(&self.containers)
            .entry(container.to_string())
            .or_default()
            .insert(name.to_string(), stored(bytes, content_type));
        self
    }

    /// Container names, sorted.
    pub fn containers(&self) -> Vec<String> {
        lock(&self.containers).keys().cloned().collect()
    }
}

fn stored(bytes: &[u8], content_type: &str) -> StoredBlob {
    StoredBlob {
        bytes: bytes.to_vec(),
        properties: BlobProperties {
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
            etag: etag(bytes),
        },
    }
}

impl BlobStore for MemoryBlobStore {
    fn create_container(&self, container: &str) -> Result<(), StoreError> {
        validate_resource_name(ResourceKind::Container, container)?;
        let mut containers = lock(&self.containers);
        if containers.contains_key(container) {
            return Err(StoreError::already_exists(ResourceKind::Container, container));
        }
        containers.insert(container.to_string(), BTreeMap::new());
        Ok(())
    }

    fn put(
        &self,
        container: &str,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<BlobProperties, StoreError> {
        validate_blob_name(name)?;
        let mut containers = lock(&self.containers);
        let blobs = containers
            .get_mut(container)
            .ok_or_else(|| StoreError::not_found(ResourceKind::Container, container))?;
        let blob = stored(bytes, content_type);
        let properties = blob.properties.clone();
        blobs.insert(name.to_string(), blob);
        Ok(properties)
    }

    fn get(&self, container: &str, name: &str) -> Result<Vec<u8>, StoreError> {
        let containers = lock(&self.containers);
        let blobs = containers
            .get(container)
            .ok_or_else(|| StoreError::not_found(ResourceKind::Container, container))?;
        blobs
            .get(name)
            .map(|b| b.bytes.clone())
            .ok_or_else(|| StoreError::not_found(ResourceKind::Blob, format!("{container}/{name}")))
    }

    fn properties(&self, container: &str, name: &str) -> Result<BlobProperties, StoreError> {
        let containers = lock(&self.containers);
        containers
            .get(container)
            .ok_or_else(|| StoreError::not_found(ResourceKind::Container, container))?
            .get(name)
            .map(|b| b.properties.clone())
            .ok_or_else(|| StoreError::not_found(ResourceKind::Blob, format!("{container}/{name}")))
    }

    fn list_blobs(&self, container: &str) -> Result<Vec<String>, StoreError> {
        lock(&self.containers)
            .get(container)
            .map(|blobs| blobs.keys().cloned().collect())
            .ok_or_else(|| StoreError::not_found(ResourceKind::Container, container))
    }
}
