//! Directory-backed stores.
//!
//! A local "storage account" is a directory with a `tables/` and a `blobs/`
//! subdirectory (see the [module docs](super) for the layout).
//!
//! ## Atomic Overwrite
//!
//! Every write goes to a hidden temp file next to the target and is then
//! renamed over it. Readers see either the previous version or the new one,
//! never a partially written file. This is what makes re-publishing the
//! gallery safe while it is being served.
//!
//! A blob upload stages the blob and its sidecar first and renames the blob
//! last, so an upload that fails at any step leaves the previous blob in
//! place.
//!
//! ## Blob Properties
//!
//! Content type, size, and etag are stored as JSON under
//! `<container>/.meta/<name>.json`. A blob written by hand without a sidecar
//! still has properties: type `application/octet-stream`, size and etag
//! computed from the file.

use super::backend::{
    BlobProperties, BlobStore, RecordStore, ResourceKind, StoreError, etag, validate_blob_name,
    validate_resource_name,
};
use crate::types::ItemRecord;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Per-container directory holding blob property sidecars.
pub(crate) const META_DIR: &str = ".meta";

const TABLES_DIR: &str = "tables";
const BLOBS_DIR: &str = "blobs";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A fully written temp file next to its target, not yet renamed over it.
struct Staged {
    temp: PathBuf,
    target: PathBuf,
}

impl Staged {
    fn write(path: &Path, bytes: &[u8]) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file_name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let mut temp_name = std::ffi::OsString::from(".");
        temp_name.push(file_name);
        temp_name.push(".tmp");
        let temp = path.with_file_name(temp_name);

        if let Err(e) = fs::write(&temp, bytes) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }
        Ok(Self {
            temp,
            target: path.to_path_buf(),
        })
    }

    fn commit(self) -> io::Result<()> {
        if let Err(e) = fs::rename(&self.temp, &self.target) {
            let _ = fs::remove_file(&self.temp);
            return Err(e);
        }
        Ok(())
    }

    fn discard(self) {
        let _ = fs::remove_file(&self.temp);
    }
}

/// Write `bytes` to `path` via a temp file and rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    Staged::write(path, bytes)?.commit()
}

fn is_not_found(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::NotFound
}

// ============================================================================
// Records
// ============================================================================

/// One table stored as a JSON array in `tables/<table>.json`.
pub struct LocalRecordStore {
    table: String,
    path: PathBuf,
}

impl LocalRecordStore {
    pub fn open(root: &Path, table: &str) -> Result<Self, StoreError> {
        validate_resource_name(ResourceKind::Table, table)?;
        Ok(Self {
            table: table.to_string(),
            path: root.join(TABLES_DIR).join(format!("{table}.json")),
        })
    }

    fn load(&self) -> Result<Vec<ItemRecord>, StoreError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            if is_not_found(&e) {
                StoreError::not_found(ResourceKind::Table, &self.table)
            } else {
                StoreError::Io(e)
            }
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, records: &[ItemRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(records)?;
        write_atomic(&self.path, json.as_bytes())?;
        Ok(())
    }
}

impl RecordStore for LocalRecordStore {
    fn table(&self) -> &str {
        &self.table
    }

    fn create_table(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Err(StoreError::already_exists(ResourceKind::Table, &self.table));
        }
        self.save(&[])
    }

    fn list(&self) -> Result<Vec<ItemRecord>, StoreError> {
        let mut records = self.load()?;
        records.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(records)
    }

    fn upsert(&self, record: ItemRecord) -> Result<(), StoreError> {
        let mut records = self.load()?;
        match records.iter_mut().find(|r| r.key() == record.key()) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        records.sort_by(|a, b| a.key().cmp(&b.key()));
        self.save(&records)
    }
}

// ============================================================================
// Blobs
// ============================================================================

/// Blob containers stored as directories under `blobs/`.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn open(root: &Path) -> Self {
        Self {
            root: root.join(BLOBS_DIR),
        }
    }

    fn container_dir(&self, container: &str) -> Result<PathBuf, StoreError> {
        validate_resource_name(ResourceKind::Container, container)?;
        Ok(self.root.join(container))
    }

    /// Resolve the blob path, requiring the container to exist.
    fn blob_paths(&self, container: &str, name: &str) -> Result<(PathBuf, PathBuf), StoreError> {
        let dir = self.container_dir(container)?;
        validate_blob_name(name)?;
        if !dir.is_dir() {
            return Err(StoreError::not_found(ResourceKind::Container, container));
        }
        let blob = dir.join(name);
        let meta = dir.join(META_DIR).join(format!("{name}.json"));
        Ok((blob, meta))
    }
}

impl BlobStore for LocalBlobStore {
    fn create_container(&self, container: &str) -> Result<(), StoreError> {
        let dir = self.container_dir(container)?;
        if dir.is_dir() {
            return Err(StoreError::already_exists(ResourceKind::Container, container));
        }
        fs::create_dir_all(&dir)?;
        Ok(())
    }

    fn put(
        &self,
        container: &str,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<BlobProperties, StoreError> {
        let (blob_path, meta_path) = self.blob_paths(container, name)?;
        let properties = BlobProperties {
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
            etag: etag(bytes),
        };
        let sidecar = serde_json::to_vec_pretty(&properties)?;

        // Stage both files before replacing either, and swap the blob in last.
        let blob = Staged::write(&blob_path, bytes)?;
        let meta = match Staged::write(&meta_path, &sidecar) {
            Ok(meta) => meta,
            Err(e) => {
                blob.discard();
                return Err(e.into());
            }
        };
        let previous_meta = fs::read(&meta_path).ok();
        if let Err(e) = meta.commit() {
            blob.discard();
            return Err(e.into());
        }
        if let Err(e) = blob.commit() {
            let _ = match previous_meta {
                Some(old) => write_atomic(&meta_path, &old),
                None => fs::remove_file(&meta_path),
            };
            return Err(e.into());
        }
        tracing::debug!(container, name, size = properties.size, "stored blob");
        Ok(properties)
    }

    fn get(&self, container: &str, name: &str) -> Result<Vec<u8>, StoreError> {
        let (blob_path, _) = self.blob_paths(container, name)?;
        fs::read(&blob_path).map_err(|e| {
            if is_not_found(&e) {
                StoreError::not_found(ResourceKind::Blob, format!("{container}/{name}"))
            } else {
                StoreError::Io(e)
            }
        })
    }

    fn properties(&self, container: &str, name: &str) -> Result<BlobProperties, StoreError> {
        let (_, meta_path) = self.blob_paths(container, name)?;
        match fs::read_to_string(&meta_path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if is_not_found(&e) => {
                let bytes = self.get(container, name)?;
                Ok(BlobProperties {
                    content_type: DEFAULT_CONTENT_TYPE.to_string(),
                    size: bytes.len() as u64,
                    etag: etag(&bytes),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list_blobs(&self, container: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.container_dir(container)?;
        if !dir.is_dir() {
            return Err(StoreError::not_found(ResourceKind::Container, container));
        }
        let mut names = Vec::new();
        let walker = WalkDir::new(&dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| e.file_name() != META_DIR);
        for entry in walker {
            let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            if file_name.starts_with('.') && file_name.ends_with(".tmp") {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&dir) {
                let name: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                names.push(name.join("/"));
            }
        }
        names.sort();
        Ok(names)
    }
}
