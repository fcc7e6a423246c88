//! Inventory import.
//!
//! Loads records from a JSON file (an array of flat entities with
//! `PartitionKey`, `RowKey`, and attribute keys) and writes them into the
//! stores. With an image, every record gets its own copy uploaded as
//! `<RowKey>.<ext>` in the inventory container, and the record's `blob_path`
//! is pointed at it.
//!
//! Import is idempotent: the table and container are created only if missing,
//! uploads overwrite, and records are upserted by key. Running the same
//! import twice leaves the stores exactly as one run would.

use crate::store::{BlobStore, Provisioned, RecordStore, StoreError};
use crate::types::ItemRecord;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid records in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("image {} has no file extension", path.display())]
    MissingExtension { path: PathBuf },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read a JSON array of records.
pub fn load_records(path: &Path) -> Result<Vec<ItemRecord>, ImportError> {
    let content = fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ImportError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// An image file read into memory, ready to upload once per record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    /// Lowercased file extension, e.g. `png`.
    pub extension: String,
    /// Content type guessed from the extension.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl LocalImage {
    pub fn read(path: &Path) -> Result<Self, ImportError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| ImportError::MissingExtension {
                path: path.to_path_buf(),
            })?;
        let bytes = fs::read(path).map_err(|source| ImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            extension,
            content_type,
            bytes,
        })
    }

    /// Blob name for a record: `<RowKey>.<ext>`.
    pub fn blob_name(&self, record: &ItemRecord) -> String {
        format!("{}.{}", record.row_key, self.extension)
    }
}

/// What an import did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub table: String,
    pub container: String,
    pub table_state: Provisioned,
    pub container_state: Provisioned,
    /// Row keys written, in input order.
    pub records: Vec<String>,
    /// Blobs uploaded.
    pub uploaded: usize,
}

/// Write `records` into the stores, uploading `image` for each if given.
///
/// Stops at the first store fault. Records written before the fault stay
/// written; rerunning the import completes it.
pub fn import(
    records: Vec<ItemRecord>,
    image: Option<&LocalImage>,
    record_store: &impl RecordStore,
    blob_store: &impl BlobStore,
    container: &str,
) -> Result<ImportSummary, ImportError> {
    let table_state = record_store.ensure_table()?;
    log_provisioned("table", record_store.table(), table_state);
    let container_state = blob_store.ensure_container(container)?;
    log_provisioned("container", container, container_state);

    let mut written = Vec::with_capacity(records.len());
    let mut uploaded = 0;
    for mut record in records {
        if let Some(image) = image {
            let name = image.blob_name(&record);
            blob_store.put(container, &name, &image.bytes, &image.content_type)?;
            tracing::debug!(container, name = %name, "uploaded image");
            record.content_ref = Some(format!("{container}/{name}"));
            uploaded += 1;
        }
        written.push(record.row_key.clone());
        record_store.upsert(record)?;
    }

    tracing::info!(
        table = record_store.table(),
        records = written.len(),
        uploaded,
        "import complete"
    );
    Ok(ImportSummary {
        table: record_store.table().to_string(),
        container: container.to_string(),
        table_state,
        container_state,
        records: written,
        uploaded,
    })
}

fn log_provisioned(kind: &str, name: &str, state: Provisioned) {
    match state {
        Provisioned::Created => tracing::info!(kind, name, "created"),
        Provisioned::Existing => tracing::debug!(kind, name, "already exists"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryBlobStore, MemoryRecordStore};
    use crate::test_helpers::*;
    use crate::types::Value;
    use tempfile::TempDir;

    fn png() -> LocalImage {
        LocalImage {
            extension: "png".to_string(),
            content_type: "image/png".to_string(),
            bytes: b"\x89PNG".to_vec(),
        }
    }

    #[test]
    fn load_records_reads_entity_array() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cars.json");
        fs::write(
            &path,
            r#"[
                {"PartitionKey": "SUV", "RowKey": "CAR001", "make": "Ford", "price": 21000},
                {"PartitionKey": "Sedan", "RowKey": "CAR002", "make": "Honda",
                 "blob_path": "alicecardealer/CAR002.jpg"}
            ]"#,
        )
        .unwrap();
        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field("price"), Some(Value::Int(21000)));
        assert_eq!(
            records[1].content_ref.as_deref(),
            Some("alicecardealer/CAR002.jpg")
        );
    }

    #[test]
    fn load_records_reports_parse_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cars.json");
        fs::write(&path, r#"[{"RowKey": "CAR001"}]"#).unwrap();
        assert!(matches!(load_records(&path), Err(ImportError::Parse { .. })));
    }

    #[test]
    fn local_image_guesses_content_type() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Car.JPG");
        fs::write(&path, b"jpeg").unwrap();
        let image = LocalImage::read(&path).unwrap();
        assert_eq!(image.extension, "jpg");
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(image.bytes, b"jpeg");
    }

    #[test]
    fn local_image_requires_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("car");
        fs::write(&path, b"x").unwrap();
        assert!(matches!(
            LocalImage::read(&path),
            Err(ImportError::MissingExtension { .. })
        ));
    }

    #[test]
    fn import_uploads_one_image_per_record() {
        let records = MemoryRecordStore::new("aliceCarInventory");
        let blobs = MemoryBlobStore::new();
        let summary = import(
            sample_records(3),
            Some(&png()),
            &records,
            &blobs,
            FIXTURE_CONTAINER,
        )
        .unwrap();

        assert_eq!(summary.records, ["CAR001", "CAR002", "CAR003"]);
        assert_eq!(summary.uploaded, 3);
        assert_eq!(summary.table_state, Provisioned::Created);
        assert_eq!(summary.container_state, Provisioned::Created);
        assert_eq!(
            blobs.list_blobs(FIXTURE_CONTAINER).unwrap(),
            ["CAR001.png", "CAR002.png", "CAR003.png"]
        );
        let stored = records.query("RowKey eq 'CAR002'").unwrap();
        assert_eq!(
            stored[0].content_ref.as_deref(),
            Some("alicecardealer/CAR002.png")
        );
    }

    #[test]
    fn import_without_image_keeps_references() {
        let records = MemoryRecordStore::new("aliceCarInventory");
        let blobs = MemoryBlobStore::new();
        let input = vec![car("SUV", "CAR001", "Ford", "Explorer", 1).with_content_ref("x/y.gif")];
        let summary = import(input, None, &records, &blobs, FIXTURE_CONTAINER).unwrap();
        assert_eq!(summary.uploaded, 0);
        assert!(blobs.list_blobs(FIXTURE_CONTAINER).unwrap().is_empty());
        assert_eq!(records.list().unwrap()[0].content_ref.as_deref(), Some("x/y.gif"));
    }

    #[test]
    fn import_is_idempotent() {
        let records = MemoryRecordStore::new("aliceCarInventory");
        let blobs = MemoryBlobStore::new();
        import(sample_records(4), Some(&png()), &records, &blobs, FIXTURE_CONTAINER).unwrap();
        let first = records.list().unwrap();

        let again = import(sample_records(4), Some(&png()), &records, &blobs, FIXTURE_CONTAINER)
            .unwrap();
        assert_eq!(again.table_state, Provisioned::Existing);
        assert_eq!(again.container_state, Provisioned::Existing);
        assert_eq!(records.list().unwrap(), first);
        assert_eq!(blobs.list_blobs(FIXTURE_CONTAINER).unwrap().len(), 4);
    }

    #[test]
    fn import_into_invalid_container_fails() {
        let records = MemoryRecordStore::new("aliceCarInventory");
        let blobs = MemoryBlobStore::new();
        let err = import(sample_records(1), None, &records, &blobs, "a/b").unwrap_err();
        assert!(matches!(err, ImportError::Store(StoreError::InvalidName { .. })));
    }
}
