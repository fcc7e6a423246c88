//! Store traits and shared types.
//!
//! [`RecordStore`] is bound to one table; [`BlobStore`] spans every container
//! of an account. Both mirror the subset of the table and blob services the
//! gallery needs, including their provisioning behavior: `create_*` fails
//! with [`StoreError::AlreadyExists`] when the resource is there, and the
//! provided `ensure_*` methods turn that into [`Provisioned::Existing`].

use crate::filter::{Filter, FilterError};
use crate::types::ItemRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Table,
    Container,
    Blob,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Table => "table",
            ResourceKind::Container => "container",
            ResourceKind::Blob => "blob",
        })
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: ResourceKind, name: String },
    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: ResourceKind, name: String },
    #[error("invalid {kind} name: {name:?}")]
    InvalidName { kind: ResourceKind, name: String },
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn already_exists(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    pub fn invalid_name(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::InvalidName {
            kind,
            name: name.into(),
        }
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Only I/O faults whose kind points at a dropped or slow connection
    /// qualify. Permission and not-found faults fail the same way every time.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

/// Outcome of an idempotent provisioning call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    Existing,
}

/// Treat "already exists" as success; propagate every other fault.
pub fn provisioned(result: Result<(), StoreError>) -> Result<Provisioned, StoreError> {
    match result {
        Ok(()) => Ok(Provisioned::Created),
        Err(StoreError::AlreadyExists { .. }) => Ok(Provisioned::Existing),
        Err(e) => Err(e),
    }
}

/// Metadata recorded alongside each blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobProperties {
    pub content_type: String,
    pub size: u64,
    /// Hex SHA-256 of the blob's bytes.
    pub etag: String,
}

/// A table of [`ItemRecord`]s.
pub trait RecordStore {
    /// Name of the table this store is bound to.
    fn table(&self) -> &str;

    /// Create the table. Fails with `AlreadyExists` if it is already there.
    fn create_table(&self) -> Result<(), StoreError>;

    /// Create the table unless it exists.
    fn ensure_table(&self) -> Result<Provisioned, StoreError> {
        provisioned(self.create_table())
    }

    /// Every record, ordered by partition key then row key.
    fn list(&self) -> Result<Vec<ItemRecord>, StoreError>;

    /// Records matching a filter expression, in [`list`](Self::list) order.
    fn query(&self, filter: &str) -> Result<Vec<ItemRecord>, StoreError> {
        let filter = Filter::parse(filter)?;
        Ok(self
            .list()?
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect())
    }

    /// Insert the record, or replace the one with the same keys.
    fn upsert(&self, record: ItemRecord) -> Result<(), StoreError>;
}

/// Named binary content grouped into containers.
///
/// `Sync` so one store can serve parallel fetches.
pub trait BlobStore: Sync {
    /// Create a container. Fails with `AlreadyExists` if it is already there.
    fn create_container(&self, container: &str) -> Result<(), StoreError>;

    /// Create a container unless it exists.
    fn ensure_container(&self, container: &str) -> Result<Provisioned, StoreError> {
        provisioned(self.create_container(container))
    }

    /// Store bytes under `container/name`, replacing any existing blob.
    fn put(
        &self,
        container: &str,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<BlobProperties, StoreError>;

    fn get(&self, container: &str, name: &str) -> Result<Vec<u8>, StoreError>;

    fn properties(&self, container: &str, name: &str) -> Result<BlobProperties, StoreError>;

    /// Blob names in a container, sorted.
    fn list_blobs(&self, container: &str) -> Result<Vec<String>, StoreError>;
}

pub(crate) fn validate_resource_name(kind: ResourceKind, name: &str) -> Result<(), StoreError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if bad {
        return Err(StoreError::invalid_name(kind, name));
    }
    Ok(())
}

pub(crate) fn validate_blob_name(name: &str) -> Result<(), StoreError> {
    let bad = name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name.chars().any(char::is_control)
        || name.split('/').any(|segment| {
            matches!(segment, "" | "." | "..") || segment == super::local::META_DIR
        });
    if bad {
        return Err(StoreError::invalid_name(ResourceKind::Blob, name));
    }
    Ok(())
}

pub(crate) fn etag(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_exists_is_provisioned_existing() {
        let result = provisioned(Err(StoreError::already_exists(
            ResourceKind::Container,
            "$web",
        )));
        assert_eq!(result.unwrap(), Provisioned::Existing);
    }

    #[test]
    fn other_faults_propagate_from_provisioning() {
        let result = provisioned(Err(StoreError::invalid_name(
            ResourceKind::Container,
            "a/b",
        )));
        assert!(matches!(result, Err(StoreError::InvalidName { .. })));
    }

    #[test]
    fn transient_faults_are_connection_level_io() {
        use std::io::{Error, ErrorKind};
        for kind in [ErrorKind::TimedOut, ErrorKind::ConnectionReset, ErrorKind::Interrupted] {
            assert!(StoreError::Io(Error::from(kind)).is_transient(), "{kind:?}");
        }
        for kind in [ErrorKind::PermissionDenied, ErrorKind::NotFound, ErrorKind::InvalidData] {
            assert!(!StoreError::Io(Error::from(kind)).is_transient(), "{kind:?}");
        }
        assert!(!StoreError::Io(Error::other("disk full")).is_transient());
        assert!(!StoreError::not_found(ResourceKind::Blob, "x").is_transient());
    }

    #[test]
    fn resource_names() {
        assert!(validate_resource_name(ResourceKind::Container, "$web").is_ok());
        assert!(validate_resource_name(ResourceKind::Table, "aliceCarInventory").is_ok());
        assert!(validate_resource_name(ResourceKind::Container, "").is_err());
        assert!(validate_resource_name(ResourceKind::Container, "..").is_err());
        assert!(validate_resource_name(ResourceKind::Container, "a/b").is_err());
    }

    #[test]
    fn blob_names() {
        assert!(validate_blob_name("CAR001.png").is_ok());
        assert!(validate_blob_name("2024/lot-a/CAR001.png").is_ok());
        assert!(validate_blob_name("../escape.png").is_err());
        assert!(validate_blob_name("a//b.png").is_err());
        assert!(validate_blob_name("/abs.png").is_err());
        assert!(validate_blob_name(".meta/x.json").is_err());
    }

    #[test]
    fn etag_is_sha256_hex() {
        assert_eq!(
            etag(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
