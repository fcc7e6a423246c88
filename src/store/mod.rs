//! Record and blob storage.
//!
//! The gallery reads from two independently addressed stores: inventory rows
//! in a table and images in blob containers. Both are consumed through traits
//! so the builder never depends on where the data lives.
//!
//! | Backend | Records | Blobs |
//! |---|---|---|
//! | **Memory** | [`MemoryRecordStore`] | [`MemoryBlobStore`] |
//! | **Local directory** | [`LocalRecordStore`] | [`LocalBlobStore`] |
//!
//! The local backend lays an account out on disk:
//!
//! ```text
//! storage/
//! ├── tables/
//! │   └── aliceCarInventory.json     # records sorted by (PartitionKey, RowKey)
//! └── blobs/
//!     ├── alicecardealer/
//!     │   ├── .meta/CAR001.png.json  # content type, size, etag
//!     │   └── CAR001.png
//!     └── $web/
//!         └── alice_index.html
//! ```

pub mod backend;
pub mod local;
pub mod memory;

pub use backend::{
    BlobProperties, BlobStore, Provisioned, RecordStore, ResourceKind, StoreError, provisioned,
};
pub use local::{LocalBlobStore, LocalRecordStore};
pub(crate) use local::write_atomic;
pub use memory::{MemoryBlobStore, MemoryRecordStore};
