//! Shared test utilities.
//!
//! Provides deterministic inventory fixtures, an in-memory blob store seeded
//! to match them, and extractors for asserting on built documents.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let records = sample_records(3);
//! let blobs = seeded_blobs(&records);
//! let doc = build(&records, |c, n| blobs.get(c, n), &test_options());
//! assert_eq!(entry_keys(&doc), ["CAR001", "CAR002", "CAR003"]);
//! ```

use crate::gallery::{BuildOptions, GalleryDocument, PageLayout};
use crate::reference::split_reference;
use crate::retry::RetryPolicy;
use crate::store::MemoryBlobStore;
use crate::types::ItemRecord;

/// Container the fixtures reference.
pub const FIXTURE_CONTAINER: &str = "alicecardealer";

const MAKES_AND_MODELS: &[(&str, &str, &str)] = &[
    ("Sedan", "Toyota", "Corolla"),
    ("SUV", "Ford", "Explorer"),
    ("Electric", "Tesla", "Model 3"),
    ("Luxury", "BMW", "5 Series"),
    ("SUV", "Honda", "CR-V"),
    ("Sedan", "Hyundai", "Elantra"),
];

const COLORS: &[&str] = &["Red", "Black", "White", "Blue", "Silver", "Gray"];

// =========================================================================
// Fixtures
// =========================================================================

/// A car record without a content reference.
pub fn car(category: &str, row_key: &str, make: &str, model: &str, price: i64) -> ItemRecord {
    ItemRecord::new(category, row_key)
        .with("make", make)
        .with("model", model)
        .with("price", price)
}

/// `n` deterministic cars `CAR001..`, each referencing `alicecardealer/CARnnn.png`.
pub fn sample_records(n: usize) -> Vec<ItemRecord> {
    (1..=n)
        .map(|i| {
            let (category, make, model) = MAKES_AND_MODELS[(i - 1) % MAKES_AND_MODELS.len()];
            let row_key = format!("CAR{i:03}");
            car(category, &row_key, make, model, 15000 + 1000 * (i as i64 - 1))
                .with("year", 2015 + (i as i64 % 11))
                .with("color", COLORS[(i - 1) % COLORS.len()])
                .with("mileage", 10000 + 5000 * i as i64)
                .with_content_ref(format!("{FIXTURE_CONTAINER}/{row_key}.png"))
        })
        .collect()
}

/// An in-memory blob store holding a blob for every resolvable reference.
///
/// Blob bytes are the blob name, so every image payload is distinct.
pub fn seeded_blobs(records: &[ItemRecord]) -> MemoryBlobStore {
    records
        .iter()
        .filter_map(|r| r.content_ref.as_deref())
        .filter_map(|reference| split_reference(reference).ok())
        .fold(MemoryBlobStore::new(), |store, r| {
            store.with_blob(r.container, r.name, r.name.as_bytes(), "image/png")
        })
}

/// Sequential build options with the stock caption and no retries.
pub fn test_options() -> BuildOptions {
    BuildOptions {
        layout: PageLayout {
            title: "Alice's Car Dealership".to_string(),
            count_label: "Total cars in inventory".to_string(),
            image_width: 300,
        },
        caption: vec!["{make} {model}".to_string(), "Price: ${price}".to_string()],
        default_subtype: "octet-stream".to_string(),
        max_workers: 1,
        retry: RetryPolicy::NONE,
    }
}

// =========================================================================
// Extractors
// =========================================================================

/// Row keys of the document's entries, in order.
pub fn entry_keys(document: &GalleryDocument) -> Vec<String> {
    document
        .entries()
        .iter()
        .map(|e| e.row_key.clone())
        .collect()
}
