//! CLI output formatting for every command.
//!
//! Output describes cars, not files. Each record leads with its positional
//! index and caption; keys, image state, and storage paths follow as
//! indented context lines.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Alice's Car Dealership
//! 001 Toyota Corolla
//!     Key: Sedan/CAR001
//!     Image: png
//! 002 Ford Explorer
//!     Key: SUV/CAR002
//!     Image unavailable: content unavailable for alicecardealer/CAR002.png: blob not found
//!
//! Rendered 2 cars: 1 image, 1 unavailable, 0 without image
//! Wrote index.html
//! Published $web/alice_index.html (1532 bytes)
//! ```
//!
//! ## Query
//!
//! ```text
//! 001 Sedan/CAR001
//!     blob_path: alicecardealer/CAR001.png
//!     make: Toyota
//!     price: 15000
//!
//! 1 record
//! ```
//!
//! ## Import
//!
//! ```text
//! Table aliceCarInventory (created)
//! Container alicecardealer (existing)
//! 001 CAR001
//! 002 CAR002
//!
//! Imported 2 records, uploaded 2 images
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::gallery::{GalleryDocument, MediaCell};
use crate::import::ImportSummary;
use crate::publish::PublishTarget;
use crate::store::{BlobProperties, Provisioned};
use crate::types::{CONTENT_REF_FIELD, ItemRecord};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 record`, `2 records`.
fn plural(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

fn provisioned_label(state: Provisioned) -> &'static str {
    match state {
        Provisioned::Created => "created",
        Provisioned::Existing => "existing",
    }
}

// ============================================================================
// Build
// ============================================================================

/// Format the entries of a built gallery and a one-line tally.
pub fn format_build_output(document: &GalleryDocument) -> Vec<String> {
    let mut lines = vec![document.layout().title.clone()];
    let (mut inline, mut unavailable, mut empty) = (0, 0, 0);

    for (i, entry) in document.entries().iter().enumerate() {
        let heading = entry
            .caption
            .first()
            .filter(|line| !line.trim().is_empty())
            .unwrap_or(&entry.row_key);
        lines.push(format!("{} {}", format_index(i + 1), heading));
        lines.push(format!(
            "{}Key: {}/{}",
            indent(1),
            entry.partition_key,
            entry.row_key
        ));
        match &entry.media {
            MediaCell::Inline(image) => {
                inline += 1;
                lines.push(format!("{}Image: {}", indent(1), image.subtype));
            }
            MediaCell::Unavailable(fault) => {
                unavailable += 1;
                lines.push(format!("{}Image unavailable: {}", indent(1), fault));
            }
            MediaCell::Empty => {
                empty += 1;
                lines.push(format!("{}No image", indent(1)));
            }
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Rendered {}: {}, {} unavailable, {} without image",
        plural(document.total(), "car", "cars"),
        plural(inline, "image", "images"),
        unavailable,
        empty
    ));
    lines
}

/// Format where the rendered page went.
pub fn format_publish_output(
    local: Option<&Path>,
    published: Option<(&PublishTarget, &BlobProperties)>,
) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(path) = local {
        lines.push(format!("Wrote {}", path.display()));
    }
    match published {
        Some((target, properties)) => lines.push(format!(
            "Published {}/{} ({} bytes)",
            target.container, target.name, properties.size
        )),
        None => lines.push("Not published".to_string()),
    }
    lines
}

pub fn print_build_output(document: &GalleryDocument) {
    for line in format_build_output(document) {
        println!("{}", line);
    }
}

pub fn print_publish_output(
    local: Option<&Path>,
    published: Option<(&PublishTarget, &BlobProperties)>,
) {
    for line in format_publish_output(local, published) {
        println!("{}", line);
    }
}

// ============================================================================
// Query and count
// ============================================================================

/// Format records as key headers with one indented line per field.
///
/// Fields are listed in name order, the content reference included.
pub fn format_query_output(records: &[ItemRecord]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, record) in records.iter().enumerate() {
        lines.push(format!(
            "{} {}/{}",
            format_index(i + 1),
            record.partition_key,
            record.row_key
        ));

        let mut fields: Vec<(&str, String)> = record
            .attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.to_string()))
            .collect();
        if let Some(reference) = &record.content_ref {
            fields.push((CONTENT_REF_FIELD, reference.clone()));
        }
        fields.sort_by(|a, b| a.0.cmp(b.0));

        for (name, value) in fields {
            lines.push(format!("{}{}: {}", indent(1), name, value));
        }
    }
    lines.push(String::new());
    lines.push(plural(records.len(), "record", "records"));
    lines
}

pub fn print_query_output(records: &[ItemRecord]) {
    for line in format_query_output(records) {
        println!("{}", line);
    }
}

/// `Total cars in inventory: 20`
pub fn format_count(label: &str, total: usize) -> String {
    format!("{}: {}", label, total)
}

pub fn print_count(label: &str, total: usize) {
    println!("{}", format_count(label, total));
}

// ============================================================================
// Import
// ============================================================================

pub fn format_import_output(summary: &ImportSummary) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Table {} ({})",
            summary.table,
            provisioned_label(summary.table_state)
        ),
        format!(
            "Container {} ({})",
            summary.container,
            provisioned_label(summary.container_state)
        ),
    ];
    for (i, row_key) in summary.records.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), row_key));
    }
    lines.push(String::new());
    lines.push(format!(
        "Imported {}, uploaded {}",
        plural(summary.records.len(), "record", "records"),
        plural(summary.uploaded, "image", "images")
    ));
    lines
}

pub fn print_import_output(summary: &ImportSummary) {
    for line in format_import_output(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Blobs
// ============================================================================

/// Format a container listing: one line per blob with type and size.
pub fn format_blob_listing(container: &str, blobs: &[(String, BlobProperties)]) -> Vec<String> {
    let mut lines = vec![container.to_string()];
    for (i, (name, properties)) in blobs.iter().enumerate() {
        lines.push(format!(
            "{}{} {} ({}, {} bytes)",
            indent(1),
            format_index(i + 1),
            name,
            properties.content_type,
            properties.size
        ));
    }
    lines.push(String::new());
    lines.push(plural(blobs.len(), "blob", "blobs"));
    lines
}

pub fn print_blob_listing(container: &str, blobs: &[(String, BlobProperties)]) {
    for line in format_blob_listing(container, blobs) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
