//! Gallery building: the join between inventory rows and their images.
//!
//! [`build`] walks the records in the order given, resolves each record's
//! content reference through an injected fetch function, and produces a
//! [`GalleryDocument`] with every image inlined as base64. It does no I/O of
//! its own, so tests drive it with an in-memory store or a plain closure.
//!
//! ## Per-Item Faults
//!
//! A record whose reference is malformed, or whose image cannot be fetched,
//! still produces an entry. Its media cell is [`MediaCell::Unavailable`], the
//! fault is logged, and the build moves on. Nothing a single record does can
//! abort the build or affect another entry.
//!
//! ## Ordering and Parallelism
//!
//! Entries appear in input order and the document's total is the number of
//! input records, not the number of images that resolved. With
//! `max_workers > 1` fetches run on a dedicated rayon pool; the indexed
//! parallel iterator collects results back into input order.

use crate::config::SiteConfig;
use crate::reference::{ContentRef, ReferenceError, media_subtype, split_reference};
use crate::retry::RetryPolicy;
use crate::store::StoreError;
use crate::types::ItemRecord;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rayon::prelude::*;
use std::time::Duration;
use thiserror::Error;

/// Why an entry has no image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryFault {
    #[error("malformed content reference: {0}")]
    MalformedReference(#[from] ReferenceError),
    #[error("content unavailable for {container}/{name}: {reason}")]
    ContentUnavailable {
        container: String,
        name: String,
        reason: String,
    },
}

/// An image ready to inline as a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// Media subtype, e.g. `png` in `image/png`.
    pub subtype: String,
    /// Standard base64 of the image bytes.
    pub payload: String,
}

impl InlineImage {
    pub fn data_uri(&self) -> String {
        format!("data:image/{};base64,{}", self.subtype, self.payload)
    }
}

/// The image cell of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCell {
    Inline(InlineImage),
    /// The record has no content reference.
    Empty,
    /// The record has a reference that could not be resolved.
    Unavailable(EntryFault),
}

/// One rendered record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryEntry {
    pub partition_key: String,
    pub row_key: String,
    /// Caption lines, one per configured template.
    pub caption: Vec<String>,
    pub media: MediaCell,
}

/// Page-level settings carried into rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub title: String,
    /// Label for the total-count line, e.g. `Total cars in inventory`.
    pub count_label: String,
    /// Display width of each image, in pixels.
    pub image_width: u32,
}

/// The build output. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryDocument {
    layout: PageLayout,
    entries: Vec<GalleryEntry>,
    total: usize,
}

impl GalleryDocument {
    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    /// Number of input records, including those whose image failed.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Per-item faults with their entry positions.
    pub fn faults(&self) -> impl Iterator<Item = (usize, &EntryFault)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| match &entry.media {
                MediaCell::Unavailable(fault) => Some((i, fault)),
                _ => None,
            })
    }
}

/// Settings for [`build`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub layout: PageLayout,
    /// Caption templates; `{field}` is replaced with the record's value.
    pub caption: Vec<String>,
    /// Subtype used when a blob name has no extension.
    pub default_subtype: String,
    /// Concurrent fetches. `1` fetches sequentially on the calling thread.
    pub max_workers: usize,
    pub retry: RetryPolicy,
}

impl BuildOptions {
    pub fn from_site_config(config: &SiteConfig) -> Self {
        Self {
            layout: PageLayout {
                title: config.page_title(),
                count_label: config.gallery.count_label.clone(),
                image_width: config.gallery.image_width,
            },
            caption: config.gallery.caption.clone(),
            default_subtype: config.gallery.default_subtype.clone(),
            max_workers: crate::config::effective_workers(&config.fetch),
            retry: RetryPolicy::new(
                config.fetch.retries,
                Duration::from_millis(config.fetch.backoff_ms),
            ),
        }
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from_site_config(&SiteConfig::default())
    }
}

/// Join records with their content and assemble the gallery document.
///
/// `fetch(container, name)` is the only way this function reaches storage.
pub fn build<F>(records: &[ItemRecord], fetch: F, options: &BuildOptions) -> GalleryDocument
where
    F: Fn(&str, &str) -> Result<Vec<u8>, StoreError> + Sync,
{
    let entries: Vec<GalleryEntry> = if options.max_workers > 1 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(options.max_workers)
            .build()
        {
            Ok(pool) => pool.install(|| {
                records
                    .par_iter()
                    .map(|record| build_entry(record, &fetch, options))
                    .collect()
            }),
            Err(e) => {
                tracing::warn!(error = %e, "could not start fetch pool, fetching sequentially");
                build_sequential(records, &fetch, options)
            }
        }
    } else {
        build_sequential(records, &fetch, options)
    };

    GalleryDocument {
        layout: options.layout.clone(),
        entries,
        total: records.len(),
    }
}

fn build_sequential<F>(records: &[ItemRecord], fetch: &F, options: &BuildOptions) -> Vec<GalleryEntry>
where
    F: Fn(&str, &str) -> Result<Vec<u8>, StoreError>,
{
    records
        .iter()
        .map(|record| build_entry(record, fetch, options))
        .collect()
}

fn build_entry<F>(record: &ItemRecord, fetch: &F, options: &BuildOptions) -> GalleryEntry
where
    F: Fn(&str, &str) -> Result<Vec<u8>, StoreError>,
{
    let caption = options
        .caption
        .iter()
        .map(|template| render_caption(template, record))
        .collect();

    let media = match record.content_ref.as_deref() {
        None => MediaCell::Empty,
        Some(reference) => match resolve_image(reference, fetch, options) {
            Ok(image) => MediaCell::Inline(image),
            Err(fault) => {
                tracing::warn!(
                    partition_key = %record.partition_key,
                    row_key = %record.row_key,
                    "{fault}"
                );
                MediaCell::Unavailable(fault)
            }
        },
    };

    GalleryEntry {
        partition_key: record.partition_key.clone(),
        row_key: record.row_key.clone(),
        caption,
        media,
    }
}

fn resolve_image<F>(reference: &str, fetch: &F, options: &BuildOptions) -> Result<InlineImage, EntryFault>
where
    F: Fn(&str, &str) -> Result<Vec<u8>, StoreError>,
{
    let ContentRef { container, name } = split_reference(reference)?;
    let bytes = options
        .retry
        .run(|| fetch(container, name))
        .map_err(|e| EntryFault::ContentUnavailable {
            container: container.to_string(),
            name: name.to_string(),
            reason: e.to_string(),
        })?;

    let mut subtype = media_subtype(name);
    if subtype.is_empty() {
        subtype = options.default_subtype.clone();
    }

    Ok(InlineImage {
        subtype,
        payload: STANDARD.encode(bytes),
    })
}

/// Substitute `{field}` placeholders with the record's values.
///
/// Unknown fields become empty text. An unclosed `{` is kept literally.
pub fn render_caption(template: &str, record: &ItemRecord) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                if let Some(value) = record.field(&after[..close]) {
                    out.push_str(&value.to_string());
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
