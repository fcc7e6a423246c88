//! # Lot Gallery
//!
//! Builds a single static HTML page showing a car dealership's inventory.
//! Each car is a row in a table store; each row may point at an image in a
//! blob store. The page lists every car with its caption and its image
//! inlined as a `data:` URI, and is published to a public site root so it
//! can be served as-is.
//!
//! # Pipeline
//!
//! ```text
//! 1. Read     table store  →  Vec<ItemRecord>    (list or filtered query)
//! 2. Build    records      →  GalleryDocument    (fetch + base64 each image)
//! 3. Render   document     →  HTML               (pure, deterministic)
//! 4. Publish  HTML         →  index.html + $web/<owner>_index.html
//! ```
//!
//! Only steps 1, 2, and 4 touch storage, and always through the
//! [`store::RecordStore`] and [`store::BlobStore`] traits.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | `ItemRecord` and attribute `Value`s, serialized as flat table entities |
//! | [`reference`] | Splits a `container/name` content reference; media subtype from the name |
//! | [`filter`] | Parser and evaluator for `field op value and/or ...` query expressions |
//! | [`store`] | Record and blob store traits with in-memory and local-directory backends |
//! | [`retry`] | Bounded retry with doubling backoff for transient store faults |
//! | [`gallery`] | Joins records with their images into a `GalleryDocument` |
//! | [`render`] | Renders a `GalleryDocument` to HTML using Maud |
//! | [`publish`] | Writes the local copy and uploads the page to the site root |
//! | [`import`] | Loads records from JSON and uploads a shared image per record |
//! | [`config`] | `gallery.toml` loading, validation, and merging over stock defaults |
//! | [`output`] | CLI output formatting for every command |
//!
//! # Design Decisions
//!
//! ## Per-Item Faults Never Abort a Build
//!
//! A car whose reference is malformed or whose image is missing still gets a
//! row, with an empty image cell. The build only fails on faults that
//! affect the whole page: reading the table, writing the local copy, or
//! publishing. See [`gallery`].
//!
//! ## Explicit Configuration
//!
//! Owner, store names, caption templates, and fetch limits come from one
//! [`config::SiteConfig`], resolved once in `main` and passed down. Table,
//! container, and page names derive from the owner unless overridden.
//!
//! ## Typed Provisioning
//!
//! Creating a table or container that already exists is reported as
//! [`store::Provisioned::Existing`], not as an error, so import and publish
//! can run any number of times. Every other provisioning fault propagates.

pub mod config;
pub mod filter;
pub mod gallery;
pub mod import;
pub mod output;
pub mod publish;
pub mod reference;
pub mod render;
pub mod retry;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
