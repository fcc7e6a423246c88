//! Publishing the rendered page.
//!
//! Two sinks: the local output file and the public site root container.
//! Both overwrite in place and both are atomic from a reader's point of view.
//! The local file goes through a temp file and rename; the blob store's `put`
//! gives the same guarantee for the published copy.
//!
//! Publishing provisions the site root container first. A container that
//! already exists is fine. Any other provisioning fault, and any upload
//! fault that survives the retry budget, is fatal and surfaces as a
//! [`PublishError`].

use crate::config::SiteConfig;
use crate::retry::RetryPolicy;
use crate::store::{BlobProperties, BlobStore, Provisioned, StoreError, write_atomic};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Content type of the published page.
pub const HTML_CONTENT_TYPE: &str = "text/html";

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("failed to provision container {container}: {source}")]
    Provision {
        container: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to upload {container}/{name}: {source}")]
    Upload {
        container: String,
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the page is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub container: String,
    pub name: String,
}

impl PublishTarget {
    /// `<site.container>/<destination>`, e.g. `$web/alice_index.html`.
    pub fn from_site_config(config: &SiteConfig) -> Self {
        Self {
            container: config.site.container.clone(),
            name: config.destination_name(),
        }
    }
}

/// Upload `html` to the site root, creating the container if needed.
pub fn publish(
    store: &impl BlobStore,
    target: &PublishTarget,
    html: &str,
    retry: &RetryPolicy,
) -> Result<BlobProperties, PublishError> {
    let provisioned = store
        .ensure_container(&target.container)
        .map_err(|source| PublishError::Provision {
            container: target.container.clone(),
            source,
        })?;
    if provisioned == Provisioned::Created {
        tracing::info!(container = %target.container, "created site root container");
    }

    let properties = retry
        .run(|| {
            store.put(
                &target.container,
                &target.name,
                html.as_bytes(),
                HTML_CONTENT_TYPE,
            )
        })
        .map_err(|source| PublishError::Upload {
            container: target.container.clone(),
            name: target.name.clone(),
            source,
        })?;

    tracing::info!(
        container = %target.container,
        name = %target.name,
        size = properties.size,
        "published gallery"
    );
    Ok(properties)
}

/// Write `html` to a local file, replacing any previous version atomically.
pub fn write_local(path: &Path, html: &str) -> Result<(), PublishError> {
    write_atomic(path, html.as_bytes()).map_err(|source| PublishError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "wrote local copy");
    Ok(())
}
