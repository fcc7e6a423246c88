//! Content-reference parsing.
//!
//! Records point at their image with a single path string of the form
//! `<container>/<name>`. The container is everything before the **first**
//! `/`; the blob name is the remainder and may itself contain `/` (virtual
//! directories inside the container):
//!
//! - `"alicecardealer/CAR001.png"` → (`alicecardealer`, `CAR001.png`)
//! - `"photos/2024/lot-a/CAR001.jpg"` → (`photos`, `2024/lot-a/CAR001.jpg`)
//! - `"no-separator"` → [`ReferenceError::MissingSeparator`]
//!
//! ## Media Subtype
//!
//! The inline `data:` URI needs an `image/<subtype>`. The subtype is the text
//! after the last `.` of the blob's final path segment, lower-cased. A name
//! without an extension yields an empty subtype; the gallery builder replaces
//! it with its configured default.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("content reference {0:?} has no '/' separator")]
    MissingSeparator(String),
    #[error("content reference {0:?} has an empty container or blob name")]
    EmptyPart(String),
}

/// A content reference split into its container and blob name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRef<'a> {
    pub container: &'a str,
    pub name: &'a str,
}

/// Split a `<container>/<name>` reference on its first separator.
pub fn split_reference(reference: &str) -> Result<ContentRef<'_>, ReferenceError> {
    let (container, name) = reference
        .split_once('/')
        .ok_or_else(|| ReferenceError::MissingSeparator(reference.to_string()))?;
    if container.is_empty() || name.is_empty() {
        return Err(ReferenceError::EmptyPart(reference.to_string()));
    }
    Ok(ContentRef { container, name })
}

/// Media subtype derived from a blob name's extension (`"CAR001.PNG"` → `"png"`).
pub fn media_subtype(name: &str) -> String {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}
