//! Gallery configuration.
//!
//! Handles loading, validating, and merging `gallery.toml`. Stock defaults are
//! the base layer; a user file overrides only the keys it sets. Every
//! component receives the resolved [`SiteConfig`] explicitly; nothing reads
//! configuration from global state.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! owner = "demo"                 # Letters and digits only; prefixes derived names
//!
//! [storage]
//! root = "storage"               # Local storage account directory
//! # table = "demoCarInventory"   # Default: <owner>CarInventory
//! # container = "democardealer"  # Default: <owner>cardealer
//!
//! [site]
//! container = "$web"             # Public site root container
//! # destination = "demo_index.html"  # Default: <owner>_index.html
//! output = "index.html"          # Local copy of the rendered page
//!
//! [gallery]
//! # title = "Demo's Car Dealership"  # Default: <Owner>'s Car Dealership
//! count_label = "Total cars in inventory"
//! caption = ["{make} {model}", "Price: ${price}"]
//! image_width = 300
//! default_subtype = "octet-stream"
//!
//! [fetch]
//! max_workers = 1                # 1 = sequential; clamped to CPU cores
//! retries = 0                    # Extra attempts on transient faults
//! backoff_ms = 200               # First retry delay; doubles each retry
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Gallery configuration loaded from `gallery.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Owner identifier; prefixes the table, container, and page names.
    pub owner: String,
    /// Where records and blobs live.
    pub storage: StorageConfig,
    /// Where the finished page is published.
    pub site: SiteRootConfig,
    /// What the page shows.
    pub gallery: GalleryConfig,
    /// How images are fetched.
    pub fetch: FetchConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            owner: "demo".to_string(),
            storage: StorageConfig::default(),
            site: SiteRootConfig::default(),
            gallery: GalleryConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.is_empty() || !self.owner.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Validation(format!(
                "owner must be letters and digits only, got {:?}",
                self.owner
            )));
        }
        if self.site.container.is_empty() {
            return Err(ConfigError::Validation(
                "site.container must not be empty".into(),
            ));
        }
        if self.gallery.image_width == 0 {
            return Err(ConfigError::Validation(
                "gallery.image_width must be non-zero".into(),
            ));
        }
        if self.gallery.default_subtype.is_empty() {
            return Err(ConfigError::Validation(
                "gallery.default_subtype must not be empty".into(),
            ));
        }
        if self.fetch.max_workers == 0 {
            return Err(ConfigError::Validation(
                "fetch.max_workers must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Inventory table: `storage.table`, or `<owner>CarInventory`.
    pub fn table_name(&self) -> String {
        self.storage
            .table
            .clone()
            .unwrap_or_else(|| format!("{}CarInventory", self.owner))
    }

    /// Image container: `storage.container`, or `<owner>cardealer`.
    pub fn container_name(&self) -> String {
        self.storage
            .container
            .clone()
            .unwrap_or_else(|| format!("{}cardealer", self.owner))
    }

    /// Published page name: `site.destination`, or `<owner>_index.html`.
    pub fn destination_name(&self) -> String {
        self.site
            .destination
            .clone()
            .unwrap_or_else(|| format!("{}_index.html", self.owner))
    }

    /// Page title: `gallery.title`, or `<Owner>'s Car Dealership`.
    pub fn page_title(&self) -> String {
        self.gallery
            .title
            .clone()
            .unwrap_or_else(|| format!("{}'s Car Dealership", title_case(&self.owner)))
    }
}

/// Capitalize each run of letters: `"alice"` → `"Alice"`, `"bob2x"` → `"Bob2X"`.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if prev_is_letter {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_is_letter = c.is_alphabetic();
    }
    out
}

/// Local storage account settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding `tables/` and `blobs/`.
    pub root: PathBuf,
    /// Table name override.
    pub table: Option<String>,
    /// Image container override.
    pub container: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage"),
            table: None,
            container: None,
        }
    }
}

/// Publishing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteRootConfig {
    /// Container served as the public site root.
    pub container: String,
    /// Published page name override.
    pub destination: Option<String>,
    /// Local file the rendered page is written to.
    pub output: PathBuf,
}

impl Default for SiteRootConfig {
    fn default() -> Self {
        Self {
            container: "$web".to_string(),
            destination: None,
            output: PathBuf::from("index.html"),
        }
    }
}

/// Page content settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Page title override.
    pub title: Option<String>,
    /// Label for the total-count line.
    pub count_label: String,
    /// Caption templates, one line each. `{field}` inserts a record value.
    pub caption: Vec<String>,
    /// Display width of each image, in pixels.
    pub image_width: u32,
    /// Media subtype for blob names without an extension.
    pub default_subtype: String,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            title: None,
            count_label: "Total cars in inventory".to_string(),
            caption: vec!["{make} {model}".to_string(), "Price: ${price}".to_string()],
            image_width: 300,
            default_subtype: "octet-stream".to_string(),
        }
    }
}

/// Image fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Concurrent fetches. `1` keeps the build sequential.
    /// Values larger than the core count are clamped down.
    pub max_workers: usize,
    /// Extra attempts after a transient fault.
    pub retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_workers: 1,
            retries: 0,
            backoff_ms: 200,
        }
    }
}

/// Resolve the effective fetch worker count.
///
/// `min(max_workers, cores)`, never below 1. The user can constrain down, not up.
pub fn effective_workers(config: &FetchConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_workers.clamp(1, cores.max(1))
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file, falling back to stock defaults if it is absent.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    load_config_with_overrides(path, &Overrides::default())
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub owner: Option<String>,
    pub storage_root: Option<PathBuf>,
}

impl Overrides {
    fn to_toml(&self) -> Option<toml::Value> {
        let owner = self.owner.as_ref()?;
        let mut table = toml::Table::new();
        table.insert("owner".to_string(), toml::Value::String(owner.clone()));
        Some(toml::Value::Table(table))
    }
}

/// Like [`load_config`], with `overrides` merged over the file before
/// validation. A file value that an override replaces is never validated.
pub fn load_config_with_overrides(
    path: &Path,
    overrides: &Overrides,
) -> Result<SiteConfig, ConfigError> {
    let overlay = match (load_raw_config(path)?, overrides.to_toml()) {
        (Some(file), Some(cli)) => Some(merge_toml(file, cli)),
        (file, cli) => file.or(cli),
    };
    let mut config = resolve_config(stock_defaults_value(), overlay)?;
    // Not validated, so it can be applied after the merge.
    if let Some(root) = &overrides.storage_root {
        config.storage.root = root.clone();
    }
    Ok(config)
}

/// Returns a fully-commented stock `gallery.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Lot Gallery Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# Owner identifier, letters and digits only. Used to derive the table,
# container, page title, and published page name.
owner = "demo"

# ---------------------------------------------------------------------------
# Storage account
# ---------------------------------------------------------------------------
[storage]
# Local storage account directory (holds tables/ and blobs/).
root = "storage"

# Inventory table. Defaults to <owner>CarInventory.
# table = "demoCarInventory"

# Container holding the car images. Defaults to <owner>cardealer.
# container = "democardealer"

# ---------------------------------------------------------------------------
# Publishing
# ---------------------------------------------------------------------------
[site]
# Container served as the public static site root.
container = "$web"

# Name of the published page. Defaults to <owner>_index.html.
# destination = "demo_index.html"

# Local copy of the rendered page.
output = "index.html"

# ---------------------------------------------------------------------------
# Page content
# ---------------------------------------------------------------------------
[gallery]
# Page title. Defaults to "<Owner>'s Car Dealership".
# title = "Demo's Car Dealership"

# Label for the total-count line.
count_label = "Total cars in inventory"

# Caption lines shown next to each image. {field} inserts a record value;
# {partition_key} and {row_key} insert the record's keys.
caption = ["{make} {model}", "Price: ${price}"]

# Display width of each image, in pixels.
image_width = 300

# Media subtype for images whose blob name has no extension.
default_subtype = "octet-stream"

# ---------------------------------------------------------------------------
# Fetching
# ---------------------------------------------------------------------------
[fetch]
# Concurrent image fetches. 1 keeps the build sequential.
# Values above the number of CPU cores are clamped down.
max_workers = 1

# Extra attempts after a transient storage fault.
retries = 0

# Delay before the first retry, in milliseconds. Doubles on each retry.
backoff_ms = 200
"##
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_expected_values() {
        let config = SiteConfig::default();
        assert_eq!(config.owner, "demo");
        assert_eq!(config.storage.root, PathBuf::from("storage"));
        assert_eq!(config.site.container, "$web");
        assert_eq!(config.gallery.image_width, 300);
        assert_eq!(config.fetch.max_workers, 1);
    }

    #[test]
    fn derived_names_follow_owner() {
        let config = SiteConfig {
            owner: "alice".to_string(),
            ..SiteConfig::default()
        };
        assert_eq!(config.table_name(), "aliceCarInventory");
        assert_eq!(config.container_name(), "alicecardealer");
        assert_eq!(config.destination_name(), "alice_index.html");
        assert_eq!(config.page_title(), "Alice's Car Dealership");
    }

    #[test]
    fn derived_names_respect_overrides() {
        let toml = r#"
owner = "alice"
[storage]
table = "Inventory"
container = "images"
[site]
destination = "index.html"
[gallery]
title = "Lot 7"
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.table_name(), "Inventory");
        assert_eq!(config.container_name(), "images");
        assert_eq!(config.destination_name(), "index.html");
        assert_eq!(config.page_title(), "Lot 7");
    }

    #[test]
    fn title_case_matches_word_capitalization() {
        assert_eq!(title_case("alice"), "Alice");
        assert_eq!(title_case("ALICE"), "Alice");
        assert_eq!(title_case("bob2x"), "Bob2X");
    }

    // =========================================================================
    // Fetch config tests
    // =========================================================================

    #[test]
    fn effective_workers_default_is_sequential() {
        assert_eq!(effective_workers(&FetchConfig::default()), 1);
    }

    #[test]
    fn effective_workers_clamped_to_cores() {
        let config = FetchConfig {
            max_workers: 99999,
            ..FetchConfig::default()
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_workers(&config), cores);
    }

    #[test]
    fn parse_fetch_config() {
        let toml = r#"
[fetch]
max_workers = 4
retries = 2
backoff_ms = 50
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.fetch.max_workers, 4);
        assert_eq!(config.fetch.retries, 2);
        assert_eq!(config.fetch.backoff_ms, 50);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"image_width = 300"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"image_width = 200"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("image_width").unwrap().as_integer(), Some(200));
    }

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base: toml::Value = toml::from_str(
            r#"
[gallery]
image_width = 300
count_label = "Total"
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[gallery]
image_width = 200
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let gallery = merged.get("gallery").unwrap();
        assert_eq!(gallery.get("image_width").unwrap().as_integer(), Some(200));
        assert_eq!(gallery.get("count_label").unwrap().as_str(), Some("Total"));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str(r#"caption = ["a", "b"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"caption = ["c"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        let caption = merged.get("caption").unwrap().as_array().unwrap();
        assert_eq!(caption.len(), 1);
    }

    // =========================================================================
    // Unknown keys and validation
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("ownr = \"alice\"");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[fetch]\nworkers = 2");
        assert!(result.is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_owner_must_be_alphanumeric() {
        for owner in ["", "alice smith", "alice_1", "al!ce"] {
            let config = SiteConfig {
                owner: owner.to_string(),
                ..SiteConfig::default()
            };
            assert!(config.validate().is_err(), "owner {owner:?} should be rejected");
        }
    }

    #[test]
    fn validate_zero_workers() {
        let mut config = SiteConfig::default();
        config.fetch.max_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_image_width() {
        let mut config = SiteConfig::default();
        config.gallery.image_width = 0;
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn load_config_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("gallery.toml")).unwrap();
        assert_eq!(config.owner, "demo");
    }

    #[test]
    fn load_config_merges_user_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gallery.toml");
        fs::write(&path, "owner = \"alice\"\n[fetch]\nretries = 3\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.owner, "alice");
        assert_eq!(config.fetch.retries, 3);
        assert_eq!(config.fetch.backoff_ms, 200);
        assert_eq!(config.site.container, "$web");
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gallery.toml");
        fs::write(&path, "owner = \"not valid\"\n").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn owner_override_replaces_invalid_file_owner() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gallery.toml");
        fs::write(&path, "owner = \"not valid\"\n[fetch]\nretries = 4\n").unwrap();
        let overrides = Overrides {
            owner: Some("bob".to_string()),
            storage_root: Some(PathBuf::from("/srv/lot")),
        };
        let config = load_config_with_overrides(&path, &overrides).unwrap();
        assert_eq!(config.owner, "bob");
        assert_eq!(config.fetch.retries, 4);
        assert_eq!(config.storage.root, PathBuf::from("/srv/lot"));
        assert_eq!(config.table_name(), "bobCarInventory");
    }

    #[test]
    fn invalid_owner_override_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let overrides = Overrides {
            owner: Some("bob smith".to_string()),
            ..Overrides::default()
        };
        assert!(matches!(
            load_config_with_overrides(&tmp.path().join("gallery.toml"), &overrides),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_config_rejects_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gallery.toml");
        fs::write(&path, "owner = ").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let parsed: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(parsed.owner, defaults.owner);
        assert_eq!(parsed.storage.root, defaults.storage.root);
        assert_eq!(parsed.storage.table, None);
        assert_eq!(parsed.site.container, defaults.site.container);
        assert_eq!(parsed.site.output, defaults.site.output);
        assert_eq!(parsed.gallery.caption, defaults.gallery.caption);
        assert_eq!(parsed.gallery.count_label, defaults.gallery.count_label);
        assert_eq!(parsed.gallery.image_width, defaults.gallery.image_width);
        assert_eq!(parsed.fetch.max_workers, defaults.fetch.max_workers);
        assert_eq!(parsed.fetch.backoff_ms, defaults.fetch.backoff_ms);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value();
        for section in ["storage", "site", "gallery", "fetch"] {
            assert!(value.get(section).is_some(), "missing [{section}]");
        }
        assert!(value.get("owner").is_some());
    }
}
