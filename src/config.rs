//! Configuration module.
//!
//! Handles loading and validating `pixdrop.toml`, then layering environment
//! variables on top. The resulting [`Config`] is built once at startup and
//! handed to each component; nothing reads the environment after that.
//!
//! ## Layers
//!
//! Lowest to highest precedence:
//!
//! 1. Stock defaults ([`Config::default`])
//! 2. `pixdrop.toml` in the working directory, or the file passed with `--config`
//! 3. Environment variables (a `.env` file is loaded first by the binary)
//! 4. Command-line flags (applied by `main`)
//!
//! | Variable | Key |
//! |---|---|
//! | `WATCH_FOLDER` | `watch.folder` |
//! | `R2_BUCKET_NAME` | `storage.bucket` |
//! | `R2_ACCOUNT_ID` | `storage.account_id` |
//! | `R2_ACCESS_KEY_ID` | `storage.access_key_id` |
//! | `R2_SECRET_ACCESS_KEY` | `storage.secret_access_key` |
//! | `R2_PUBLIC_URL` | `storage.public_url` |
//! | `R2_ENDPOINT` | `storage.endpoint` |
//!
//! Credentials usually live in the environment; the TOML file holds the rest.
//!
//! ## Configuration Options
//!
//! See [`stock_config_toml`] (or run `pixdrop gen-config`) for every key with
//! its default. Config files are sparse: override just the values you want.
//! Unknown keys are rejected to catch typos early.

use crate::naming::NamingPolicy;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "pixdrop.toml";

/// Largest accepted `qr.size`, in pixels.
pub const MAX_QR_SIZE: u32 = 4096;
/// Largest accepted `qr.margin`, in modules.
pub const MAX_QR_MARGIN: u32 = 64;
/// Largest accepted `qr.border`, in pixels.
pub const MAX_QR_BORDER: u32 = 1024;
/// Largest accepted `qr.inset`, in pixels.
pub const MAX_QR_INSET: u32 = 65_536;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Missing required setting `{key}` (or environment variable {env})")]
    Missing {
        key: &'static str,
        env: &'static str,
    },
}

/// Application configuration loaded from `pixdrop.toml` and the environment.
///
/// All fields have defaults except the storage credentials and the watch folder,
/// which are checked where they are needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Folder watching and the ledger file.
    pub watch: WatchConfig,
    /// Resize and encoding of the uploaded image.
    pub images: ImagesConfig,
    /// QR-annotated variant.
    pub qr: QrConfig,
    /// S3-compatible bucket and public URL.
    pub storage: StorageConfig,
    /// Where the final URL is announced.
    pub announce: AnnounceConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.images.max_width == 0 || self.images.max_height == 0 {
            return Err(ConfigError::Validation(
                "images.max_width and images.max_height must be non-zero".into(),
            ));
        }
        if self.qr.enabled && self.qr.size == 0 {
            return Err(ConfigError::Validation("qr.size must be non-zero".into()));
        }
        let qr_bounds = [
            ("qr.size", self.qr.size, MAX_QR_SIZE),
            ("qr.margin", self.qr.margin, MAX_QR_MARGIN),
            ("qr.border", self.qr.border, MAX_QR_BORDER),
            ("qr.inset", self.qr.inset, MAX_QR_INSET),
        ];
        for (key, value, max) in qr_bounds {
            if value > max {
                return Err(ConfigError::Validation(format!(
                    "{key} must be at most {max} (got {value})"
                )));
            }
        }
        if self.watch.max_in_flight == Some(0) {
            return Err(ConfigError::Validation(
                "watch.max_in_flight must be at least 1 (omit it for no limit)".into(),
            ));
        }
        Ok(())
    }

    /// Override values from environment variables. `lookup` is `std::env::var`
    /// in production; empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("WATCH_FOLDER") {
            self.watch.folder = Some(PathBuf::from(v));
        }
        if let Some(v) = get("R2_BUCKET_NAME") {
            self.storage.bucket = v;
        }
        if let Some(v) = get("R2_ACCOUNT_ID") {
            self.storage.account_id = v;
        }
        if let Some(v) = get("R2_ACCESS_KEY_ID") {
            self.storage.access_key_id = v;
        }
        if let Some(v) = get("R2_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = v;
        }
        if let Some(v) = get("R2_PUBLIC_URL") {
            self.storage.public_url = v;
        }
        if let Some(v) = get("R2_ENDPOINT") {
            self.storage.endpoint = Some(v);
        }
    }

    /// Canonicalize values that have more than one spelling.
    fn normalize(&mut self) {
        let trimmed = self.storage.public_url.trim().trim_end_matches('/');
        self.storage.public_url = trimmed.to_string();
        if let Some(endpoint) = &self.storage.endpoint {
            self.storage.endpoint = Some(endpoint.trim().trim_end_matches('/').to_string());
        }
    }
}

/// Folder watching settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Folder to watch for new images. Not recursive.
    pub folder: Option<PathBuf>,
    /// JSON ledger of uploaded identifiers.
    pub ledger: PathBuf,
    /// Delay before reading a newly created file, so the writer can finish.
    pub settle_ms: u64,
    /// Maximum number of files processed at once. Absent = no limit.
    pub max_in_flight: Option<usize>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            folder: None,
            ledger: PathBuf::from("uploaded.json"),
            settle_ms: 500,
            max_in_flight: None,
        }
    }
}

impl WatchConfig {
    /// The watch folder, or [`ConfigError::Missing`].
    pub fn require_folder(&self) -> Result<&Path, ConfigError> {
        self.folder.as_deref().ok_or(ConfigError::Missing {
            key: "watch.folder",
            env: "WATCH_FOLDER",
        })
    }
}

/// Resize and JPEG encoding settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Fit-inside bounding box width.
    pub max_width: u32,
    /// Fit-inside bounding box height.
    pub max_height: u32,
    /// JPEG quality (1 = worst, 100 = best).
    pub quality: u32,
    /// How storage keys are named.
    pub naming: NamingPolicy,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            quality: 80,
            naming: NamingPolicy::Uuid,
        }
    }
}

/// QR-annotated variant settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QrConfig {
    /// Produce and upload the `_qr` variant.
    pub enabled: bool,
    /// QR image side in pixels, quiet zone included.
    pub size: u32,
    /// Quiet zone in modules.
    pub margin: u32,
    /// White border around the QR image in pixels.
    pub border: u32,
    /// Distance from the right and bottom edges in pixels.
    pub inset: u32,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 180,
            margin: 4,
            border: 32,
            inset: 32,
        }
    }
}

/// S3-compatible storage settings.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub bucket: String,
    /// Cloudflare account id; used to derive the R2 endpoint.
    pub account_id: String,
    /// Explicit endpoint, e.g. `http://localhost:9000` for MinIO. Wins over `account_id`.
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Public base URL objects are served from, without trailing slash.
    pub public_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            account_id: String::new(),
            endpoint: None,
            region: "auto".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            public_url: String::new(),
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("bucket", &self.bucket)
            .field("account_id", &self.account_id)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("public_url", &self.public_url)
            .finish()
    }
}

impl StorageConfig {
    /// Check required settings. A dry run needs only the public URL.
    pub fn validate(&self, dry_run: bool) -> Result<(), ConfigError> {
        require(&self.public_url, "storage.public_url", "R2_PUBLIC_URL")?;
        if dry_run {
            return Ok(());
        }
        require(&self.bucket, "storage.bucket", "R2_BUCKET_NAME")?;
        if self.endpoint.is_none() {
            require(&self.account_id, "storage.account_id", "R2_ACCOUNT_ID")?;
        }
        require(&self.access_key_id, "storage.access_key_id", "R2_ACCESS_KEY_ID")?;
        require(
            &self.secret_access_key,
            "storage.secret_access_key",
            "R2_SECRET_ACCESS_KEY",
        )?;
        Ok(())
    }

    /// The S3 API endpoint: explicit `endpoint`, or the R2 endpoint of `account_id`.
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}.r2.cloudflarestorage.com", self.account_id),
        }
    }
}

fn require(value: &str, key: &'static str, env: &'static str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Missing { key, env })
    } else {
        Ok(())
    }
}

/// Announce settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnounceConfig {
    /// Copy the announced URL to the system clipboard. When false it is printed instead.
    pub clipboard: bool,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self { clipboard: true }
    }
}

// =============================================================================
// Config loading
// =============================================================================

/// Parse a config file. Missing keys take their defaults.
pub fn parse_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Resolve the full configuration from file and environment.
///
/// With `explicit = None`, [`DEFAULT_CONFIG_FILE`] is read if it exists;
/// an explicit path that does not exist is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    resolve_config(explicit, |name| std::env::var(name).ok())
}

/// [`load_config`] with an injectable environment lookup.
pub fn resolve_config(
    explicit: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let mut config = match explicit {
        Some(path) => parse_config_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                parse_config_file(default_path)?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env(lookup);
    config.normalize();
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `pixdrop.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pixdrop configuration
# =====================
# All settings are optional. Values shown below are the defaults.
# Environment variables (and a .env file) override this file; see the
# variable name next to each storage key.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Folder watching
# ---------------------------------------------------------------------------
[watch]
# Folder to watch for new .jpg/.jpeg/.png files (not recursive).  [WATCH_FOLDER]
# folder = "/Users/me/Pictures/Screenshots"

# JSON ledger of everything already uploaded.
ledger = "uploaded.json"

# Wait this long after a file appears before reading it.
settle_ms = 500

# Limit on files processed at the same time. Omit for no limit.
# max_in_flight = 4

# ---------------------------------------------------------------------------
# Uploaded image
# ---------------------------------------------------------------------------
[images]
# Images are shrunk to fit inside this box, never enlarged.
max_width = 1920
max_height = 1080

# JPEG quality (1-100).
quality = 80

# Storage key naming: "uuid" (random, hides the original name)
# or "source" (original file stem).
naming = "uuid"

# ---------------------------------------------------------------------------
# QR variant: a copy with a QR code linking to the uploaded image
# ---------------------------------------------------------------------------
[qr]
enabled = true

# QR image size in pixels, quiet zone included (at most 4096).
size = 180

# Quiet zone in modules (at most 64).
margin = 4

# White border around the QR image, in pixels (at most 1024).
border = 32

# Distance from the bottom-right corner, in pixels (at most 65536).
inset = 32

# ---------------------------------------------------------------------------
# S3-compatible storage (Cloudflare R2 by default)
# ---------------------------------------------------------------------------
[storage]
# bucket = ""              # [R2_BUCKET_NAME]
# account_id = ""          # [R2_ACCOUNT_ID]
# endpoint = ""            # [R2_ENDPOINT] overrides the R2 endpoint
region = "auto"
# access_key_id = ""       # [R2_ACCESS_KEY_ID]
# secret_access_key = ""   # [R2_SECRET_ACCESS_KEY]
# public_url = ""          # [R2_PUBLIC_URL] e.g. "https://img.example.com"

# ---------------------------------------------------------------------------
# Announce
# ---------------------------------------------------------------------------
[announce]
# Copy the final URL to the clipboard; when false it is printed instead.
clipboard = true
"##
}
