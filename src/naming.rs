//! Centralized naming rules for intake sources and uploaded artifacts.
//!
//! Every decision about *what a file is called* lives here so the watcher,
//! the generator and the publisher agree on it:
//!
//! - which source files are accepted (`.jpg`, `.jpeg`, `.png`, any case),
//! - the storage key of each artifact derived from a source,
//! - the public URL of a key.
//!
//! ## Keys
//!
//! With the default [`NamingPolicy::Uuid`] every source gets a fresh UUID and
//! its artifacts are keyed `{uuid}.jpg` and `{uuid}_qr.jpg`. The original
//! filename never reaches the public bucket and two sources with the same name
//! can't collide.
//!
//! [`NamingPolicy::Source`] keeps the source stem instead (`IMG_0042.PNG` →
//! `IMG_0042.jpg`). The extension is always `.jpg` because output is always JPEG.
//!
//! ## Ledger ids
//!
//! The ledger holds three kinds of id, kept apart so none can be mistaken for
//! another:
//!
//! | Id | Recorded when |
//! |---|---|
//! | `{key}` | that artifact's upload succeeded |
//! | `source/{basename}` | every artifact of the source is up |
//! | `claim/{key}/{basename}` | a [`NamingPolicy::Source`] key was taken by that source |
//!
//! Artifact keys never contain `/` (stems come from file names, UUIDs have
//! none), so a basename like `a.jpg` and the key `a.jpg` stay distinct ids.

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Source extensions the intake accepts, compared case-insensitively.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Suffix appended to the base name of the QR-annotated variant.
const QR_SUFFIX: &str = "_qr";

/// How artifact keys are derived from a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingPolicy {
    /// A fresh UUID v4 per source.
    #[default]
    Uuid,
    /// The source file stem.
    Source,
}

/// Whether `path` has one of the [`ACCEPTED_EXTENSIONS`].
pub fn is_accepted_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
}

/// Final path component as an owned string, e.g. `photo.PNG`.
pub fn source_basename(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Ledger id marking a source as fully uploaded.
pub fn completion_id(basename: &str) -> String {
    format!("source/{basename}")
}

/// Ledger id recording that `basename` owns `key`.
pub fn claim_id(key: &str, basename: &str) -> String {
    format!("{}{}", claim_prefix(key), basename)
}

/// Prefix shared by every claim on `key`.
pub fn claim_prefix(key: &str) -> String {
    format!("claim/{key}/")
}

/// Base name shared by all artifacts of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    base: String,
}

impl ArtifactNames {
    /// Names for a source under `policy`. `id` is only used by [`NamingPolicy::Uuid`].
    pub fn for_source(policy: NamingPolicy, source: &Path, id: Uuid) -> Self {
        let base = match policy {
            NamingPolicy::Uuid => id.to_string(),
            NamingPolicy::Source => source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| id.to_string()),
        };
        Self { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Key of the resized original: `{base}.jpg`.
    pub fn original_key(&self) -> String {
        format!("{}.jpg", self.base)
    }

    /// Key of the QR-annotated variant: `{base}_qr.jpg`.
    pub fn qr_key(&self) -> String {
        format!("{}{}.jpg", self.base, QR_SUFFIX)
    }
}

/// Public URL of `key` under `base_url`.
///
/// Deterministic from the key alone, so it can be computed before upload.
/// `base_url` is expected without a trailing slash (config trims it).
pub fn public_url(base_url: &str, key: &str) -> String {
    format!("{}/{}", base_url, key)
}
