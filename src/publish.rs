//! Publishing artifacts: upload to object storage, then announce the URL.
//!
//! The two side effects sit behind traits so the coordinator can run against
//! real storage, an in-memory dry run, or test doubles:
//!
//! | Trait | Production | Dry run |
//! |---|---|---|
//! | [`ObjectStore`] | [`S3Store`](crate::s3::S3Store) | [`MemoryStore`] |
//! | [`Announcer`] | [`ClipboardAnnouncer`] | [`LogAnnouncer`] |
//!
//! Uploads are a single `PUT` of the whole buffer. Nothing is retried.

use crate::artifact::Artifact;
use crate::naming::public_url;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Storage rejected {key}: HTTP {status}: {body}")]
    Status {
        key: String,
        status: u16,
        body: String,
    },
    #[error("Transport error uploading {key}: {source}")]
    Transport {
        key: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Storage error for {key}: {message}")]
    Storage { key: String, message: String },
    #[error("Clipboard error: {0}")]
    Clipboard(String),
    #[error("Announce task failed: {0}")]
    AnnounceTask(#[from] tokio::task::JoinError),
}

/// Where artifacts are stored.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`, replacing any existing object.
    async fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), UploadError>;
}

/// Side channel that hands the final URL to a human.
///
/// Implementations may block; [`Publisher`] calls them on the blocking pool.
pub trait Announcer: Send + Sync {
    fn announce(&self, text: &str) -> Result<(), UploadError>;
}

/// A successfully published artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub key: String,
    pub url: String,
}

/// Uploads artifacts and announces their URLs.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    announcer: Arc<dyn Announcer>,
    public_base: String,
}

impl Publisher {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        announcer: Arc<dyn Announcer>,
        public_base: impl Into<String>,
    ) -> Self {
        Self {
            store,
            announcer,
            public_base: public_base.into(),
        }
    }

    /// Upload `artifact`; when `announce` is set, announce its URL afterwards.
    ///
    /// A failed announce fails the publish even though the object is stored.
    pub async fn publish(
        &self,
        artifact: &Artifact,
        announce: bool,
    ) -> Result<UploadResult, UploadError> {
        self.store
            .put(&artifact.key, &artifact.bytes, artifact.content_type)
            .await?;

        let url = public_url(&self.public_base, &artifact.key);
        info!(key = %artifact.key, url = %url, bytes = artifact.bytes.len(), "uploaded");

        if announce {
            let announcer = Arc::clone(&self.announcer);
            let text = url.clone();
            tokio::task::spawn_blocking(move || announcer.announce(&text)).await??;
        }
        Ok(UploadResult {
            key: artifact.key.clone(),
            url,
        })
    }
}

// =============================================================================
// Dry-run store
// =============================================================================

/// An object held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Keeps uploads in memory, in put order. Used by `--dry-run`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<Vec<StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in the order they were put (a re-put key appears twice).
    pub fn keys(&self) -> Vec<String> {
        self.lock().iter().map(|o| o.key.clone()).collect()
    }

    /// Latest object stored under `key`.
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.lock().iter().rev().find(|o| o.key == key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredObject>> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), UploadError> {
        info!(key, bytes = body.len(), "dry run: kept in memory");
        self.lock().push(StoredObject {
            key: key.to_string(),
            body: body.to_vec(),
            content_type: content_type.to_string(),
        });
        Ok(())
    }
}

// =============================================================================
// Announcers
// =============================================================================

/// Prints the URL to stdout.
#[derive(Debug, Default)]
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn announce(&self, text: &str) -> Result<(), UploadError> {
        println!("{text}");
        Ok(())
    }
}

/// Copies the URL to the system clipboard.
///
/// The clipboard handle is opened on first use and kept open: on X11 the
/// contents are only served while the owning handle is alive.
#[derive(Default)]
pub struct ClipboardAnnouncer {
    clipboard: Mutex<Option<arboard::Clipboard>>,
}

impl ClipboardAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Announcer for ClipboardAnnouncer {
    fn announce(&self, text: &str) -> Result<(), UploadError> {
        let mut guard = self
            .clipboard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let clipboard = match guard.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new().map_err(|e| UploadError::Clipboard(e.to_string()))?,
        };
        guard
            .insert(clipboard)
            .set_text(text)
            .map_err(|e| UploadError::Clipboard(e.to_string()))?;
        info!(url = text, "copied to clipboard");
        Ok(())
    }
}
