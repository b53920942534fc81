//! Artifact generation: one source image in, the encoded uploads out.
//!
//! For each source the generator picks a base name (see [`naming`](crate::naming)),
//! derives the public URL of the resized original *before* anything is uploaded,
//! and asks the imaging backend for:
//!
//! | # | Key | Content |
//! |---|-----|---------|
//! | A | `{base}.jpg` | Source fit inside the bounding box, JPEG |
//! | B | `{base}_qr.jpg` | A with a QR code of A's public URL bottom-right |
//!
//! B is the artifact announced to the user. With `qr.enabled = false` only A is
//! produced and A is announced instead.
//!
//! Generation is synchronous CPU work. The coordinator runs it on the blocking
//! thread pool.

use crate::config::Config;
use crate::imaging::{
    BackendError, ImageBackend, OverlayConfig, QrStyle, Quality, RenderConfig, render_source,
};
use crate::naming::{ArtifactNames, NamingPolicy, public_url};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Content type of every artifact.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Failed to process {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("Backend produced no QR variant for {0}")]
    MissingAnnotated(PathBuf),
}

/// An encoded image ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Storage key, also the last segment of the public URL.
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    /// Whether the public URL of this artifact goes to the side channel.
    pub announce: bool,
}

impl Artifact {
    fn jpeg(key: String, bytes: Vec<u8>, announce: bool) -> Self {
        Self {
            key,
            bytes,
            content_type: JPEG_CONTENT_TYPE,
            announce,
        }
    }
}

/// Build the render settings from `[images]` and `[qr]`.
pub fn render_config(config: &Config) -> RenderConfig {
    let overlay = config.qr.enabled.then(|| OverlayConfig {
        style: QrStyle {
            size: config.qr.size,
            margin: config.qr.margin,
            border: config.qr.border,
        },
        inset: config.qr.inset,
    });
    RenderConfig {
        bounds: (config.images.max_width, config.images.max_height),
        quality: Quality::new(config.images.quality),
        overlay,
    }
}

/// Turns source files into [`Artifact`]s.
pub struct ArtifactGenerator {
    backend: Arc<dyn ImageBackend>,
    render: RenderConfig,
    naming: NamingPolicy,
    public_base: String,
}

impl ArtifactGenerator {
    pub fn new(
        backend: Arc<dyn ImageBackend>,
        render: RenderConfig,
        naming: NamingPolicy,
        public_base: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            render,
            naming,
            public_base: public_base.into(),
        }
    }

    pub fn from_config(backend: Arc<dyn ImageBackend>, config: &Config) -> Self {
        Self::new(
            backend,
            render_config(config),
            config.images.naming,
            config.storage.public_url.clone(),
        )
    }

    pub fn naming(&self) -> NamingPolicy {
        self.naming
    }

    /// Generate the artifacts of `source` under a fresh UUID.
    pub fn generate(&self, source: &Path) -> Result<Vec<Artifact>, ProcessingError> {
        self.generate_with_id(source, Uuid::new_v4())
    }

    /// Generate with a caller-chosen id. Returns `[A]` or `[A, B]` in upload order.
    pub fn generate_with_id(
        &self,
        source: &Path,
        id: Uuid,
    ) -> Result<Vec<Artifact>, ProcessingError> {
        let names = ArtifactNames::for_source(self.naming, source, id);
        let original_key = names.original_key();
        let with_qr = self.render.overlay.is_some();
        let original_url = public_url(&self.public_base, &original_key);

        let rendered = render_source(
            self.backend.as_ref(),
            source,
            &self.render,
            with_qr.then_some(original_url.as_str()),
        )
        .map_err(|source_err| ProcessingError::Image {
            path: source.to_path_buf(),
            source: source_err,
        })?;

        let mut artifacts = vec![Artifact::jpeg(original_key, rendered.original, !with_qr)];
        if with_qr {
            let annotated = rendered
                .annotated
                .ok_or_else(|| ProcessingError::MissingAnnotated(source.to_path_buf()))?;
            artifacts.push(Artifact::jpeg(names.qr_key(), annotated, true));
        }

        debug!(
            source = %source.display(),
            base = names.base(),
            count = artifacts.len(),
            "generated artifacts"
        );
        Ok(artifacts)
    }
}
