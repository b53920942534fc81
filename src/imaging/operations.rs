//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend, RenderedImages};
use super::calculations::calculate_fit_dimensions;
use super::params::{QrOverlay, QrStyle, Quality, RenderPlan};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(
    backend: &(impl ImageBackend + ?Sized),
    path: &Path,
) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Where and how the QR code is stamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayConfig {
    pub style: QrStyle,
    pub inset: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            style: QrStyle::default(),
            inset: 32,
        }
    }
}

/// Configuration for rendering one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Fit-inside bounding box (width, height).
    pub bounds: (u32, u32),
    pub quality: Quality,
    /// `None` disables the QR variant.
    pub overlay: Option<OverlayConfig>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bounds: (1920, 1080),
            quality: Quality::default(),
            overlay: Some(OverlayConfig::default()),
        }
    }
}

/// Plan a render without executing it.
///
/// `qr_payload` is ignored when the config has no overlay.
pub fn plan_render(
    source: &Path,
    original_dims: (u32, u32),
    config: &RenderConfig,
    qr_payload: Option<&str>,
) -> RenderPlan {
    let (width, height) = calculate_fit_dimensions(original_dims, config.bounds);

    let overlay = match (config.overlay, qr_payload) {
        (Some(overlay), Some(payload)) => Some(QrOverlay {
            payload: payload.to_string(),
            style: overlay.style,
            inset: overlay.inset,
        }),
        _ => None,
    };

    RenderPlan {
        source: source.to_path_buf(),
        width,
        height,
        quality: config.quality,
        overlay,
    }
}

/// Identify the source, plan the render and execute it.
pub fn render_source(
    backend: &(impl ImageBackend + ?Sized),
    source: &Path,
    config: &RenderConfig,
    qr_payload: Option<&str>,
) -> Result<RenderedImages> {
    let dims = get_dimensions(backend, source)?;
    let plan = plan_render(source, dims, config, qr_payload);
    backend.render(&plan)
}
