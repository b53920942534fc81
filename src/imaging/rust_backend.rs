//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image::ImageReader`, format sniffed from content |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | QR matrix | `qrcode` (level H), rasterized in [`qr`](super::qr) |
//! | Composite | `image::imageops::overlay` (clips off-canvas pixels) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, Dimensions, ImageBackend, RenderedImages};
use super::calculations::calculate_overlay_offset;
use super::params::{QrOverlay, Quality, RenderPlan};
use super::qr::{pad_white, render_qr};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, RgbImage};
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn open(path: &Path) -> Result<ImageReader<std::io::BufReader<std::fs::File>>, BackendError> {
    Ok(ImageReader::open(path)?.with_guessed_format()?)
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    open(path)?.decode().map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
    })
}

/// Encode an RGB image as baseline JPEG.
fn encode_jpeg(img: &RgbImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.value());
    img.write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
    Ok(bytes)
}

/// Copy of `base` with the padded QR code composited bottom-right.
fn stamp_qr(base: &RgbImage, overlay: &QrOverlay) -> Result<RgbImage, BackendError> {
    let qr = pad_white(&render_qr(&overlay.payload, &overlay.style)?, overlay.style.border)?;
    let qr = DynamicImage::ImageLuma8(qr).to_rgb8();
    let (x, y) = calculate_overlay_offset(base.dimensions(), qr.dimensions(), overlay.inset);

    let mut stamped = base.clone();
    imageops::overlay(&mut stamped, &qr, x, y);
    Ok(stamped)
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = open(path)?.into_dimensions().map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn render(&self, plan: &RenderPlan) -> Result<RenderedImages, BackendError> {
        // JPEG has no alpha; transparent PNG pixels keep their stored color.
        let img = load_image(&plan.source)?.to_rgb8();

        let resized = if img.dimensions() == (plan.width, plan.height) {
            img
        } else {
            imageops::resize(&img, plan.width, plan.height, FilterType::Lanczos3)
        };

        let original = encode_jpeg(&resized, plan.quality)?;
        let annotated = match &plan.overlay {
            Some(overlay) => Some(encode_jpeg(&stamp_qr(&resized, overlay)?, plan.quality)?),
            None => None,
        };

        Ok(RenderedImages {
            original,
            annotated,
        })
    }
}
