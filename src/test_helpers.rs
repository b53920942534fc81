//! Shared test utilities for the pixdrop test suite.
//!
//! Synthetic image writers and a QR reader, so tests never depend on binary
//! fixtures checked into the repository.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let src = tmp.path().join("shot.png");
//! write_test_png(&src, 800, 600);
//!
//! // ... generate artifacts ...
//! assert_eq!(decode_qr_jpeg(&artifacts[1].bytes), vec![url]);
//! ```

use image::{GrayImage, ImageFormat, Rgb, RgbImage};
use std::path::Path;

// =========================================================================
// Synthetic sources
// =========================================================================

/// Diagonal gradient with enough detail to exercise resizing.
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

/// Write a gradient PNG of the given size.
pub fn write_test_png(path: &Path, width: u32, height: u32) {
    gradient(width, height)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

/// Write a gradient JPEG of the given size.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    gradient(width, height)
        .save_with_format(path, ImageFormat::Jpeg)
        .unwrap();
}

/// Write a flat mid-gray PNG. A quiet background keeps QR detection reliable.
pub fn write_flat_png(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([128, 128, 128]))
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

// =========================================================================
// QR reading
// =========================================================================

/// Decode every QR code found in a grayscale image.
pub fn decode_qr(img: &GrayImage) -> Vec<String> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        img.width() as usize,
        img.height() as usize,
        |x, y| img.get_pixel(x as u32, y as u32).0[0],
    );
    prepared
        .detect_grids()
        .into_iter()
        .filter_map(|grid| grid.decode().ok().map(|(_, content)| content))
        .collect()
}

/// Decode every QR code found in an encoded JPEG.
pub fn decode_qr_jpeg(bytes: &[u8]) -> Vec<String> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg).unwrap();
    decode_qr(&img.to_luma8())
}
