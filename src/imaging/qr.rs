//! QR code rasterization.
//!
//! The code is always encoded at error-correction level H so it survives JPEG
//! compression and the photo underneath. Module size is not an integer number
//! of pixels: the module grid (quiet zone included) is stretched over exactly
//! `style.size` pixels, each pixel taking the color of the module it falls in.

use super::backend::BackendError;
use super::calculations::{calculate_qr_image_size, module_at};
use super::params::QrStyle;
use image::{GrayImage, Luma, imageops};
use qrcode::{Color, EcLevel, QrCode};

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

/// Render `payload` as a square grayscale QR image of side `style.size`
/// (larger only if the code has more modules than that), quiet zone included.
pub fn render_qr(payload: &str, style: &QrStyle) -> Result<GrayImage, BackendError> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::H)
        .map_err(|e| BackendError::ProcessingFailed(format!("QR encode failed: {e}")))?;

    let modules = code.width() as u32;
    let colors = code.to_colors();
    let margin = style.margin;
    let total = margin
        .checked_mul(2)
        .and_then(|m| m.checked_add(modules))
        .ok_or_else(|| BackendError::ProcessingFailed(format!("QR margin {margin} too large")))?;
    let size = calculate_qr_image_size(total, style.size);

    let is_dark = |mx: u32, my: u32| {
        let inside = (margin..margin + modules).contains(&mx)
            && (margin..margin + modules).contains(&my);
        inside && colors[((my - margin) * modules + (mx - margin)) as usize] == Color::Dark
    };

    Ok(GrayImage::from_fn(size, size, |x, y| {
        if is_dark(module_at(x, total, size), module_at(y, total, size)) {
            DARK
        } else {
            LIGHT
        }
    }))
}

/// Surround `image` with a solid white border `border` pixels wide.
pub fn pad_white(image: &GrayImage, border: u32) -> Result<GrayImage, BackendError> {
    let grow = |side: u32| {
        border
            .checked_mul(2)
            .and_then(|b| b.checked_add(side))
            .ok_or_else(|| BackendError::ProcessingFailed(format!("QR border {border} too large")))
    };
    let mut padded = GrayImage::from_pixel(grow(image.width())?, grow(image.height())?, LIGHT);
    imageops::replace(&mut padded, image, border as i64, border as i64);
    Ok(padded)
}
