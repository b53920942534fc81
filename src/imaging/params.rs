//! Parameter types for image operations.
//!
//! These structs describe *what* to produce, not *how*. They are the interface
//! between the high-level [`operations`](super::operations) module (which
//! decides dimensions and overlay placement) and the [`backend`](super::backend)
//! (which does the pixel work). Tests swap in a mock backend and assert on the
//! plans it receives.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1-100, default 80). Clamped on construction.
//! - [`QrStyle`]: How a QR code is drawn: image size, quiet zone, white border.
//! - [`QrOverlay`]: A QR payload plus its style and distance from the corner.
//! - [`RenderPlan`]: Full specification for one source: output size, quality, optional overlay.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Appearance of a rendered QR code.
///
/// - `size`: side of the QR image in pixels, quiet zone included
/// - `margin`: quiet zone width in modules
/// - `border`: solid white padding added around the QR image, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrStyle {
    pub size: u32,
    pub margin: u32,
    pub border: u32,
}

impl Default for QrStyle {
    fn default() -> Self {
        Self {
            size: 180,
            margin: 4,
            border: 32,
        }
    }
}

/// A QR code to stamp onto the bottom-right corner of the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrOverlay {
    /// Text encoded in the QR code.
    pub payload: String,
    pub style: QrStyle,
    /// Distance in pixels from the right and bottom edges.
    pub inset: u32,
}

/// Everything needed to render the outputs for one source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub source: PathBuf,
    /// Output dimensions after fit-inside resize.
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
    /// When set, a second image with the QR code composited is produced.
    pub overlay: Option<QrOverlay>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_80() {
        assert_eq!(Quality::default().value(), 80);
    }

    #[test]
    fn qr_style_defaults() {
        let s = QrStyle::default();
        assert_eq!((s.size, s.margin, s.border), (180, 4, 32));
    }
}
