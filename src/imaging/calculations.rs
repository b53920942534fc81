//! Pure calculation functions for image dimensions and overlay placement.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate fit-inside dimensions: scale `source` down so it fits within
/// `bounds`, preserving aspect ratio. Never enlarges.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `bounds` - Bounding box (max width, max height)
///
/// # Returns
/// * `(width, height)` - Output dimensions, each at least 1
///
/// # Examples
/// ```
/// # use pixdrop::imaging::calculate_fit_dimensions;
/// // 4000x3000 into 1920x1080 → height is the binding edge
/// assert_eq!(calculate_fit_dimensions((4000, 3000), (1920, 1080)), (1440, 1080));
///
/// // Already fits → unchanged
/// assert_eq!(calculate_fit_dimensions((800, 600), (1920, 1080)), (800, 600));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    if src_w == 0 || src_h == 0 || (src_w <= max_w && src_h <= max_h) {
        return source;
    }

    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w);
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h);
    (w, h)
}

/// Top-left position of an overlay anchored to the bottom-right corner of a
/// base image, `inset` pixels in from both edges.
///
/// Not clamped: when the overlay plus inset is larger than the base the
/// result is negative and the overlay hangs off the top/left edge.
pub fn calculate_overlay_offset(base: (u32, u32), overlay: (u32, u32), inset: u32) -> (i64, i64) {
    let x = base.0 as i64 - overlay.0 as i64 - inset as i64;
    let y = base.1 as i64 - overlay.1 as i64 - inset as i64;
    (x, y)
}

/// Side length in pixels of a rendered QR image.
///
/// `total_modules` includes the quiet zone on both sides. The image is
/// `target` pixels wide unless that is too small to give every module at
/// least one pixel.
pub fn calculate_qr_image_size(total_modules: u32, target: u32) -> u32 {
    target.max(total_modules)
}

/// Module index (quiet zone included) covering pixel `pixel` of a QR image of
/// side `image_size` with `total_modules` modules per side.
pub fn module_at(pixel: u32, total_modules: u32, image_size: u32) -> u32 {
    (pixel as u64 * total_modules as u64 / image_size as u64) as u32
}
