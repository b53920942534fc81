//! Image processing in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize → JPEG** | Lanczos3 + `JpegEncoder` |
//! | **QR overlay** | `qrcode` matrix, white border, bottom-right composite |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and placement math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
mod qr;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, RenderedImages};
pub use calculations::{calculate_fit_dimensions, calculate_overlay_offset};
pub use operations::{OverlayConfig, RenderConfig, get_dimensions, plan_render, render_source};
pub use params::{QrOverlay, QrStyle, Quality, RenderPlan};
pub use rust_backend::RustBackend;
