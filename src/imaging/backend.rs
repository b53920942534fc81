//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the generator needs:
//! identify (read dimensions) and render (decode, resize, optionally stamp a QR
//! code, encode).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and built on the
//! `image` and `qrcode` crates.

use super::params::RenderPlan;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Encoded outputs of one [`RenderPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImages {
    /// The resized image as JPEG.
    pub original: Vec<u8>,
    /// The resized image with the QR overlay as JPEG, if the plan asked for one.
    pub annotated: Option<Vec<u8>>,
}

/// Trait for image processing backends.
///
/// `Send + Sync` so one backend can be shared by concurrent intake tasks.
pub trait ImageBackend: Send + Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode the plan's source once and produce every requested output.
    fn render(&self, plan: &RenderPlan) -> Result<RenderedImages, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations and returns placeholder bytes.
    #[derive(Default)]
    pub struct MockBackend {
        pub identify_results: Mutex<Vec<Dimensions>>,
        pub fail_render: bool,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Render(RenderPlan),
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                identify_results: Mutex::new(dims),
                ..Self::default()
            }
        }

        pub fn failing(dims: Vec<Dimensions>) -> Self {
            Self {
                identify_results: Mutex::new(dims),
                fail_render: true,
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn render_plans(&self) -> Vec<RenderPlan> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Render(plan) => Some(plan),
                    RecordedOp::Identify(_) => None,
                })
                .collect()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));

            self.identify_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| BackendError::ProcessingFailed("No mock dimensions".to_string()))
        }

        fn render(&self, plan: &RenderPlan) -> Result<RenderedImages, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Render(plan.clone()));

            if self.fail_render {
                return Err(BackendError::ProcessingFailed("mock render failure".into()));
            }
            Ok(RenderedImages {
                original: b"original".to_vec(),
                annotated: plan.overlay.as_ref().map(|_| b"annotated".to_vec()),
            })
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let result = backend.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_render_without_overlay_has_no_annotated_output() {
        let backend = MockBackend::new();
        let rendered = backend
            .render(&RenderPlan {
                source: "/source.png".into(),
                width: 800,
                height: 600,
                quality: crate::imaging::Quality::default(),
                overlay: None,
            })
            .unwrap();

        assert_eq!(rendered.original, b"original");
        assert!(rendered.annotated.is_none());
        assert_eq!(backend.render_plans().len(), 1);
    }
}
