//! Image transform pipeline: decode, orient, resize, re-encode.

mod resize;

pub use resize::ResizeTransformer;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TransformError;

/// Bytes produced for one drawn path.
#[derive(Debug, Clone)]
pub struct TransformedImage {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Target geometry for the resize stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeSpec {
    /// Scale to `width`, height follows the aspect ratio.
    Proportional { width: u32 },
    /// Fit inside `width` x `height` and letterbox onto a canvas of exactly
    /// that size.
    Contain { width: u32, height: u32 },
}

impl ResizeSpec {
    /// `height == 0` selects proportional scaling.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height == 0 {
            Self::Proportional { width }
        } else {
            Self::Contain { width, height }
        }
    }
}

impl Default for ResizeSpec {
    fn default() -> Self {
        Self::Contain {
            width: 500,
            height: 700,
        }
    }
}

/// Turns a source path into response bytes.
///
/// Implementations must auto-rotate according to embedded orientation and
/// should stop early once `cancel` fires.
#[async_trait]
pub trait ImageTransformer: Send + Sync {
    async fn transform(
        &self,
        path: &Path,
        cancel: CancellationToken,
    ) -> Result<TransformedImage, TransformError>;
}

/// Detect the MIME type of encoded image bytes.
pub fn sniff_mime(bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}
