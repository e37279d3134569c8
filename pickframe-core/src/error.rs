use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure to produce a candidate inventory from the target folder.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error while scanning {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("No images found under {0}")]
    Empty(PathBuf),

    #[error("Scan task failed: {0}")]
    Join(String),
}

/// Failure of one transform attempt. Every variant is retried by drawing a
/// fresh candidate.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode failed for {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Encode failed for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Transform cancelled")]
    Cancelled,

    #[error("Transform worker failed: {0}")]
    Worker(String),
}

/// EXIF extraction failure. Always absorbed by the caller.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("EXIF error: {0}")]
    Exif(#[from] exif::Error),

    #[error("Metadata worker failed: {0}")]
    Worker(String),
}

/// Terminal outcome of a `/random` request that did not produce an image.
#[derive(Error, Debug)]
pub enum DrawError {
    #[error("no items left")]
    PoolEmpty,

    #[error("failed to get image after {attempts} attempts: {source}")]
    Exhausted {
        attempts: usize,
        #[source]
        source: TransformError,
    },

    #[error("timed out after {}ms waiting for an image", after.as_millis())]
    TimedOut { after: Duration },
}

pub type Result<T, E = DrawError> = std::result::Result<T, E>;
