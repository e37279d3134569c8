//! Best-effort EXIF enrichment and response header derivation.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use exif::{In, Tag, Value};
use tracing::{debug, warn};

use crate::error::MetadataError;

pub const HEADER_IMAGE_DATE: &str = "X-Image-Date";
pub const HEADER_IMAGE_NAME: &str = "X-Image-Name";

/// Capture-date tags in order of preference.
const DATE_TAGS: [Tag; 3] = [Tag::DateTimeDigitized, Tag::DateTimeOriginal, Tag::DateTime];

/// Raw values pulled out of a file's EXIF block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMetadata {
    /// Capture date exactly as stored, e.g. `2019:05:01 12:30:45`.
    pub capture_date: Option<String>,
}

/// Reads metadata for a path. Errors never reach the client.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<ImageMetadata, MetadataError>;
}

/// `kamadak-exif` reader running on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifExtractor;

impl ExifExtractor {
    fn read_blocking(path: &Path) -> Result<ImageMetadata, MetadataError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let exif = exif::Reader::new().read_from_container(&mut reader)?;

        let capture_date = DATE_TAGS.iter().find_map(|tag| {
            let field = exif.get_field(*tag, In::PRIMARY)?;
            match &field.value {
                Value::Ascii(values) if !values.is_empty() => std::str::from_utf8(&values[0])
                    .ok()
                    .map(|s| s.trim_matches(char::from(0)).trim().to_string())
                    .filter(|s| !s.is_empty()),
                _ => None,
            }
        });

        Ok(ImageMetadata { capture_date })
    }
}

#[async_trait]
impl MetadataExtractor for ExifExtractor {
    async fn extract(&self, path: &Path) -> Result<ImageMetadata, MetadataError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::read_blocking(&path))
            .await
            .map_err(|err| MetadataError::Worker(err.to_string()))?
    }
}

/// Derived, header-ready metadata for one served image. Empty strings mean
/// "unavailable".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub image_date: String,
    pub image_name: String,
}

/// Wraps an extractor and turns its output into header values, absorbing
/// every failure.
pub struct MetadataEnricher {
    extractor: Arc<dyn MetadataExtractor>,
    root: PathBuf,
}

impl fmt::Debug for MetadataEnricher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataEnricher")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl MetadataEnricher {
    pub fn new(extractor: Arc<dyn MetadataExtractor>, root: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extract within `budget`. Timeouts and extractor errors are logged
    /// and yield an empty date; the name never depends on EXIF.
    pub async fn enrich(&self, path: &Path, budget: Duration) -> Enrichment {
        let image_name = image_name(&self.root, path);

        let image_date = match tokio::time::timeout(budget, self.extractor.extract(path)).await {
            Ok(Ok(metadata)) => metadata
                .capture_date
                .as_deref()
                .map(format_capture_date)
                .unwrap_or_default(),
            Ok(Err(err)) => {
                warn!(path = %path.display(), error = %err, "metadata extraction failed");
                String::new()
            }
            Err(_) => {
                warn!(
                    path = %path.display(),
                    budget_ms = budget.as_millis() as u64,
                    "metadata extraction ran out of time"
                );
                String::new()
            }
        };

        debug!(path = %path.display(), %image_date, %image_name, "enriched image");
        Enrichment {
            image_date,
            image_name,
        }
    }
}

/// `2019:05:01 12:30:45` becomes `2019.05.01 12:30:45`. A value without a
/// time token keeps only the converted date.
pub fn format_capture_date(raw: &str) -> String {
    let raw = raw.trim();
    match raw.split_once(' ') {
        Some((date, time)) => format!("{} {}", date.replace(':', "."), time),
        None => raw.replace(':', "."),
    }
}

/// Percent-encoded name of the album folder directly below `root` that
/// holds `path`. Empty when `path` is outside `root` or sits in `root`
/// itself.
pub fn image_name(root: &Path, path: &Path) -> String {
    let Ok(relative) = path.strip_prefix(root) else {
        return String::new();
    };

    let mut segments = relative.components().filter_map(|component| match component {
        Component::Normal(segment) => Some(segment),
        _ => None,
    });
    match (segments.next(), segments.next()) {
        (Some(album), Some(_)) => album
            .to_str()
            .map(|album| urlencoding::encode(album).into_owned())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// The fixed header record of a successful response. Every field is always
/// sent, empty when unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub content_type: String,
    pub image_date: String,
    pub image_name: String,
}

impl ResponseHeaders {
    pub fn new(content_type: impl Into<String>, enrichment: Enrichment) -> Self {
        Self {
            content_type: content_type.into(),
            image_date: enrichment.image_date,
            image_name: enrichment.image_name,
        }
    }
}

impl Default for ResponseHeaders {
    fn default() -> Self {
        Self {
            content_type: "application/octet-stream".to_string(),
            image_date: String::new(),
            image_name: String::new(),
        }
    }
}
