//! Inventory scanning of the target folder.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::ScanError;

/// Extensions treated as servable images.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff",
];

/// Produces a flat list of absolute image paths below a root.
#[async_trait]
pub trait InventoryScanner: Send + Sync {
    async fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError>;
}

/// Rules deciding which directory entries are excluded from the inventory.
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    thumbnail_marker: String,
}

impl ExclusionRules {
    pub fn new(thumbnail_marker: impl Into<String>) -> Self {
        Self {
            thumbnail_marker: thumbnail_marker.into().to_lowercase(),
        }
    }

    /// True when `path` should not become a candidate: not an image by
    /// extension, or its file name carries the thumbnail marker.
    pub fn excludes(&self, path: &Path) -> bool {
        !is_image(path) || self.is_thumbnail(path)
    }

    fn is_thumbnail(&self, path: &Path) -> bool {
        if self.thumbnail_marker.is_empty() {
            return false;
        }
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.to_lowercase().contains(&self.thumbnail_marker))
    }
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self::new("thumb")
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Recursive directory walk on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct WalkdirScanner {
    rules: ExclusionRules,
}

impl WalkdirScanner {
    pub fn new(rules: ExclusionRules) -> Self {
        Self { rules }
    }

    fn scan_blocking(root: &Path, rules: &ExclusionRules) -> Result<Vec<PathBuf>, ScanError> {
        let root = root.canonicalize().map_err(|source| ScanError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root));
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(&root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                // An unreadable subfolder only loses its own files.
                Err(err) if err.depth() > 0 => {
                    warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    return Err(ScanError::Io {
                        path,
                        source: err.into(),
                    });
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            if rules.excludes(entry.path()) {
                debug!(path = %entry.path().display(), "excluded from inventory");
                continue;
            }
            found.push(entry.into_path());
        }

        Ok(found)
    }
}

#[async_trait]
impl InventoryScanner for WalkdirScanner {
    async fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        let root_owned = root.to_path_buf();
        let rules = self.rules.clone();

        let found = tokio::task::spawn_blocking(move || Self::scan_blocking(&root_owned, &rules))
            .await
            .map_err(|err| ScanError::Join(err.to_string()))??;

        info!(root = %root.display(), found = found.len(), "inventory scan finished");
        Ok(found)
    }
}
