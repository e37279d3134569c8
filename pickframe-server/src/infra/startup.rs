use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use pickframe_core::{
    DrawPolicy, DrawService, ExclusionRules, ExifExtractor, ImageTransformer, InventoryScanner,
    MetadataEnricher, MetadataExtractor, RefillCoordinator, ResizeSpec, ResizeTransformer,
    SamplingCache, WalkdirScanner,
};

use crate::infra::app_state::AppState;
use crate::infra::config::Config;

/// The three pluggable services behind the draw pipeline.
pub struct Collaborators {
    pub scanner: Arc<dyn InventoryScanner>,
    pub transformer: Arc<dyn ImageTransformer>,
    pub extractor: Arc<dyn MetadataExtractor>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Filesystem walk, `image` transforms and EXIF reads as configured.
    pub fn from_config(config: &Config) -> Self {
        let spec = ResizeSpec::from_dimensions(config.transform.width, config.transform.height);
        Self {
            scanner: Arc::new(WalkdirScanner::new(ExclusionRules::new(
                config.library.thumbnail_marker.clone(),
            ))),
            transformer: Arc::new(ResizeTransformer::new(spec, config.transform.workers)),
            extractor: Arc::new(ExifExtractor),
        }
    }
}

/// Wire the services together and run the initial scan.
///
/// Fails when the target folder cannot be scanned or holds no images; the
/// server must not start serving without an inventory.
pub async fn build_state(config: Arc<Config>, collaborators: Collaborators) -> Result<AppState> {
    let Collaborators {
        scanner,
        transformer,
        extractor,
    } = collaborators;

    let target = config.library.target_folder.clone();
    let cache = Arc::new(SamplingCache::new(Vec::new(), config.refill.pool_ttl));
    let refill = Arc::new(RefillCoordinator::new(
        Arc::clone(&cache),
        scanner,
        target.clone(),
        config.refill.watermark,
    ));

    let generation = refill
        .initial_fill()
        .await
        .with_context(|| format!("initial scan of {} failed", target.display()))?;
    info!(
        target = %refill.target().display(),
        watermark = refill.watermark(),
        items = cache.remaining(),
        %generation,
        "initial inventory ready"
    );

    // Scanned paths are canonical, so names must be derived against the
    // canonical root as well.
    let root = canonical_or_raw(&config.library.root_folder).await;
    let policy = DrawPolicy {
        retry_budget: config.draw.retry_budget,
        deadline: config.draw.response_timeout,
    };
    let enricher = MetadataEnricher::new(extractor, root);
    info!(root = %enricher.root().display(), "album names derived below root");
    let draw = Arc::new(DrawService::new(
        Arc::clone(&cache),
        transformer,
        enricher,
        Arc::clone(&refill),
        policy,
    ));

    Ok(AppState {
        config,
        cache,
        refill,
        draw,
    })
}

/// Start the TTL watch that refreshes a stale pool.
pub fn spawn_background_tasks(state: &AppState) -> JoinHandle<()> {
    let every = state.config.refill.expiry_check_interval;
    info!(every_secs = every.as_secs(), "starting pool expiry watch");
    state.refill.spawn_expiry_watch(every)
}

async fn canonical_or_raw(path: &Path) -> PathBuf {
    match tokio::fs::canonicalize(path).await {
        Ok(canonical) => canonical,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not canonicalize root folder");
            path.to_path_buf()
        }
    }
}
