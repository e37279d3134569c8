use std::fmt;
use std::sync::Arc;

use pickframe_core::{DrawService, PoolStats, RefillCoordinator, SamplingCache};

use crate::infra::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<SamplingCache>,
    pub refill: Arc<RefillCoordinator>,
    pub draw: Arc<DrawService>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.cache.stats()
    }
}
