use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub library: LibraryConfig,
    pub transform: TransformConfig,
    pub draw: DrawConfig,
    pub refill: RefillConfig,
    pub cors: CorsConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Folder that image names are derived relative to.
    pub root_folder: PathBuf,
    /// Folder that gets scanned. Normally the root itself or below it.
    pub target_folder: PathBuf,
    /// Case-insensitive file name fragment marking thumbnails to skip.
    pub thumbnail_marker: String,
}

#[derive(Debug, Clone, Copy)]
pub struct TransformConfig {
    pub width: u32,
    /// `0` selects proportional scaling to `width`.
    pub height: u32,
    pub workers: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct DrawConfig {
    pub retry_budget: usize,
    pub response_timeout: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct RefillConfig {
    pub watermark: usize,
    pub pool_ttl: Duration,
    pub expiry_check_interval: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty()
            || self
                .allowed_origins
                .iter()
                .any(|origin| origin.trim() == "*")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub env_file_loaded: bool,
}
