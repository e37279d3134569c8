use std::path::PathBuf;

use crate::util::parse_csv_var;

/// Environment-derived configuration values, unparsed where parsing can
/// fail so the loader can report bad input.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub server_host: Option<String>,
    pub server_port: Option<String>,
    pub port: Option<String>,
    pub root_folder: Option<PathBuf>,
    pub target_folder: Option<PathBuf>,
    pub thumbnail_marker: Option<String>,
    pub resize_width: Option<String>,
    pub resize_height: Option<String>,
    pub transform_workers: Option<String>,
    pub allowed_retries: Option<String>,
    pub response_timeout_ms: Option<String>,
    pub refill_watermark: Option<String>,
    pub cache_ttl_secs: Option<String>,
    pub expiry_check_secs: Option<String>,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            server_host: std::env::var("SERVER_HOST").ok(),
            server_port: std::env::var("SERVER_PORT").ok(),
            port: std::env::var("PORT").ok(),
            root_folder: std::env::var("ROOT_FOLDER").ok().map(PathBuf::from),
            target_folder: std::env::var("TARGET_FOLDER").ok().map(PathBuf::from),
            thumbnail_marker: std::env::var("THUMBNAIL_MARKER").ok(),
            resize_width: std::env::var("RESIZE_WIDTH").ok(),
            resize_height: std::env::var("RESIZE_HEIGHT").ok(),
            transform_workers: std::env::var("TRANSFORM_WORKERS").ok(),
            allowed_retries: std::env::var("ALLOWED_RETRIES").ok(),
            response_timeout_ms: std::env::var("RESPONSE_TIMEOUT_MS").ok(),
            refill_watermark: std::env::var("REFILL_WATERMARK").ok(),
            cache_ttl_secs: std::env::var("CACHE_TTL_SECS").ok(),
            expiry_check_secs: std::env::var("EXPIRY_CHECK_SECS").ok(),
            cors_allowed_origins: parse_csv_var("CORS_ALLOWED_ORIGINS"),
        }
    }
}
