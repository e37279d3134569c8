//! Defaults applied when a variable is unset or invalid.

pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 3000;

pub const DEFAULT_ROOT_FOLDER: &str = "/srv/photos";
pub const DEFAULT_THUMBNAIL_MARKER: &str = "thumb";

pub const DEFAULT_RESIZE_WIDTH: u32 = 500;
pub const DEFAULT_RESIZE_HEIGHT: u32 = 700;

pub const DEFAULT_ALLOWED_RETRIES: usize = 5;
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 5000;

pub const DEFAULT_REFILL_WATERMARK: usize = 155;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 120;
pub const DEFAULT_EXPIRY_CHECK_SECS: u64 = 15;
