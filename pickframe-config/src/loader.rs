use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::*;
use crate::models::{
    Config, ConfigMetadata, CorsConfig, DrawConfig, LibraryConfig, RefillConfig, ServerConfig,
    TransformConfig,
};
use crate::sources::EnvConfig;
use crate::util::parse_or_default;
use crate::validation::ConfigWarnings;

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Read `.env` if present, then the process environment.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path)
                .map(|_| true)
                .or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        let mut load = Self::compose(EnvConfig::gather());
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Build a [`Config`] from already gathered values.
    pub fn compose(env: EnvConfig) -> ConfigLoad {
        let mut warnings = ConfigWarnings::default();

        let server = ServerConfig {
            host: env
                .server_host
                .filter(|host| !host.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            port: parse_or_default(
                "SERVER_PORT",
                env.server_port.as_deref().or(env.port.as_deref()),
                DEFAULT_SERVER_PORT,
                &mut warnings,
            ),
        };

        let root_folder = env
            .root_folder
            .filter(|root| !root.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_FOLDER));
        let target_folder = env
            .target_folder
            .filter(|target| !target.as_os_str().is_empty())
            .unwrap_or_else(|| root_folder.clone());
        if !target_folder.starts_with(&root_folder) {
            warnings.push_with_hint(
                format!(
                    "TARGET_FOLDER {} is not inside ROOT_FOLDER {}",
                    target_folder.display(),
                    root_folder.display()
                ),
                "X-Image-Name will be empty for every response",
            );
        }
        let library = LibraryConfig {
            root_folder,
            target_folder,
            thumbnail_marker: env
                .thumbnail_marker
                .unwrap_or_else(|| DEFAULT_THUMBNAIL_MARKER.to_string()),
        };

        let width = parse_or_default(
            "RESIZE_WIDTH",
            env.resize_width.as_deref(),
            DEFAULT_RESIZE_WIDTH,
            &mut warnings,
        );
        let default_workers = num_cpus::get();
        let transform = TransformConfig {
            width: non_zero("RESIZE_WIDTH", width, DEFAULT_RESIZE_WIDTH, &mut warnings),
            height: parse_or_default(
                "RESIZE_HEIGHT",
                env.resize_height.as_deref(),
                DEFAULT_RESIZE_HEIGHT,
                &mut warnings,
            ),
            workers: non_zero(
                "TRANSFORM_WORKERS",
                parse_or_default(
                    "TRANSFORM_WORKERS",
                    env.transform_workers.as_deref(),
                    default_workers,
                    &mut warnings,
                ),
                default_workers,
                &mut warnings,
            ),
        };

        let retries = parse_or_default(
            "ALLOWED_RETRIES",
            env.allowed_retries.as_deref(),
            DEFAULT_ALLOWED_RETRIES,
            &mut warnings,
        );
        let timeout_ms = parse_or_default(
            "RESPONSE_TIMEOUT_MS",
            env.response_timeout_ms.as_deref(),
            DEFAULT_RESPONSE_TIMEOUT_MS,
            &mut warnings,
        );
        let draw = DrawConfig {
            retry_budget: non_zero("ALLOWED_RETRIES", retries, 1, &mut warnings),
            response_timeout: Duration::from_millis(non_zero(
                "RESPONSE_TIMEOUT_MS",
                timeout_ms,
                DEFAULT_RESPONSE_TIMEOUT_MS,
                &mut warnings,
            )),
        };

        let expiry_check = parse_or_default(
            "EXPIRY_CHECK_SECS",
            env.expiry_check_secs.as_deref(),
            DEFAULT_EXPIRY_CHECK_SECS,
            &mut warnings,
        );
        let refill = RefillConfig {
            watermark: parse_or_default(
                "REFILL_WATERMARK",
                env.refill_watermark.as_deref(),
                DEFAULT_REFILL_WATERMARK,
                &mut warnings,
            ),
            pool_ttl: Duration::from_secs(parse_or_default(
                "CACHE_TTL_SECS",
                env.cache_ttl_secs.as_deref(),
                DEFAULT_CACHE_TTL_SECS,
                &mut warnings,
            )),
            expiry_check_interval: Duration::from_secs(non_zero(
                "EXPIRY_CHECK_SECS",
                expiry_check,
                DEFAULT_EXPIRY_CHECK_SECS,
                &mut warnings,
            )),
        };

        let cors = CorsConfig {
            allowed_origins: env.cors_allowed_origins.unwrap_or_default(),
        };

        ConfigLoad {
            config: Config {
                server,
                library,
                transform,
                draw,
                refill,
                cors,
                metadata: ConfigMetadata::default(),
            },
            warnings,
        }
    }
}

fn non_zero<T>(name: &str, value: T, fallback: T, warnings: &mut ConfigWarnings) -> T
where
    T: Default + PartialEq + Copy + std::fmt::Display,
{
    if value == T::default() {
        warnings.push(format!("{name} must be greater than zero; using {fallback}"));
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> EnvConfig {
        EnvConfig::default()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let ConfigLoad { config, warnings } = ConfigLoader::compose(env());

        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.library.root_folder, PathBuf::from("/srv/photos"));
        assert_eq!(config.library.target_folder, config.library.root_folder);
        assert_eq!(config.library.thumbnail_marker, "thumb");
        assert_eq!((config.transform.width, config.transform.height), (500, 700));
        assert!(config.transform.workers >= 1);
        assert_eq!(config.draw.retry_budget, 5);
        assert_eq!(config.draw.response_timeout, Duration::from_millis(5000));
        assert_eq!(config.refill.watermark, 155);
        assert_eq!(config.refill.pool_ttl, Duration::from_secs(120));
        assert_eq!(config.refill.expiry_check_interval, Duration::from_secs(15));
        assert!(config.cors.allows_any_origin());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let ConfigLoad { config, warnings } = ConfigLoader::compose(EnvConfig {
            port: Some("8080".into()),
            root_folder: Some("/data/pictures".into()),
            target_folder: Some("/data/pictures/2019".into()),
            resize_height: Some("0".into()),
            allowed_retries: Some("2".into()),
            response_timeout_ms: Some("750".into()),
            refill_watermark: Some("10".into()),
            cors_allowed_origins: Some(vec!["https://frame.local".into()]),
            ..env()
        });

        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.library.target_folder, PathBuf::from("/data/pictures/2019"));
        assert_eq!(config.transform.height, 0);
        assert_eq!(config.draw.retry_budget, 2);
        assert_eq!(config.draw.response_timeout, Duration::from_millis(750));
        assert_eq!(config.refill.watermark, 10);
        assert!(!config.cors.allows_any_origin());
    }

    #[test]
    fn server_port_wins_over_port() {
        let ConfigLoad { config, .. } = ConfigLoader::compose(EnvConfig {
            port: Some("8080".into()),
            server_port: Some("9090".into()),
            ..env()
        });

        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn unparsable_numbers_fall_back_with_warning() {
        let ConfigLoad { config, warnings } = ConfigLoader::compose(EnvConfig {
            resize_width: Some("wide".into()),
            refill_watermark: Some("-3".into()),
            ..env()
        });

        assert_eq!(config.transform.width, 500);
        assert_eq!(config.refill.watermark, 155);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.message.contains("RESIZE_WIDTH")));
    }

    #[test]
    fn zero_retries_is_raised_to_one() {
        let ConfigLoad { config, warnings } = ConfigLoader::compose(EnvConfig {
            allowed_retries: Some("0".into()),
            expiry_check_secs: Some("0".into()),
            ..env()
        });

        assert_eq!(config.draw.retry_budget, 1);
        assert_eq!(config.refill.expiry_check_interval, Duration::from_secs(15));
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn target_outside_root_is_flagged() {
        let ConfigLoad { warnings, .. } = ConfigLoader::compose(EnvConfig {
            root_folder: Some("/srv/photos".into()),
            target_folder: Some("/mnt/usb".into()),
            ..env()
        });

        assert_eq!(warnings.len(), 1);
        let warning = warnings.iter().next().expect("one warning");
        assert!(warning.message.contains("TARGET_FOLDER"));
        assert!(warning.hint.is_some());
    }

    #[test]
    fn wildcard_origin_means_any() {
        let cors = CorsConfig {
            allowed_origins: vec!["*".into()],
        };
        assert!(cors.allows_any_origin());
    }
}
