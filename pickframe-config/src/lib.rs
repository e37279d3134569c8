//! Configuration for pickframe.
//!
//! Settings come from the process environment, optionally seeded from a
//! `.env` file. Loading never fails on a bad value: it falls back to the
//! default and records a [`ConfigWarning`] for the server to log.

#![allow(missing_docs)]

pub mod constants;
pub mod loader;
pub mod models;
pub mod sources;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader};
pub use models::{
    Config, ConfigMetadata, CorsConfig, DrawConfig, LibraryConfig, RefillConfig, ServerConfig,
    TransformConfig,
};
pub use sources::EnvConfig;
pub use validation::{ConfigWarning, ConfigWarnings};
