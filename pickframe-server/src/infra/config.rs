pub use pickframe_config::{
    Config, ConfigLoad, ConfigLoadError, ConfigLoader, ConfigWarning, ConfigWarnings, CorsConfig,
};
