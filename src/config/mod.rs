// Configuration module entry point
// Layered settings: config file, then FILE_RESPONSE_* environment, then defaults

mod types;

pub use types::{Config, LoggingConfig, ResponseConfig};

/// Config file looked up when no path is given (extension optional)
pub const DEFAULT_CONFIG_PATH: &str = "file-response";

impl Config {
    /// Load configuration from specified file path (extension optional)
    ///
    /// A missing file is not an error. Environment variables use the
    /// `FILE_RESPONSE_` prefix and `__` between sections, e.g.
    /// `FILE_RESPONSE_RESPONSE__MAX_AGE=3600`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("FILE_RESPONSE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("response.max_age", 0)?
            .set_default("response.attach", true)?
            .set_default("response.chunk_size", 8192)?
            .set_default("response.content_tag", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "common")?
            .build()?;

        settings.try_deserialize()
    }

    /// Load from [`DEFAULT_CONFIG_PATH`]
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }
}
