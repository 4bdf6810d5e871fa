// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub response: ResponseConfig,
    pub logging: LoggingConfig,
}

/// Response serving configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ResponseConfig {
    /// Freshness lifetime in seconds, 0 to always revalidate
    pub max_age: i64,
    /// Offer full responses as downloads (`Content-Disposition: attachment`)
    pub attach: bool,
    /// Read buffer size for file resources
    pub chunk_size: usize,
    /// Derive file entity tags from content instead of size and mtime
    pub content_tag: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// error, warn, info or debug
    pub level: String,
    pub access_log: bool,
    /// Access log format (common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stderr if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "common".to_string()
}
