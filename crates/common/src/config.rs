//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Notification service configuration.
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Moderation configuration.
    #[serde(default)]
    pub moderation: ModerationConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Notification service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Whether notifications are sent at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base URL of the notification service.
    #[serde(default = "default_notifier_url")]
    pub service_url: String,
    /// Upper bound for one background delivery, in seconds.
    #[serde(default = "default_notifier_timeout")]
    pub timeout_secs: u64,
    /// Recipients of moderation-queue and new-activity notifications.
    #[serde(default = "default_admin_recipients")]
    pub admin_recipients: Vec<String>,
}

/// Moderation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationConfig {
    /// Whether the global bad-word list is applied.
    #[serde(default = "default_true")]
    pub bad_words_enabled: bool,
    /// Global bad-word list.
    #[serde(default = "default_bad_words")]
    pub bad_words: Vec<String>,
    /// Comment creations allowed per caller per minute.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default level filter, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `json` or `text`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_url: default_notifier_url(),
            timeout_secs: default_notifier_timeout(),
            admin_recipients: default_admin_recipients(),
        }
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            bad_words_enabled: true,
            bad_words: default_bad_words(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Whether log lines are emitted as JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    5010
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_true() -> bool {
    true
}

fn default_notifier_url() -> String {
    "http://localhost:5004".to_string()
}

const fn default_notifier_timeout() -> u64 {
    10
}

fn default_admin_recipients() -> Vec<String> {
    vec!["admin".to_string()]
}

fn default_bad_words() -> Vec<String> {
    ["spam", "scam", "xxx", "porn"]
        .into_iter()
        .map(String::from)
        .collect()
}

const fn default_rate_limit() -> u32 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `COMMENT_ENV`)
    /// 4. Environment variables with `COMMENT__` prefix, e.g. `COMMENT__DATABASE__URL`
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var("COMMENT_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("COMMENT")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("moderation.bad_words")
                    .with_list_parse_key("notifier.admin_recipients")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("COMMENT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_defaults_from_minimal_source() {
        let config: Config = config::Config::builder()
            .set_override("database.url", "postgres://localhost/comments")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 5010);
        assert!(config.notifier.enabled);
        assert_eq!(config.notifier.timeout_secs, 10);
        assert_eq!(config.notifier.admin_recipients, vec!["admin"]);
        assert_eq!(config.moderation.bad_words.len(), 4);
        assert_eq!(config.moderation.rate_limit_per_minute, 10);
        assert!(config.logging.is_json());
    }

    #[test]
    fn test_overrides() {
        let config: Config = config::Config::builder()
            .set_override("database.url", "postgres://localhost/comments")
            .unwrap()
            .set_override("moderation.bad_words_enabled", false)
            .unwrap()
            .set_override("logging.format", "text")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(!config.moderation.bad_words_enabled);
        assert!(!config.logging.is_json());
    }
}
