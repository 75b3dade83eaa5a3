//! Configuration loading for the news feed content service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `NEWSFEED_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application configuration derived from `NEWSFEED_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operator_tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    /// Max age advertised to clients on content reads
    #[serde(default = "default_cache_expiry_seconds")]
    pub cache_expiry_seconds: u64,
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Settings for the scheduled fetch-and-ingest pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct IngestConfig {
    /// Whether the scheduler starts with the server (default: true); the
    /// worker pool always runs so manual dispatch keeps working
    ///
    /// Environment variable: `NEWSFEED_INGEST_ENABLED`
    #[serde(default = "default_ingest_enabled")]
    pub enabled: bool,

    /// Daily UTC trigger time as `HH:MM`; when unset the scheduler fires every
    /// `interval_seconds`
    ///
    /// Environment variable: `NEWSFEED_INGEST_RUN_AT`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_at: Option<String>,

    /// Interval between dispatches when no daily time is set (default: 86400)
    ///
    /// Environment variable: `NEWSFEED_INGEST_INTERVAL_SECONDS`
    #[serde(default = "default_ingest_interval_seconds")]
    pub interval_seconds: u64,

    /// Pause before every partner request in milliseconds (default: 2000)
    ///
    /// Environment variable: `NEWSFEED_INGEST_THROTTLE_MS`
    #[serde(default = "default_ingest_throttle_ms")]
    pub throttle_ms: u64,

    /// `page_size` query parameter sent to partners (default: 50)
    ///
    /// Environment variable: `NEWSFEED_INGEST_PAGE_SIZE`
    #[serde(default = "default_ingest_page_size")]
    pub page_size: u32,

    /// Upper bound on pages fetched in one run (default: 100)
    ///
    /// Environment variable: `NEWSFEED_INGEST_MAX_PAGES`
    #[serde(default = "default_ingest_max_pages")]
    pub max_pages: u32,

    /// Number of provider jobs processed concurrently (default: 4)
    ///
    /// Environment variable: `NEWSFEED_INGEST_WORKER_CONCURRENCY`
    #[serde(default = "default_ingest_worker_concurrency")]
    pub worker_concurrency: usize,

    /// User-Agent header sent to partner APIs
    ///
    /// Environment variable: `NEWSFEED_INGEST_USER_AGENT`
    #[serde(default = "default_ingest_user_agent")]
    pub user_agent: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: default_ingest_enabled(),
            run_at: None,
            interval_seconds: default_ingest_interval_seconds(),
            throttle_ms: default_ingest_throttle_ms(),
            page_size: default_ingest_page_size(),
            max_pages: default_ingest_max_pages(),
            worker_concurrency: default_ingest_worker_concurrency(),
            user_agent: default_ingest_user_agent(),
        }
    }
}

impl IngestConfig {
    /// Parses `run_at` into a time of day.
    pub fn run_at_time(&self) -> Result<Option<NaiveTime>, ConfigError> {
        match self.run_at.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => NaiveTime::parse_from_str(value, "%H:%M")
                .map(Some)
                .map_err(|_| ConfigError::InvalidIngestRunAt {
                    value: value.to_string(),
                }),
        }
    }

    /// Validate ingestion configuration bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.run_at_time()?;

        if self.interval_seconds < 60 || self.interval_seconds > 604_800 {
            return Err(ConfigError::InvalidIngestInterval {
                value: self.interval_seconds,
            });
        }

        if self.page_size == 0 || self.page_size > 1000 {
            return Err(ConfigError::InvalidIngestPageSize {
                value: self.page_size,
            });
        }

        if self.max_pages == 0 {
            return Err(ConfigError::InvalidIngestMaxPages {
                value: self.max_pages,
            });
        }

        if self.worker_concurrency == 0 || self.worker_concurrency > 64 {
            return Err(ConfigError::InvalidIngestConcurrency {
                value: self.worker_concurrency,
            });
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            operator_tokens: Vec::new(),
            jwt_secret: None,
            cache_expiry_seconds: default_cache_expiry_seconds(),
            ingest: IngestConfig::default(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if !config.operator_tokens.is_empty() {
            config.operator_tokens = vec!["[REDACTED]".to_string()];
        }
        if config.jwt_secret.is_some() {
            config.jwt_secret = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Every profile needs some way to authenticate API callers
        if self.operator_tokens.is_empty() && self.jwt_secret.is_none() {
            return Err(ConfigError::MissingCredentials);
        }

        if let Some(secret) = &self.jwt_secret
            && secret.len() < 16
        {
            return Err(ConfigError::InvalidJwtSecret {
                length: secret.len(),
            });
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidDbMaxConnections {
                value: self.db_max_connections,
            });
        }

        self.ingest.validate()?;

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "postgresql://localhost:5432/news_feed_content".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_cache_expiry_seconds() -> u64 {
    300 // 5 minutes
}

fn default_ingest_enabled() -> bool {
    true
}

fn default_ingest_interval_seconds() -> u64 {
    86_400 // 24 hours
}

fn default_ingest_throttle_ms() -> u64 {
    2000
}

fn default_ingest_page_size() -> u32 {
    50
}

fn default_ingest_max_pages() -> u32 {
    100
}

fn default_ingest_worker_concurrency() -> usize {
    4
}

fn default_ingest_user_agent() -> String {
    format!("news-feed-content/{}", env!("CARGO_PKG_VERSION"))
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error(
        "no API credentials configured; set NEWSFEED_OPERATOR_TOKEN, NEWSFEED_OPERATOR_TOKENS or NEWSFEED_JWT_SECRET"
    )]
    MissingCredentials,
    #[error("JWT secret must be at least 16 bytes, got {length}")]
    InvalidJwtSecret { length: usize },
    #[error("database max connections must be positive, got {value}")]
    InvalidDbMaxConnections { value: u32 },
    #[error("ingest run-at time must be HH:MM, got '{value}'")]
    InvalidIngestRunAt { value: String },
    #[error("ingest interval must be between 60 and 604800 seconds, got {value}")]
    InvalidIngestInterval { value: u64 },
    #[error("ingest page size must be between 1 and 1000, got {value}")]
    InvalidIngestPageSize { value: u32 },
    #[error("ingest max pages must be at least 1, got {value}")]
    InvalidIngestMaxPages { value: u32 },
    #[error("ingest worker concurrency must be between 1 and 64, got {value}")]
    InvalidIngestConcurrency { value: usize },
}

/// Loads configuration using layered `.env` files and `NEWSFEED_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads and validates the configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("NEWSFEED_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let api_bind_addr = layered
            .remove("API_BIND_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_api_bind_addr);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections = layered
            .remove("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = layered
            .remove("DB_ACQUIRE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_acquire_timeout_ms);

        // Handle operator tokens - support both single token and comma-separated list
        let operator_tokens = if let Some(tokens) = layered.remove("OPERATOR_TOKENS") {
            tokens
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        } else if let Some(token) = layered.remove("OPERATOR_TOKEN") {
            vec![token]
        } else {
            Vec::new()
        };

        let jwt_secret = layered
            .remove("JWT_SECRET")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let cache_expiry_seconds = layered
            .remove("CACHE_EXPIRY_SECONDS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_cache_expiry_seconds);

        let ingest = IngestConfig {
            enabled: layered
                .remove("INGEST_ENABLED")
                .and_then(|v| parse_bool(&v))
                .unwrap_or_else(default_ingest_enabled),
            run_at: layered
                .remove("INGEST_RUN_AT")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            interval_seconds: layered
                .remove("INGEST_INTERVAL_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_ingest_interval_seconds),
            throttle_ms: layered
                .remove("INGEST_THROTTLE_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_ingest_throttle_ms),
            page_size: layered
                .remove("INGEST_PAGE_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_ingest_page_size),
            max_pages: layered
                .remove("INGEST_MAX_PAGES")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_ingest_max_pages),
            worker_concurrency: layered
                .remove("INGEST_WORKER_CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_ingest_worker_concurrency),
            user_agent: layered
                .remove("INGEST_USER_AGENT")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_ingest_user_agent),
        };

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            operator_tokens,
            jwt_secret,
            cache_expiry_seconds,
            ingest,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("NEWSFEED_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("NEWSFEED_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            operator_tokens: vec!["token".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn default_ingest_settings_mirror_partner_contract() {
        let ingest = IngestConfig::default();
        assert_eq!(ingest.page_size, 50);
        assert_eq!(ingest.throttle_ms, 2000);
        assert!(ingest.max_pages > 1);
        assert!(ingest.run_at.is_none());
    }

    #[test]
    fn validate_requires_credentials() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCredentials)
        ));

        let jwt_only = AppConfig {
            jwt_secret: Some("0123456789abcdef0123".to_string()),
            ..Default::default()
        };
        assert!(jwt_only.validate().is_ok());
    }

    #[test]
    fn validate_rejects_short_jwt_secret() {
        let config = AppConfig {
            jwt_secret: Some("short".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidJwtSecret { length: 5 })
        ));
    }

    #[test]
    fn validate_ingest_bounds() {
        let mut config = valid_config();
        assert!(config.validate().is_ok());

        config.ingest.page_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidIngestPageSize { value: 0 })
        ));

        config.ingest.page_size = 50;
        config.ingest.interval_seconds = 5;
        assert!(config.validate().is_err());

        config.ingest.interval_seconds = 3600;
        config.ingest.worker_concurrency = 0;
        assert!(config.validate().is_err());

        config.ingest.worker_concurrency = 2;
        config.ingest.max_pages = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn run_at_parses_time_of_day() {
        let mut ingest = IngestConfig {
            run_at: Some("03:12".to_string()),
            ..Default::default()
        };
        assert_eq!(
            ingest.run_at_time().unwrap(),
            NaiveTime::from_hms_opt(3, 12, 0)
        );

        ingest.run_at = Some("35:12".to_string());
        assert!(matches!(
            ingest.run_at_time(),
            Err(ConfigError::InvalidIngestRunAt { .. })
        ));

        ingest.run_at = None;
        assert_eq!(ingest.run_at_time().unwrap(), None);
    }

    #[test]
    fn redacted_json_hides_secrets() {
        let config = AppConfig {
            operator_tokens: vec!["super-secret".to_string()],
            jwt_secret: Some("another-secret-value".to_string()),
            ..Default::default()
        };
        let json = config.redacted_json().unwrap();
        assert!(!json.contains("super-secret"));
        assert!(!json.contains("another-secret-value"));
        assert!(json.contains("[REDACTED]"));
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
