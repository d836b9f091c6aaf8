//! Exporter configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use netatmo_core::CollectorSettings;
use netatmo_core::client::DEFAULT_API_URL;

/// Log levels accepted by `logging.level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Netatmo API credentials.
    pub netatmo: NetatmoConfig,
    /// Refresh and staleness timing.
    pub collector: CollectorConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - Netatmo credentials are present and the API URL is http(s)
    /// - Refresh interval and stale threshold are non-zero
    /// - Log level is a known level
    ///
    /// A stale threshold shorter than the refresh interval is accepted; see
    /// [`Config::warnings`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.netatmo.validate());
        errors.extend(self.collector.validate());
        errors.extend(self.logging.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Settings that are valid but probably not what the operator wants.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.collector.stale_threshold < self.collector.refresh_interval {
            warnings.push(format!(
                "collector.stale_threshold ({}s) is shorter than collector.refresh_interval ({}s); \
                 sensors will disappear between refreshes",
                self.collector.stale_threshold, self.collector.refresh_interval
            ));
        }
        warnings
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:9210").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:9210".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
            return errors;
        }

        let Some((_, port)) = self.bind.rsplit_once(':') else {
            errors.push(ValidationError::new(
                "server.bind",
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            ));
            return errors;
        };

        match port.parse::<u16>() {
            Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
            Err(_) => errors.push(ValidationError::new(
                "server.bind",
                format!("invalid port '{}': must be a number 1-65535", port),
            )),
            Ok(_) => {}
        }

        errors
    }
}

/// Netatmo API credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetatmoConfig {
    /// OAuth2 client id of the Netatmo app.
    pub client_id: String,
    /// OAuth2 client secret of the Netatmo app.
    pub client_secret: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// API base URL.
    pub api_url: String,
}

impl Default for NetatmoConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for NetatmoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetatmoConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl NetatmoConfig {
    /// Validate credentials.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("netatmo.client_id", &self.client_id),
            ("netatmo.client_secret", &self.client_secret),
            ("netatmo.refresh_token", &self.refresh_token),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError::new(field, "cannot be empty"));
            }
        }

        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            errors.push(ValidationError::new(
                "netatmo.api_url",
                format!(
                    "invalid URL '{}': must start with http:// or https://",
                    self.api_url
                ),
            ));
        }

        errors
    }
}

/// Refresh and staleness timing, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Minimum seconds between upstream refreshes.
    pub refresh_interval: u64,
    /// Seconds after which a sensor's readings are no longer exported.
    pub stale_threshold: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            refresh_interval: 480,
            stale_threshold: 3600,
        }
    }
}

impl CollectorConfig {
    /// Validate timing.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.refresh_interval == 0 {
            errors.push(ValidationError::new(
                "collector.refresh_interval",
                "refresh interval must be greater than 0",
            ));
        }
        if self.stale_threshold == 0 {
            errors.push(ValidationError::new(
                "collector.stale_threshold",
                "stale threshold must be greater than 0",
            ));
        }

        errors
    }

    /// Collector settings for these values.
    pub fn settings(&self) -> CollectorSettings {
        CollectorSettings {
            refresh_interval: Duration::from_secs(self.refresh_interval),
            stale_threshold: Duration::from_secs(self.stale_threshold),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for this exporter's own targets. `RUST_LOG` still applies.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let level = self.level.to_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            Vec::new()
        } else {
            vec![ValidationError::new(
                "logging.level",
                format!(
                    "unknown log level '{}': expected one of {}",
                    self.level,
                    LOG_LEVELS.join(", ")
                ),
            )]
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `netatmo.client_id`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("netatmo")
        .join("exporter.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            netatmo: NetatmoConfig {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                refresh_token: "token".to_string(),
                ..NetatmoConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "0.0.0.0:9210");
        assert_eq!(config.netatmo.api_url, "https://api.netatmo.com");
        assert_eq!(config.collector.refresh_interval, 480);
        assert_eq!(config.collector.stale_threshold, 3600);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_collector_settings() {
        let settings = CollectorConfig {
            refresh_interval: 60,
            stale_threshold: 120,
        }
        .settings();
        assert_eq!(settings.refresh_interval, Duration::from_secs(60));
        assert_eq!(settings.stale_threshold, Duration::from_secs(120));
    }

    #[test]
    fn test_config_full_toml() {
        let toml = r#"
            [server]
            bind = "127.0.0.1:9999"

            [netatmo]
            client_id = "abc"
            client_secret = "def"
            refresh_token = "ghi"

            [collector]
            refresh_interval = 300
            stale_threshold = 1800

            [logging]
            level = "debug"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9999");
        assert_eq!(config.netatmo.client_id, "abc");
        assert_eq!(config.netatmo.api_url, DEFAULT_API_URL);
        assert_eq!(config.collector.refresh_interval, 300);
        assert_eq!(config.collector.stale_threshold, 1800);
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[collector]\nrefresh_interval = 120\n").unwrap();
        assert_eq!(config.collector.refresh_interval, 120);
        assert_eq!(config.collector.stale_threshold, 3600);
        assert_eq!(config.server.bind, "0.0.0.0:9210");
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("exporter.toml");

        let mut config = valid_config();
        config.server.bind = "127.0.0.1:9100".to_string();
        config.collector.refresh_interval = 600;

        config.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(loaded.server.bind, "127.0.0.1:9100");
        assert_eq!(loaded.netatmo.client_secret, "secret");
        assert_eq!(loaded.collector.refresh_interval, 600);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_default_config_path() {
        assert!(default_config_path().ends_with("netatmo/exporter.toml"));
    }

    #[test]
    fn test_default_config_requires_credentials() {
        let Err(ConfigError::Validation(errors)) = Config::default().validate() else {
            panic!("expected validation errors");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "netatmo.client_id",
                "netatmo.client_secret",
                "netatmo.refresh_token"
            ]
        );
    }

    #[test]
    fn test_valid_config_validates() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_server_bind_validation() {
        let bind = |s: &str| ServerConfig {
            bind: s.to_string(),
        };

        assert!(bind("127.0.0.1:9210").validate().is_empty());
        assert!(bind("[::]:9210").validate().is_empty());
        assert!(bind("localhost:9210").validate().is_empty());

        let errors = bind("").validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot be empty"));

        let errors = bind("127.0.0.1").validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("host:port"));

        let errors = bind("127.0.0.1:0").validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot be 0"));

        let errors = bind("127.0.0.1:abc").validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("must be a number"));
    }

    #[test]
    fn test_api_url_validation() {
        let mut config = valid_config();
        config.netatmo.api_url = "ftp://api.netatmo.com".to_string();
        let errors = config.netatmo.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "netatmo.api_url");

        config.netatmo.api_url = "http://localhost:8080".to_string();
        assert!(config.netatmo.validate().is_empty());
    }

    #[test]
    fn test_zero_durations_rejected() {
        let errors = CollectorConfig {
            refresh_interval: 0,
            stale_threshold: 0,
        }
        .validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "collector.refresh_interval");
        assert_eq!(errors[1].field, "collector.stale_threshold");
    }

    #[test]
    fn test_short_stale_threshold_is_a_warning() {
        let mut config = valid_config();
        config.collector = CollectorConfig {
            refresh_interval: 600,
            stale_threshold: 300,
        };
        assert!(config.validate().is_ok());

        let warnings = config.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("stale_threshold"));

        assert!(valid_config().warnings().is_empty());
    }

    #[test]
    fn test_log_level_validation() {
        for level in ["trace", "DEBUG", "info", "warn", "error"] {
            let config = LoggingConfig {
                level: level.to_string(),
            };
            assert!(config.validate().is_empty(), "{level} should be valid");
        }

        let errors = LoggingConfig {
            level: "verbose".to_string(),
        }
        .validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("unknown log level"));
    }

    #[test]
    fn test_netatmo_config_debug_redacts_secrets() {
        let debug = format!("{:?}", valid_config().netatmo);
        assert!(debug.contains("client_id"));
        assert!(!debug.contains("secret\""));
        assert!(!debug.contains("token\""));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let error = ConfigError::Validation(vec![
            ValidationError::new("server.bind", "port cannot be 0"),
            ValidationError::new("netatmo.client_id", "cannot be empty"),
        ]);
        let display = format!("{}", error);
        assert!(display.contains("server.bind"));
        assert!(display.contains("netatmo.client_id"));
    }
}
