use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::monitoring::MonitoringSettings;
use crate::rollup::RecencyWindow;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub monitoring: MonitoringConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database_path = optional_var("APP_DATABASE_PATH").map(PathBuf::from);

        let recency_window = parse_var("APP_RECENCY_WINDOW", 2)?;
        if recency_window == 0 {
            return Err(ConfigError::OutOfRange {
                name: "APP_RECENCY_WINDOW",
                reason: "must be at least 1",
            });
        }

        let query_timeout_ms = parse_var("APP_QUERY_TIMEOUT_MS", 5_000)?;
        if query_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange {
                name: "APP_QUERY_TIMEOUT_MS",
                reason: "must be greater than 0",
            });
        }

        let recent_activity_limit = parse_var("APP_RECENT_ACTIVITY_LIMIT", 20)?;
        let scoring_config = optional_var("APP_SCORING_CONFIG").map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig { database_path },
            monitoring: MonitoringConfig {
                recency_window,
                query_timeout_ms: query_timeout_ms as u64,
                recent_activity_limit,
                scoring_config,
            },
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match optional_var(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where responses and the roster live. Without a database path everything stays in memory.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    pub recency_window: usize,
    pub query_timeout_ms: u64,
    pub recent_activity_limit: usize,
    pub scoring_config: Option<PathBuf>,
}

impl MonitoringConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn settings(&self) -> MonitoringSettings {
        MonitoringSettings {
            window: RecencyWindow::new(self.recency_window),
            recent_activity_limit: self.recent_activity_limit,
            query_timeout: self.query_timeout(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str, value: String },
    OutOfRange { name: &'static str, reason: &'static str },
    Missing { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{name} must be a non-negative integer, got '{value}'")
            }
            ConfigError::OutOfRange { name, reason } => write!(f, "{name} {reason}"),
            ConfigError::Missing { name } => write!(f, "{name} must be set for this command"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::OutOfRange { .. }
            | ConfigError::Missing { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_DATABASE_PATH",
            "APP_RECENCY_WINDOW",
            "APP_QUERY_TIMEOUT_MS",
            "APP_RECENT_ACTIVITY_LIMIT",
            "APP_SCORING_CONFIG",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.storage.database_path.is_none());

        let settings = config.monitoring.settings();
        assert_eq!(settings.window, RecencyWindow::new(2));
        assert_eq!(settings.recent_activity_limit, 20);
        assert_eq!(settings.query_timeout, Duration::from_millis(5_000));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn reads_monitoring_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        env::set_var("APP_DATABASE_PATH", "/var/lib/wellbeing/monitor.db");
        env::set_var("APP_RECENCY_WINDOW", "3");
        env::set_var("APP_QUERY_TIMEOUT_MS", "250");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(
            config.storage.database_path,
            Some(PathBuf::from("/var/lib/wellbeing/monitor.db"))
        );
        assert_eq!(config.monitoring.recency_window, 3);
        assert_eq!(config.monitoring.query_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn rejects_zero_window() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_RECENCY_WINDOW", "0");
        let result = AppConfig::load();
        reset_env();

        assert!(matches!(
            result,
            Err(ConfigError::OutOfRange {
                name: "APP_RECENCY_WINDOW",
                ..
            })
        ));
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_QUERY_TIMEOUT_MS", "soon");
        let result = AppConfig::load();
        reset_env();

        match result {
            Err(err @ ConfigError::InvalidNumber { .. }) => {
                assert_eq!(
                    err.to_string(),
                    "APP_QUERY_TIMEOUT_MS must be a non-negative integer, got 'soon'"
                );
            }
            other => panic!("expected invalid number, got {other:?}"),
        }
    }
}
