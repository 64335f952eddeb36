use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

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

/// Top-level configuration, constructed once at startup and passed by
/// ownership into the router and the refresh job. No ambient globals.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub regional: RegionalConfig,
    pub refresh: RefreshConfig,
    pub llm: LlmConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database_path = PathBuf::from(
            env::var("DATABASE_PATH").unwrap_or_else(|_| "microloan.db".to_string()),
        );
        let regional_data_path = PathBuf::from(
            env::var("REGIONAL_DATA_PATH")
                .unwrap_or_else(|_| "data/regional_data.json".to_string()),
        );

        let refresh_interval_secs = env::var("REFRESH_INTERVAL_SECS")
            .unwrap_or_else(|_| "1800".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidRefreshInterval)?;

        // Absence of the key only disables the enhancement, never errors.
        let api_key = env::var("GROQ_API_KEY").ok().filter(|key| !key.is_empty());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database: DatabaseConfig {
                path: database_path,
            },
            regional: RegionalConfig {
                path: regional_data_path,
            },
            refresh: RefreshConfig {
                interval: Duration::from_secs(refresh_interval_secs),
            },
            llm: LlmConfig { api_key },
        })
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the SQLite borrower table.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// Location of the regional economic data file.
#[derive(Debug, Clone)]
pub struct RegionalConfig {
    pub path: PathBuf,
}

/// How often the background refresh recomputes stored scores.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub interval: Duration,
}

/// Optional chat-completion enhancement.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRefreshInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRefreshInterval => {
                write!(f, "REFRESH_INTERVAL_SECS must be a whole number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidRefreshInterval => None,
            ConfigError::InvalidHost { source } => Some(source),
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
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("DATABASE_PATH");
        env::remove_var("REGIONAL_DATA_PATH");
        env::remove_var("REFRESH_INTERVAL_SECS");
        env::remove_var("GROQ_API_KEY");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.path, PathBuf::from("microloan.db"));
        assert_eq!(config.refresh.interval, Duration::from_secs(1800));
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn empty_api_key_counts_as_absent() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("GROQ_API_KEY", "");
        let config = AppConfig::load().expect("config loads");
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn rejects_malformed_refresh_interval() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REFRESH_INTERVAL_SECS", "soon");
        let err = AppConfig::load().expect_err("must fail");
        assert!(matches!(err, ConfigError::InvalidRefreshInterval));
        env::remove_var("REFRESH_INTERVAL_SECS");
    }
}
