//! Configuration module for the garage gateway.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

/// Value of `GARAGE_STORAGE_PATH` that selects the in-memory store.
pub const MEMORY_STORAGE: &str = "memory";

/// How failed writes to the fallback store are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Log the failure and keep the in-memory change.
    BestEffort,
    /// Surface the failure to the caller and discard the change.
    Strict,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote REST API (resource paths are appended)
    pub remote_base_url: String,
    /// Request timeout for the remote API
    pub remote_timeout: Duration,
    /// Path to the SQLite fallback store; `None` keeps state in memory
    pub storage_path: Option<PathBuf>,
    /// Address to bind the gateway to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Fallback store write policy
    pub persistence: Persistence,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let remote_base_url = env::var("GARAGE_REMOTE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:4000/api".to_string())
            .trim_end_matches('/')
            .to_string();

        let remote_timeout = match env::var("GARAGE_REMOTE_TIMEOUT_MS") {
            Ok(raw) => raw.parse::<u64>().map(Duration::from_millis).map_err(|_| {
                AppError::Validation(format!("Invalid GARAGE_REMOTE_TIMEOUT_MS: {}", raw))
            })?,
            Err(_) => Duration::from_millis(5000),
        };

        let storage_path = match env::var("GARAGE_STORAGE_PATH") {
            Ok(raw) if raw.trim().is_empty() || raw == MEMORY_STORAGE => None,
            Ok(raw) => Some(PathBuf::from(raw)),
            Err(_) => Some(PathBuf::from("./data/fallback.sqlite")),
        };

        let raw_addr =
            env::var("GARAGE_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = raw_addr
            .parse()
            .map_err(|_| AppError::Validation(format!("Invalid GARAGE_BIND_ADDR: {}", raw_addr)))?;

        let log_level = env::var("GARAGE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let persistence = match env::var("GARAGE_STRICT_PERSISTENCE").as_deref() {
            Ok("1") | Ok("true") | Ok("TRUE") => Persistence::Strict,
            _ => Persistence::BestEffort,
        };

        Ok(Self {
            remote_base_url,
            remote_timeout,
            storage_path,
            bind_addr,
            log_level,
            persistence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases touch process-wide env vars, so they run in one test.
    #[test]
    fn test_config_from_env() {
        env::remove_var("GARAGE_REMOTE_URL");
        env::remove_var("GARAGE_REMOTE_TIMEOUT_MS");
        env::remove_var("GARAGE_STORAGE_PATH");
        env::remove_var("GARAGE_BIND_ADDR");
        env::remove_var("GARAGE_LOG_LEVEL");
        env::remove_var("GARAGE_STRICT_PERSISTENCE");

        let config = Config::from_env().unwrap();

        assert_eq!(config.remote_base_url, "http://127.0.0.1:4000/api");
        assert_eq!(config.remote_timeout, Duration::from_millis(5000));
        assert_eq!(
            config.storage_path,
            Some(PathBuf::from("./data/fallback.sqlite"))
        );
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.persistence, Persistence::BestEffort);

        env::set_var("GARAGE_REMOTE_URL", "http://upstream/api/");
        env::set_var("GARAGE_STORAGE_PATH", MEMORY_STORAGE);
        env::set_var("GARAGE_STRICT_PERSISTENCE", "true");
        let config = Config::from_env().unwrap();
        assert_eq!(config.remote_base_url, "http://upstream/api");
        assert!(config.storage_path.is_none());
        assert_eq!(config.persistence, Persistence::Strict);

        env::set_var("GARAGE_REMOTE_TIMEOUT_MS", "soon");
        assert!(matches!(Config::from_env(), Err(AppError::Validation(_))));

        env::remove_var("GARAGE_REMOTE_URL");
        env::remove_var("GARAGE_STORAGE_PATH");
        env::remove_var("GARAGE_STRICT_PERSISTENCE");
        env::remove_var("GARAGE_REMOTE_TIMEOUT_MS");
    }
}
