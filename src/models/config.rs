//! Configuration module for the analysis engine and API server
//!
//! Defaults come from utils/constants.rs; `from_env` overrides them from
//! `NETRISK_*` variables. Invalid values fall back to the default with a warning.

use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::utils::constants::{
    DEFAULT_ACTIVITY_THRESHOLD, DEFAULT_AUTHORITATIVE_TIMEOUT_MS, DEFAULT_CRITICAL_MIN_SCORE,
    DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_HOTSPOT_LIMIT, DEFAULT_RAPID_EXPANSION_THRESHOLD,
};

/// Read and parse an env var, warning on unparseable values
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("⚠️ Ignoring invalid {}={:?}, using default", key, raw);
            None
        }
    }
}

/// Like `env_parse`, but zero is rejected as invalid
fn env_nonzero(key: &str) -> Option<u64> {
    match env_parse::<u64>(key)? {
        0 => {
            warn!("⚠️ Ignoring {}=0, must be positive; using default", key);
            None
        }
        value => Some(value),
    }
}

/// Read a non-empty string env var
fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Tunables for one analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Recent (30-day) activities needed for activity points
    pub activity_threshold: usize,
    /// 90-day relationships that mark rapid expansion on their own
    pub rapid_expansion_threshold: usize,
    /// Hotspot list length
    pub hotspot_limit: usize,
    /// Default cut-off for critical entity queries
    pub critical_min_score: u32,
    /// Per-collection fetch budget
    pub fetch_timeout: Duration,
    /// Budget for the authoritative engine before falling back
    pub authoritative_timeout: Duration,
    /// Remote authoritative engine, if any
    pub authoritative_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            activity_threshold: DEFAULT_ACTIVITY_THRESHOLD,
            rapid_expansion_threshold: DEFAULT_RAPID_EXPANSION_THRESHOLD,
            hotspot_limit: DEFAULT_HOTSPOT_LIMIT,
            critical_min_score: DEFAULT_CRITICAL_MIN_SCORE,
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            authoritative_timeout: Duration::from_millis(DEFAULT_AUTHORITATIVE_TIMEOUT_MS),
            authoritative_url: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            activity_threshold: env_parse("NETRISK_ACTIVITY_THRESHOLD")
                .unwrap_or(defaults.activity_threshold),
            rapid_expansion_threshold: env_parse("NETRISK_RAPID_EXPANSION_THRESHOLD")
                .unwrap_or(defaults.rapid_expansion_threshold),
            hotspot_limit: env_parse("NETRISK_HOTSPOT_LIMIT").unwrap_or(defaults.hotspot_limit),
            critical_min_score: env_parse::<u32>("NETRISK_CRITICAL_MIN_SCORE")
                .map(|s| s.min(100))
                .unwrap_or(defaults.critical_min_score),
            fetch_timeout: env_parse("NETRISK_FETCH_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.fetch_timeout),
            authoritative_timeout: env_parse("NETRISK_AUTHORITATIVE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.authoritative_timeout),
            authoritative_url: env_string("NETRISK_AUTHORITATIVE_URL"),
        };

        if config.authoritative_url.is_some() {
            info!(
                "🔗 Authoritative engine configured (timeout {}ms)",
                config.authoritative_timeout.as_millis()
            );
        }

        config
    }
}

/// Where input rows are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// Directory holding `<collection>.json` files
    Directory(String),
    /// REST base URL serving `GET {base}/{collection}`
    Http(String),
}

impl SourceConfig {
    /// `NETRISK_SOURCE_URL` wins over `NETRISK_DATA_DIR`; defaults to `./data`
    pub fn from_env() -> Self {
        if let Some(url) = env_string("NETRISK_SOURCE_URL") {
            Self::Http(url)
        } else {
            Self::Directory(env_string("NETRISK_DATA_DIR").unwrap_or_else(|| "data".to_string()))
        }
    }
}

/// API server settings
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests per client per window
    pub rate_limit_requests: u32,
    /// Rate limit window
    pub rate_limit_window: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            rate_limit_requests: 120,
            rate_limit_window: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// `PORT` (platform-assigned) takes precedence over `NETRISK_PORT`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_string("NETRISK_HOST").unwrap_or(defaults.host),
            port: env_parse("PORT")
                .or_else(|| env_parse("NETRISK_PORT"))
                .unwrap_or(defaults.port),
            rate_limit_requests: env_parse("NETRISK_RATE_LIMIT")
                .unwrap_or(defaults.rate_limit_requests),
            rate_limit_window: env_nonzero("NETRISK_RATE_LIMIT_WINDOW_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.activity_threshold, 3);
        assert_eq!(config.rapid_expansion_threshold, 3);
        assert_eq!(config.hotspot_limit, 15);
        assert_eq!(config.critical_min_score, 85);
        assert!(config.authoritative_url.is_none());
    }

    #[test]
    fn test_invalid_env_falls_back() {
        std::env::set_var("NETRISK_TEST_INVALID_NUMBER", "not-a-number");
        assert_eq!(env_parse::<usize>("NETRISK_TEST_INVALID_NUMBER"), None);
        std::env::set_var("NETRISK_TEST_VALID_NUMBER", " 7 ");
        assert_eq!(env_parse::<usize>("NETRISK_TEST_VALID_NUMBER"), Some(7));
    }

    #[test]
    fn test_zero_window_rejected() {
        std::env::set_var("NETRISK_TEST_ZERO_WINDOW", "0");
        assert_eq!(env_nonzero("NETRISK_TEST_ZERO_WINDOW"), None);
        std::env::set_var("NETRISK_TEST_POSITIVE_WINDOW", "30");
        assert_eq!(env_nonzero("NETRISK_TEST_POSITIVE_WINDOW"), Some(30));
    }

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rate_limit_requests, 120);
    }
}
