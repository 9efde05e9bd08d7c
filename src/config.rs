//! Configuration Module
//!
//! Loads server, store, and cache settings from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Durable store connection string
    pub database_url: String,
    /// Distributed cache host
    pub redis_host: String,
    /// Distributed cache port
    pub redis_port: u16,
    /// Distributed cache credential; `None` connects unauthenticated
    pub redis_password: Option<String>,
    /// Upper bound on each distributed cache call, in milliseconds
    pub cache_timeout_ms: u64,
    /// Directory holding `quiz.html` / `goal.html` overrides
    pub template_dir: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8000)
    /// - `DATABASE_URL` - SQLite URL (default: `sqlite://roster.db?mode=rwc`)
    /// - `REDIS_HOST` - Distributed cache host (default: 127.0.0.1)
    /// - `REDIS_PORT` - Distributed cache port (default: 6379)
    /// - `REDIS_PASS` - Distributed cache password (default: none)
    /// - `CACHE_TIMEOUT_MS` - Per-call distributed cache bound (default: 500)
    /// - `TEMPLATE_DIR` - Template override directory (default: embedded templates)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            database_url: non_empty_var("DATABASE_URL").unwrap_or(defaults.database_url),
            redis_host: non_empty_var("REDIS_HOST").unwrap_or(defaults.redis_host),
            redis_port: parse_var("REDIS_PORT").unwrap_or(defaults.redis_port),
            redis_password: non_empty_var("REDIS_PASS"),
            cache_timeout_ms: parse_var("CACHE_TIMEOUT_MS").unwrap_or(defaults.cache_timeout_ms),
            template_dir: non_empty_var("TEMPLATE_DIR").map(PathBuf::from),
        }
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8000,
            database_url: "sqlite://roster.db?mode=rwc".to_string(),
            redis_host: "127.0.0.1".to_string(),
            redis_port: 6379,
            redis_password: None,
            cache_timeout_ms: 500,
            template_dir: None,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
