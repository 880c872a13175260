//! Service configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Every key has a default, so an empty
//! environment yields a runnable development setup backed by the in-memory
//! store.

use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::Context;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-field lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Top-level service configuration.
///
/// Loaded once at startup via [`SchedulerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8000`).
    pub listen_addr: SocketAddr,

    /// PostgreSQL connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,

    /// Minimum idle connections in the pool.
    pub database_min_connections: u32,

    /// Timeout in seconds for acquiring a database connection.
    pub database_connect_timeout_secs: u64,

    /// Token signing secret. `None` generates a random one at startup.
    pub jwt_secret: Option<String>,

    /// Lifetime of issued access tokens, in minutes.
    pub access_token_ttl_mins: i64,

    /// Seconds between reminder dispatcher ticks.
    pub reminder_interval_secs: u64,

    /// Look-ahead window of the reminder dispatcher, in minutes.
    pub reminder_lookahead_mins: i64,

    /// Capacity of the notification broadcast channel.
    pub notification_bus_capacity: usize,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Log output format.
    pub log_format: LogFormat,
}

impl SchedulerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set. Calls
    /// `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` or `LOG_FORMAT` is set but cannot be
    /// parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
            .parse()
            .context("LISTEN_ADDR must be a socket address")?;

        let database_url = non_empty_env("DATABASE_URL");
        let database_max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 10);
        let database_min_connections = parse_env("DATABASE_MIN_CONNECTIONS", 1);
        let database_connect_timeout_secs = parse_env("DATABASE_CONNECT_TIMEOUT_SECS", 5);

        let jwt_secret = non_empty_env("JWT_SECRET");
        let access_token_ttl_mins = parse_env("ACCESS_TOKEN_TTL_MINS", 30);

        let reminder_interval_secs = parse_env("REMINDER_INTERVAL_SECS", 60);
        let reminder_lookahead_mins = parse_env("REMINDER_LOOKAHEAD_MINS", 30);

        let notification_bus_capacity = parse_env("NOTIFICATION_BUS_CAPACITY", 1024);
        let request_timeout_secs = parse_env("REQUEST_TIMEOUT_SECS", 30);

        let log_format: LogFormat = match non_empty_env("LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(anyhow::Error::msg)?,
            None => LogFormat::default(),
        };

        Ok(Self {
            listen_addr,
            database_url,
            database_max_connections,
            database_min_connections,
            database_connect_timeout_secs,
            jwt_secret,
            access_token_ttl_mins,
            reminder_interval_secs,
            reminder_lookahead_mins,
            notification_bus_capacity,
            request_timeout_secs,
            log_format,
        })
    }

    /// Access token lifetime.
    #[must_use]
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_ttl_mins)
    }

    /// Period between reminder ticks. Never zero.
    #[must_use]
    pub fn reminder_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reminder_interval_secs.max(1))
    }

    /// Reminder look-ahead window.
    #[must_use]
    pub fn reminder_lookahead(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reminder_lookahead_mins)
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Reads an environment variable, treating an empty value as unset.
fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn missing_variable_falls_back_to_default() {
        let value: u64 = parse_env("EVENT_SCHEDULER_TEST_UNSET_VARIABLE", 42);
        assert_eq!(value, 42);
        assert!(non_empty_env("EVENT_SCHEDULER_TEST_UNSET_VARIABLE").is_none());
    }
}
