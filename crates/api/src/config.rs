//! Application configuration loaded from environment variables.

use std::time::Duration;

use reservation::{ReservationConfig, RetryPolicy};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset selects the in-memory store
/// - `LOCK_TIMEOUT_MS`: longest wait for a row lock (default: `5000`)
/// - `RETRY_MAX_ATTEMPTS`: attempts per operation on transient aborts (default: `5`)
/// - `RETRY_INITIAL_DELAY_MS`: first retry backoff (default: `10`)
/// - `REFERENCE_MAX_ATTEMPTS`: draws per generated reference (default: `5`)
/// - `CANCELLATION_CUTOFF_MINUTES`: no cancellations closer to departure (default: `120`)
///
/// Unparseable numbers fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub lock_timeout: Duration,
    pub retry_max_attempts: u32,
    pub retry_initial_delay: Duration,
    pub reference_max_attempts: u32,
    pub cancellation_cutoff_minutes: i64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            lock_timeout: number("LOCK_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.lock_timeout),
            retry_max_attempts: number("RETRY_MAX_ATTEMPTS")
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.retry_max_attempts),
            retry_initial_delay: number("RETRY_INITIAL_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_initial_delay),
            reference_max_attempts: number("REFERENCE_MAX_ATTEMPTS")
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.reference_max_attempts),
            cancellation_cutoff_minutes: number("CANCELLATION_CUTOFF_MINUTES")
                .and_then(|n| i64::try_from(n).ok())
                .unwrap_or(defaults.cancellation_cutoff_minutes),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Coordinator tunables derived from this configuration.
    pub fn reservation_config(&self) -> ReservationConfig {
        ReservationConfig::default()
            .with_cancellation_cutoff(chrono::Duration::minutes(self.cancellation_cutoff_minutes))
            .with_reference_attempts(self.reference_max_attempts)
            .with_retry_policy(
                RetryPolicy::new()
                    .with_max_attempts(self.retry_max_attempts)
                    .with_initial_delay(self.retry_initial_delay),
            )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            lock_timeout: store::DEFAULT_LOCK_TIMEOUT,
            retry_max_attempts: 5,
            retry_initial_delay: Duration::from_millis(10),
            reference_max_attempts: 5,
            cancellation_cutoff_minutes: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
        assert_eq!(config.lock_timeout, Duration::from_secs(5));
        assert_eq!(config.cancellation_cutoff_minutes, 120);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_reads_overrides() {
        let config = from_pairs(&[
            ("PORT", "8081"),
            ("DATABASE_URL", "postgres://localhost/reservations"),
            ("LOCK_TIMEOUT_MS", "250"),
            ("RETRY_MAX_ATTEMPTS", "3"),
            ("CANCELLATION_CUTOFF_MINUTES", "60"),
        ]);
        assert_eq!(config.port, 8081);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/reservations")
        );
        assert_eq!(config.lock_timeout, Duration::from_millis(250));

        let reservation = config.reservation_config();
        assert_eq!(reservation.retry_policy.max_attempts(), 3);
        assert_eq!(reservation.cancellation_cutoff, chrono::Duration::minutes(60));
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = from_pairs(&[
            ("PORT", "not-a-port"),
            ("RETRY_MAX_ATTEMPTS", "0"),
            ("REFERENCE_MAX_ATTEMPTS", "-1"),
            ("DATABASE_URL", ""),
        ]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.retry_max_attempts, 5);
        assert_eq!(config.reference_max_attempts, 5);
        assert!(config.database_url.is_none());
    }
}
