/**
 * Server Configuration
 *
 * This module loads the server configuration from environment variables
 * (after an optional `.env` file via dotenvy). Most settings have sensible
 * defaults for local development; `JWT_SECRET` is required and startup
 * fails without it.
 *
 * Durations accept `30s` / `5m` / `1h` style values or a bare number of
 * seconds.
 */

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default retention window for journal rows. Edits authored against a
/// version older than this can no longer be rebased and are rejected.
pub const DEFAULT_OPERATION_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Process configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage_dir: PathBuf,
    pub sqlite_filepath: PathBuf,
    pub jwt_secret: Vec<u8>,
    pub cache_max_age: Duration,
    pub flush_interval: Duration,
    /// Upload size cap in bytes (`MAX_FILE_SIZE` is given in megabytes).
    pub max_file_size: u64,
    pub min_changes_threshold: i64,
    pub operation_max_age: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse(&lookup, "PORT", 8080u16)?;
        let storage_dir =
            PathBuf::from(lookup("STORAGE_DIR").unwrap_or_else(|| "./data".to_string()));
        let sqlite_filepath = PathBuf::from(
            lookup("SQLITE_FILEPATH").unwrap_or_else(|| "./data/db.sqlite3".to_string()),
        );

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?
            .into_bytes();

        let cache_max_age = parse_duration_var(&lookup, "CACHE_MAX_AGE", Duration::from_secs(3600))?;
        let flush_interval = parse_duration_var(&lookup, "FLUSH_INTERVAL", Duration::from_secs(60))?;
        let max_file_size_mb = parse(&lookup, "MAX_FILE_SIZE", 1024u64)?;
        let min_changes_threshold = parse(&lookup, "MIN_CHANGES_THRESHOLD", 3i64)?;

        Ok(Config {
            host,
            port,
            storage_dir,
            sqlite_filepath,
            jwt_secret,
            cache_max_age,
            flush_interval,
            max_file_size: max_file_size_mb << 20,
            min_changes_threshold,
            operation_max_age: DEFAULT_OPERATION_MAX_AGE,
        })
    }
}

fn parse<T: std::str::FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

fn parse_duration_var(
    lookup: impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match lookup(var) {
        Some(value) => {
            parse_duration(&value).ok_or(ConfigError::Invalid { var, value })
        }
        None => Ok(default),
    }
}

/// Parse `90`, `90s`, `15m` or `2h` into a `Duration`.
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (digits, unit) = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(split) => value.split_at(split),
        None => (value, ""),
    };

    let amount: u64 = digits.parse().ok()?;
    match unit {
        "" | "s" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_secs(amount * 60)),
        "h" => Some(Duration::from_secs(amount * 3600)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_duration_forms() {
        assert_eq!(parse_duration("90"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("1d"), None);
        assert_eq!(parse_duration("abc"), None);
    }

    #[test]
    fn defaults_apply_without_env() {
        let vars = env(&[("JWT_SECRET", "secret")]);
        let config = Config::from_lookup(|var| vars.get(var).cloned()).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_max_age, Duration::from_secs(3600));
        assert_eq!(config.flush_interval, Duration::from_secs(60));
        assert_eq!(config.max_file_size, 1024 << 20);
        assert_eq!(config.min_changes_threshold, 3);
    }

    #[test]
    fn missing_secret_is_fatal() {
        let vars = env(&[("HOST", "127.0.0.1")]);
        let err = Config::from_lookup(|var| vars.get(var).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let vars = env(&[("JWT_SECRET", "secret"), ("PORT", "not-a-port")]);
        let err = Config::from_lookup(|var| vars.get(var).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));
    }

    #[test]
    fn overrides_apply() {
        let vars = env(&[
            ("JWT_SECRET", "secret"),
            ("PORT", "9999"),
            ("CACHE_MAX_AGE", "10m"),
            ("MAX_FILE_SIZE", "1"),
            ("MIN_CHANGES_THRESHOLD", "5"),
        ]);
        let config = Config::from_lookup(|var| vars.get(var).cloned()).unwrap();

        assert_eq!(config.port, 9999);
        assert_eq!(config.cache_max_age, Duration::from_secs(600));
        assert_eq!(config.max_file_size, 1 << 20);
        assert_eq!(config.min_changes_threshold, 5);
    }
}
