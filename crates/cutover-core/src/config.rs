//! Runtime configuration for cutover
//!
//! Configuration is loaded from `CUTOVER_*` environment variables. Invalid
//! values fall back to the documented defaults with a warning rather than
//! aborting startup.

use std::env;
use std::time::Duration;

use tracing::warn;

/// Default number of records per reindex batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default interval between live schema-readiness checks
pub const DEFAULT_SCHEMA_CHECK_INTERVAL: Duration = Duration::from_secs(300);

/// Runtime configuration shared by the indexer and the job pipelines
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of records enumerated per batch during population (default 1000)
    pub batch_size: usize,
    /// How long a cached schema-readiness answer may be served before the
    /// engine is queried again (default 5 minutes). Staleness inside this
    /// window is an accepted consistency relaxation.
    pub schema_check_interval: Duration,
    /// Whether a job-queue backend is configured. When `true`, population is
    /// dispatched as asynchronous jobs instead of running inline.
    pub distributed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            schema_check_interval: DEFAULT_SCHEMA_CHECK_INTERVAL,
            distributed: false,
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Recognized variables:
    /// - `CUTOVER_BATCH_SIZE` — records per population batch
    /// - `CUTOVER_SCHEMA_CHECK_INTERVAL_SECS` — schema-readiness cache window
    /// - `CUTOVER_DISTRIBUTED` — `true`/`1` when a queue backend is configured
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_size: parse_value(
                "CUTOVER_BATCH_SIZE",
                env::var("CUTOVER_BATCH_SIZE").ok().as_deref(),
                defaults.batch_size,
            ),
            schema_check_interval: Duration::from_secs(parse_value(
                "CUTOVER_SCHEMA_CHECK_INTERVAL_SECS",
                env::var("CUTOVER_SCHEMA_CHECK_INTERVAL_SECS").ok().as_deref(),
                defaults.schema_check_interval.as_secs(),
            )),
            distributed: parse_bool(
                "CUTOVER_DISTRIBUTED",
                env::var("CUTOVER_DISTRIBUTED").ok().as_deref(),
                defaults.distributed,
            ),
        }
    }
}

fn parse_value<T: std::str::FromStr + Copy>(key: &str, raw: Option<&str>, default: T) -> T {
    raw.map_or(default, |value| {
        value.trim().parse().unwrap_or_else(|_| {
            warn!(key, value, "invalid value, using default");
            default
        })
    })
}

fn parse_bool(key: &str, raw: Option<&str>, default: bool) -> bool {
    raw.map_or(default, |value| {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warn!(key, value, "invalid boolean, using default");
                default
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.schema_check_interval, Duration::from_secs(300));
        assert!(!config.distributed);
    }

    #[test]
    fn from_env_without_vars_matches_defaults() {
        // The suite never sets CUTOVER_* variables, so this exercises the
        // unset path end to end.
        let config = Config::from_env();
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.schema_check_interval, Duration::from_secs(300));
        assert!(!config.distributed);
    }

    #[test]
    fn parse_value_reads_numbers() {
        assert_eq!(parse_value("K", Some("250"), 1000_usize), 250);
        assert_eq!(parse_value("K", Some("  60 "), 300_u64), 60);
    }

    #[test]
    fn parse_value_falls_back_on_garbage() {
        assert_eq!(parse_value("K", Some("not-a-number"), 42_usize), 42);
        assert_eq!(parse_value("K", Some(""), 42_usize), 42);
        assert_eq!(parse_value("K", None, 42_usize), 42);
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for (raw, expected) in [
            ("1", true),
            ("true", true),
            ("YES", true),
            ("on", true),
            ("0", false),
            ("false", false),
            ("No", false),
            ("off", false),
        ] {
            assert_eq!(parse_bool("K", Some(raw), !expected), expected);
        }
    }

    #[test]
    fn parse_bool_falls_back_on_garbage() {
        assert!(parse_bool("K", Some("maybe"), true));
        assert!(!parse_bool("K", Some("maybe"), false));
        assert!(parse_bool("K", None, true));
    }
}
