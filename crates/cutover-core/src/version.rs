//! Index version name codec
//!
//! Physical index versions are named `<logical>_v<schema>_<secs>.<micros>`.
//! The codec is pure string manipulation: it never talks to the engine and is
//! never consulted for correctness-critical decisions beyond prune ordering.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

/// Schema version assigned to unversioned/legacy indices
pub const DEFAULT_SCHEMA_VERSION: &str = "0";

fn schema_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^.*_v(\d[.\d]*)_\d+\.\d+$").expect("schema version pattern is valid")
    })
}

fn suffix_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^v(\d[.\d]*)_\d+\.\d+$").expect("version suffix pattern is valid"))
}

/// Build a physical index version name for a logical index.
///
/// The timestamp is encoded as epoch seconds with microsecond precision so
/// that versions created in quick succession still order correctly.
#[must_use]
pub fn version_name(logical: &str, schema_version: &str, now: DateTime<Utc>) -> String {
    format!(
        "{logical}_v{schema_version}_{}.{:06}",
        now.timestamp(),
        now.timestamp_subsec_micros()
    )
}

/// Extract the schema tag from a version name.
///
/// Returns [`DEFAULT_SCHEMA_VERSION`] when the name does not carry the
/// `_v<schema>_<timestamp>` suffix: legacy indices predate schema tagging and
/// are treated as schema `"0"`.
#[must_use]
pub fn extract_schema_version(version_name: &str) -> String {
    schema_pattern()
        .captures(version_name)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| DEFAULT_SCHEMA_VERSION.to_owned(), |m| m.as_str().to_owned())
}

/// Extract the numeric creation timestamp from a version name.
///
/// Takes everything after the final `_`; returns `0.0` when that is not a
/// number. Used only for prune-ordering comparisons.
#[must_use]
pub fn version_timestamp(version_name: &str) -> f64 {
    version_name
        .rsplit('_')
        .next()
        .and_then(|suffix| suffix.parse().ok())
        .unwrap_or(0.0)
}

/// Returns `true` when `name` is a physical version of the given logical index.
///
/// Requires the exact `<logical>_v<schema>_<timestamp>` shape. A bare prefix
/// match would leak `user_profile_v1_...` into logical index `user`'s version
/// list.
#[must_use]
pub fn is_version_of(logical: &str, name: &str) -> bool {
    name.strip_prefix(logical)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|suffix| suffix_pattern().is_match(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(secs: i64, micros: u32) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, micros * 1000).expect("timestamp in range")
    }

    #[test]
    fn version_name_shape() {
        let name = version_name("article", "2", at(1_700_000_000, 250_000));
        assert_eq!(name, "article_v2_1700000000.250000");
    }

    #[test]
    fn schema_round_trips_through_name() {
        for schema in ["0", "1", "2.5", "10.0.3"] {
            let name = version_name("user", schema, at(1_700_000_000, 1));
            assert_eq!(extract_schema_version(&name), schema);
        }
    }

    #[test]
    fn timestamp_round_trips_through_name() {
        let name = version_name("user", "1", at(1_700_000_123, 500_000));
        let ts = version_timestamp(&name);
        assert!((ts - 1_700_000_123.5).abs() < 1e-6);
    }

    #[test]
    fn unversioned_names_are_schema_zero() {
        assert_eq!(extract_schema_version("article"), "0");
        assert_eq!(extract_schema_version("article_1700000000"), "0");
        assert_eq!(extract_schema_version("article_vX_1.0"), "0");
        // missing fractional part → legacy
        assert_eq!(extract_schema_version("article_v1_1700000000"), "0");
    }

    #[test]
    fn schema_match_is_anchored_to_last_suffix() {
        // A logical name that itself contains `_v<digit>` must not confuse
        // the codec: the trailing suffix wins.
        let name = version_name("catalog_v2", "3", at(1_700_000_000, 0));
        assert_eq!(extract_schema_version(&name), "3");
    }

    #[test]
    fn timestamp_of_garbage_is_zero() {
        assert!(version_timestamp("article").abs() < f64::EPSILON);
        assert!(version_timestamp("article_vX_notanumber").abs() < f64::EPSILON);
    }

    #[test]
    fn timestamp_orders_versions() {
        let older = version_name("user", "1", at(1_700_000_000, 0));
        let newer = version_name("user", "1", at(1_700_000_000, 1));
        assert!(version_timestamp(&older) < version_timestamp(&newer));
    }

    #[test]
    fn is_version_of_requires_full_shape() {
        let name = version_name("user", "1", at(1_700_000_000, 0));
        assert!(is_version_of("user", &name));
        assert!(!is_version_of("user", "user"));
        assert!(!is_version_of("user", "user_snapshot"));
        assert!(!is_version_of("use", &name));
    }

    #[test]
    fn is_version_of_rejects_sibling_logical_indices() {
        let name = version_name("user_profile", "1", at(1_700_000_000, 0));
        assert!(is_version_of("user_profile", &name));
        // `user` must not claim `user_profile`'s versions
        assert!(!is_version_of("user", &name));
    }

    proptest! {
        #[test]
        fn prop_schema_round_trip(
            logical in "[a-z][a-z0-9_]{0,20}",
            schema in r"\d(\.\d){0,3}",
            secs in 1_000_000_000_i64..2_000_000_000,
            micros in 0_u32..1_000_000,
        ) {
            let name = version_name(&logical, &schema, at(secs, micros));
            prop_assert_eq!(extract_schema_version(&name), schema);
            prop_assert!(is_version_of(&logical, &name));
        }
    }
}
