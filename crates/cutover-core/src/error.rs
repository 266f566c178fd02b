//! Error types for the index lifecycle subsystem

use thiserror::Error;

/// Result type alias for cutover operations
pub type Result<T> = std::result::Result<T, CutoverError>;

/// Errors that can occur during index lifecycle and indexing operations
#[derive(Debug, Error)]
pub enum CutoverError {
    /// Network or connection failure talking to the search engine.
    ///
    /// Never retried internally; the caller decides whether to retry.
    #[error("search engine unavailable: {0}")]
    EngineUnavailable(String),

    /// A delete, refresh, or status call targeted a physical index that does
    /// not exist. Call sites that tolerate absence convert this to success.
    #[error("index absent: {0}")]
    IndexAbsent(String),

    /// A document had no resolvable target version: neither the declared
    /// current nor previous schema version matches any live index version.
    /// This is a configuration error and is never silently dropped.
    #[error("schema mismatch for `{type_tag}`: {detail}")]
    SchemaMismatch {
        /// The type tag of the record being indexed
        type_tag: String,
        /// Which schemas were declared vs. which are live
        detail: String,
    },

    /// A search hit or job referenced a type tag with no registry entry
    #[error("unknown type tag: {0}")]
    UnknownTypeTag(String),

    /// Data access failure surfaced by a `RecordStore` implementation
    #[error("record store error: {0}")]
    RecordStore(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CutoverError {
    /// Returns the error type string (for structured logs and JSON surfaces)
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::EngineUnavailable(_) => "ENGINE_UNAVAILABLE",
            Self::IndexAbsent(_) => "INDEX_ABSENT",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::UnknownTypeTag(_) => "UNKNOWN_TYPE_TAG",
            Self::RecordStore(_) => "RECORD_STORE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns whether the error is transient and the operation can be re-driven.
    ///
    /// Indexing writes are idempotent, so re-driving a failed batch after a
    /// transient error is always safe.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::EngineUnavailable(_) | Self::RecordStore(_))
    }
}

/// Convert `IndexAbsent` to success, passing every other outcome through.
///
/// Deletes and prunes targeting an already-absent index are successes by
/// contract, not failures.
pub fn tolerate_absent<T: Default>(result: Result<T>) -> Result<T> {
    match result {
        Err(CutoverError::IndexAbsent(_)) => Ok(T::default()),
        other => other,
    }
}
