//! Per-type model configuration and the datastore boundary traits
//!
//! `ModelConfig` is produced once at type-registration time and stays
//! immutable afterwards; every indexing operation receives it by reference.
//! `Record` and `RecordStore` are implemented by the application's ORM layer,
//! so the lifecycle machinery never depends on a concrete datastore.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::version::DEFAULT_SCHEMA_VERSION;

/// How the index reacts when a record is saved or destroyed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// No hook fires; the index is only touched by explicit reindexing
    Disabled,
    /// Write synchronously without forcing a refresh. Changes may take up to
    /// the engine's refresh interval (~1s) to become searchable.
    #[default]
    Immediate,
    /// Write synchronously and force a refresh. Stronger visibility
    /// guarantee, higher latency on the save path.
    ImmediateWithRefresh,
    /// Enqueue a reconciliation job instead of writing synchronously.
    /// Recommended when a queue backend is configured.
    Enqueue,
}

/// How writes are routed when two index versions are live at once.
///
/// Which of "legacy document still needed" and "both versions carry the same
/// schema" wins is a per-type policy, not a hardcoded assumption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DualWritePolicy {
    /// Write to every live version whose schema matches the declared current
    /// or previous schema version, in the matching format.
    #[default]
    SchemaMatch,
    /// Write the current format to the newest live version only. Covers
    /// mapping-only rebuilds where both versions share one schema.
    CurrentOnly,
}

/// Immutable indexing configuration for one domain type
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Type discriminator stored on every document of this type
    pub type_tag: String,
    /// The logical index this type's documents live in
    pub index_name: String,
    /// Live save/delete hook behavior
    pub update_policy: UpdatePolicy,
    /// Engine settings passed verbatim at version creation
    pub index_settings: Value,
    /// Optional field mapping applied to each new version
    pub mapping: Option<Value>,
    /// Schema version of `indexed_attributes` output
    pub current_schema_version: String,
    /// Schema version of `legacy_indexed_attributes` output, when a previous
    /// format is still being written during a migration
    pub previous_schema_version: Option<String>,
    /// Routing policy while two versions are live
    pub dual_write: DualWritePolicy,
}

impl ModelConfig {
    /// Create a configuration with defaults: the logical index is named after
    /// the type tag, updates are `Immediate`, schema version is `"0"`.
    #[must_use]
    pub fn new(type_tag: impl Into<String>) -> Self {
        let type_tag = type_tag.into();
        Self {
            index_name: type_tag.clone(),
            type_tag,
            update_policy: UpdatePolicy::default(),
            index_settings: Value::Object(serde_json::Map::new()),
            mapping: None,
            current_schema_version: DEFAULT_SCHEMA_VERSION.to_owned(),
            previous_schema_version: None,
            dual_write: DualWritePolicy::default(),
        }
    }

    /// Override the logical index name
    #[must_use]
    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = name.into();
        self
    }

    /// Set the live-hook update policy
    #[must_use]
    pub const fn update_policy(mut self, policy: UpdatePolicy) -> Self {
        self.update_policy = policy;
        self
    }

    /// Set engine settings for newly created versions
    #[must_use]
    pub fn index_settings(mut self, settings: Value) -> Self {
        self.index_settings = settings;
        self
    }

    /// Declare a field mapping to apply to each new version
    #[must_use]
    pub fn mapping(mut self, mapping: Value) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Declare the current (and optionally previous) schema version
    #[must_use]
    pub fn schema_versions(
        mut self,
        current: impl Into<String>,
        previous: Option<&str>,
    ) -> Self {
        self.current_schema_version = current.into();
        self.previous_schema_version = previous.map(str::to_owned);
        self
    }

    /// Set the dual-write routing policy
    #[must_use]
    pub const fn dual_write(mut self, policy: DualWritePolicy) -> Self {
        self.dual_write = policy;
        self
    }
}

/// One domain record as seen by the indexer.
///
/// Implemented by the ORM layer. `legacy_indexed_attributes` defaults to the
/// current serialization for types that never declared a previous schema.
pub trait Record: Send + Sync {
    /// The record's primary key, string-serialized
    fn record_id(&self) -> String;

    /// Current-format serialization
    fn indexed_attributes(&self) -> Value;

    /// Previous-format serialization, consulted only while a previous schema
    /// version is declared and a matching version is live
    fn legacy_indexed_attributes(&self) -> Value {
        self.indexed_attributes()
    }
}

impl std::fmt::Debug for dyn Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("record_id", &self.record_id())
            .finish_non_exhaustive()
    }
}

/// Batched access to the records of one domain type.
///
/// The datastore is the source of truth at call time: reconciliation relies
/// on `find_by_ids` omitting records that no longer exist.
pub trait RecordStore: Send + Sync {
    /// Fetch records by id. Missing ids are silently omitted.
    ///
    /// # Errors
    /// Returns `CutoverError::RecordStore` on data access failures.
    fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Box<dyn Record>>>;

    /// Enumerate every record in fixed-size batches, invoking `visit` per
    /// batch. Stops early when `visit` returns an error.
    ///
    /// # Errors
    /// Returns `CutoverError::RecordStore` on data access failures, or the
    /// first error returned by `visit`.
    fn find_in_batches(
        &self,
        batch_size: usize,
        visit: &mut dyn FnMut(Vec<Box<dyn Record>>) -> Result<()>,
    ) -> Result<()>;

    /// Total number of records (for progress reporting)
    ///
    /// # Errors
    /// Returns `CutoverError::RecordStore` on data access failures.
    fn total_count(&self) -> Result<usize>;
}
