//! Per-record indexer
//!
//! Serializes one domain record into the index versions currently in flight.
//! During a schema migration up to two versions are live at once; which
//! version receives which serialization format is a pure decision function
//! over (declared schemas, live version schemas), unit-testable without any
//! engine connection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use cutover_core::{
    Config, CutoverError, DocFormat, Document, ModelConfig, Record, Result,
    model::DualWritePolicy, extract_schema_version, version_timestamp,
};

use crate::admin::VersionManager;
use crate::gateway::{BulkSession, SearchEngine, WriteOptions};

/// A live physical version and its schema tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveVersion {
    /// Physical version name
    pub name: String,
    /// Schema tag extracted from the name
    pub schema: String,
}

impl LiveVersion {
    /// Derive a live version from a physical name via the codec
    #[must_use]
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let schema = extract_schema_version(&name);
        Self { name, schema }
    }
}

/// One planned write: a version and the format it receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTarget {
    /// Physical version to write to
    pub version: String,
    /// Serialization format for this version
    pub format: DocFormat,
}

/// Decide which live versions receive which serialization format.
///
/// `live` holds up to the two most recent versions of the model's logical
/// index. Under [`DualWritePolicy::SchemaMatch`], a version whose schema
/// equals the declared current schema takes the current format and one
/// matching the declared previous schema takes the legacy format; versions
/// matching neither are skipped. Under [`DualWritePolicy::CurrentOnly`] the
/// newest version takes the current format and nothing else is written.
///
/// # Errors
/// Returns `SchemaMismatch` when no live version is a valid target — a
/// configuration error, never silently dropped.
pub fn plan_writes(config: &ModelConfig, live: &[LiveVersion]) -> Result<Vec<WriteTarget>> {
    let targets: Vec<WriteTarget> = match config.dual_write {
        DualWritePolicy::CurrentOnly => live
            .iter()
            .max_by(|a, b| version_timestamp(&a.name).total_cmp(&version_timestamp(&b.name)))
            .map(|newest| WriteTarget {
                version: newest.name.clone(),
                format: DocFormat::Current,
            })
            .into_iter()
            .collect(),
        DualWritePolicy::SchemaMatch => live
            .iter()
            .filter_map(|version| {
                if version.schema == config.current_schema_version {
                    Some(WriteTarget {
                        version: version.name.clone(),
                        format: DocFormat::Current,
                    })
                } else if config.previous_schema_version.as_deref() == Some(&version.schema) {
                    Some(WriteTarget {
                        version: version.name.clone(),
                        format: DocFormat::Legacy,
                    })
                } else {
                    None
                }
            })
            .collect(),
    };

    if targets.is_empty() {
        let live_schemas: Vec<&str> = live.iter().map(|v| v.schema.as_str()).collect();
        return Err(CutoverError::SchemaMismatch {
            type_tag: config.type_tag.clone(),
            detail: format!(
                "declared current {:?} previous {:?}, live {live_schemas:?}",
                config.current_schema_version, config.previous_schema_version
            ),
        });
    }
    Ok(targets)
}

/// Time-boxed cache of per-logical-index schema readiness.
///
/// "Ready" means the version behind the current alias already carries the
/// declared target schema, i.e. the migration has landed and legacy-format
/// writes can stop. The answer is refreshed from the engine at most once per
/// interval; a stale read may route writes against the wrong alias window
/// for up to that interval, which is an accepted consistency relaxation.
pub struct SchemaReadiness {
    interval: Duration,
    entries: Mutex<HashMap<String, ReadinessEntry>>,
}

struct ReadinessEntry {
    checked_at: Instant,
    ready: bool,
}

impl SchemaReadiness {
    /// Create a cache with the given refresh interval
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached readiness for `logical`, invoking `probe` only when
    /// the cached answer is older than the interval (or absent).
    ///
    /// # Errors
    /// Propagates the probe's error without caching it.
    pub fn check(&self, logical: &str, probe: impl FnOnce() -> Result<bool>) -> Result<bool> {
        {
            let entries = self.entries.lock().expect("readiness lock poisoned");
            if let Some(entry) = entries.get(logical) {
                if entry.checked_at.elapsed() < self.interval {
                    return Ok(entry.ready);
                }
            }
        }
        let ready = probe()?;
        let mut entries = self.entries.lock().expect("readiness lock poisoned");
        entries.insert(
            logical.to_owned(),
            ReadinessEntry {
                checked_at: Instant::now(),
                ready,
            },
        );
        Ok(ready)
    }

    /// Drop the cached answer for one logical index
    pub fn invalidate(&self, logical: &str) {
        self.entries
            .lock()
            .expect("readiness lock poisoned")
            .remove(logical);
    }
}

/// Options for a single record index/delete operation
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Write only to this version, in the current format. Used by background
    /// population, which always targets one specific version.
    pub target_version: Option<String>,
    /// Force a refresh of the written version(s). Ignored for writes going
    /// through a bulk session — batch callers refresh once at the end.
    pub refresh: bool,
}

impl IndexOptions {
    /// Options targeting one explicit version, no refresh
    #[must_use]
    pub fn target(version: impl Into<String>) -> Self {
        Self {
            target_version: Some(version.into()),
            refresh: false,
        }
    }

    /// Options with a forced refresh
    #[must_use]
    pub const fn refreshed() -> Self {
        Self {
            target_version: None,
            refresh: true,
        }
    }
}

/// Writes and deletes single records against the live index versions
pub struct RecordIndexer {
    engine: Arc<dyn SearchEngine>,
    manager: VersionManager,
    readiness: SchemaReadiness,
}

impl RecordIndexer {
    /// Create an indexer over the given engine, using the config's
    /// schema-readiness check interval.
    #[must_use]
    pub fn new(engine: Arc<dyn SearchEngine>, config: &Config) -> Self {
        let manager = VersionManager::new(engine.clone());
        Self {
            engine,
            manager,
            readiness: SchemaReadiness::new(config.schema_check_interval),
        }
    }

    /// The version manager this indexer resolves live versions through
    #[must_use]
    pub const fn manager(&self) -> &VersionManager {
        &self.manager
    }

    /// Serialize `record` and write it to its resolved target version(s).
    ///
    /// With an explicit `opts.target_version` only that version is written,
    /// in the current format. Otherwise the two most recent live versions
    /// are resolved and routed through [`plan_writes`]; the legacy
    /// serialization is computed lazily, only when some target needs it.
    /// Returns the version names written.
    ///
    /// # Errors
    /// `SchemaMismatch` when no live version is a valid target, or any
    /// engine error.
    pub fn index_record(
        &self,
        model: &ModelConfig,
        record: &dyn Record,
        opts: &IndexOptions,
        mut bulk: Option<&mut BulkSession>,
    ) -> Result<Vec<String>> {
        let targets = self.targets_for(model, opts)?;
        let id = record.record_id();
        let current_body = record.indexed_attributes();
        let mut legacy_body: Option<Value> = None;

        let mut written = Vec::with_capacity(targets.len());
        for target in &targets {
            let body = match target.format {
                DocFormat::Current => current_body.clone(),
                DocFormat::Legacy => legacy_body
                    .get_or_insert_with(|| record.legacy_indexed_attributes())
                    .clone(),
            };
            let doc = Document::new(id.clone(), model.type_tag.clone(), body);
            match bulk.as_deref_mut() {
                Some(session) => session.write_document(&target.version, doc),
                None => self.engine.write_document(
                    &doc,
                    &WriteOptions {
                        index: target.version.clone(),
                        refresh: false,
                    },
                )?,
            }
            written.push(target.version.clone());
        }

        if opts.refresh && bulk.is_none() {
            for version in &written {
                self.engine.refresh(version)?;
            }
        }
        debug!(type_tag = %model.type_tag, id = %id, versions = ?written, "indexed record");
        Ok(written)
    }

    /// Delete the document with `id` from the resolved target version(s),
    /// with the same version-resolution and refresh semantics as
    /// [`Self::index_record`].
    pub fn delete_record(
        &self,
        model: &ModelConfig,
        id: &str,
        opts: &IndexOptions,
        mut bulk: Option<&mut BulkSession>,
    ) -> Result<Vec<String>> {
        let targets = self.targets_for(model, opts)?;
        let mut deleted = Vec::with_capacity(targets.len());
        for target in &targets {
            match bulk.as_deref_mut() {
                Some(session) => session.delete_document(&target.version, &model.type_tag, id),
                None => self
                    .engine
                    .delete_document(&target.version, &model.type_tag, id)?,
            }
            deleted.push(target.version.clone());
        }
        if opts.refresh && bulk.is_none() {
            for version in &deleted {
                self.engine.refresh(version)?;
            }
        }
        debug!(type_tag = %model.type_tag, id, versions = ?deleted, "deleted record from index");
        Ok(deleted)
    }

    fn targets_for(&self, model: &ModelConfig, opts: &IndexOptions) -> Result<Vec<WriteTarget>> {
        if let Some(version) = &opts.target_version {
            return Ok(vec![WriteTarget {
                version: version.clone(),
                format: DocFormat::Current,
            }]);
        }

        let versions = self.manager.list_versions(&model.index_name)?;
        let live: Vec<LiveVersion> = versions
            .iter()
            .rev()
            .take(2)
            .map(|name| LiveVersion::from_name(name.clone()))
            .collect();
        let mut plan = plan_writes(model, &live)?;

        // Once the current alias serves the target schema the migration has
        // settled and legacy-format writes stop. The readiness answer is the
        // only deliberately stale read in the system.
        if model.previous_schema_version.is_some()
            && plan.iter().any(|t| t.format == DocFormat::Legacy)
        {
            let logical = model.index_name.clone();
            let target_schema = model.current_schema_version.clone();
            let ready = self.readiness.check(&model.index_name, || {
                let live_schema = self.manager.current_schema_version(&logical)?;
                Ok(live_schema == target_schema)
            })?;
            if ready && plan.iter().any(|t| t.format == DocFormat::Current) {
                plan.retain(|t| t.format == DocFormat::Current);
            } else if ready {
                warn!(
                    logical = %model.index_name,
                    "current alias reports target schema but no live target matches; keeping dual write"
                );
            }
        }
        Ok(plan)
    }
}
