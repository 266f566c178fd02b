//! Job execution
//!
//! One `Worker` executes any [`ReindexJob`]. Execution always re-reads the
//! datastore: a job enqueued before a record changed still indexes the
//! record's state as of execution time, which is what makes duplicate and
//! out-of-order deliveries converge.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use cutover_core::{Config, ModelRegistry, Result};
use cutover_index::{IndexOptions, RecordIndexer, SearchEngine, VersionManager};

use crate::job::ReindexJob;

/// Executes reindex jobs against the engine and datastore
pub struct Worker {
    registry: Arc<ModelRegistry>,
    engine: Arc<dyn SearchEngine>,
    indexer: RecordIndexer,
}

impl Worker {
    /// Create a worker over the given registry and engine
    #[must_use]
    pub fn new(
        registry: Arc<ModelRegistry>,
        engine: Arc<dyn SearchEngine>,
        config: &Config,
    ) -> Self {
        let indexer = RecordIndexer::new(engine.clone(), config);
        Self {
            registry,
            engine,
            indexer,
        }
    }

    /// The version manager the worker resolves versions through
    #[must_use]
    pub const fn manager(&self) -> &VersionManager {
        self.indexer.manager()
    }

    /// Execute one job to completion.
    ///
    /// # Errors
    /// Returns the first engine, datastore, or configuration error. The
    /// queue backend decides whether to retry, per the job's policy.
    pub fn perform(&self, job: &ReindexJob) -> Result<()> {
        debug!(kind = ?job.kind(), "performing job");
        match job {
            ReindexJob::IndexBatch {
                type_tag,
                ids,
                version,
            } => self.index_batch(type_tag, ids, version),
            ReindexJob::Reconcile { type_tag, ids } => self.reconcile(type_tag, ids),
            ReindexJob::RemoveDocuments { type_tag, ids } => self.remove_documents(type_tag, ids),
            ReindexJob::Deploy {
                logical,
                version,
                prune,
            } => {
                self.manager().deploy(logical, version)?;
                if *prune {
                    self.manager().prune(logical)?;
                }
                Ok(())
            }
            ReindexJob::Retire {
                logical,
                version,
                prune,
            } => self.manager().retire(logical, version, *prune),
        }
    }

    /// Fetch a batch of records and write them to one explicit version.
    /// Ids no longer in the datastore are skipped; population never
    /// resurrects deleted records.
    fn index_batch(&self, type_tag: &str, ids: &[String], version: &str) -> Result<()> {
        let model = self.registry.get(type_tag)?;
        let records = model.store.find_by_ids(ids)?;
        let opts = IndexOptions::target(version);
        if self.engine.supports_bulk() {
            self.engine.bulk(&mut |session| {
                for record in &records {
                    self.indexer
                        .index_record(&model.config, record.as_ref(), &opts, Some(session))?;
                }
                Ok(())
            })?;
        } else {
            for record in &records {
                self.indexer
                    .index_record(&model.config, record.as_ref(), &opts, None)?;
            }
        }
        info!(
            type_tag,
            version,
            requested = ids.len(),
            indexed = records.len(),
            "indexed batch"
        );
        Ok(())
    }

    /// Re-check ids against the datastore: present records are reindexed
    /// into their resolved live version(s), vanished ids are deleted.
    fn reconcile(&self, type_tag: &str, ids: &[String]) -> Result<()> {
        let model = self.registry.get(type_tag)?;
        let records = model.store.find_by_ids(ids)?;
        let found: HashSet<String> = records.iter().map(|r| r.record_id()).collect();
        let opts = IndexOptions::default();
        for record in &records {
            self.indexer
                .index_record(&model.config, record.as_ref(), &opts, None)?;
        }
        let mut removed = 0;
        for id in ids {
            if !found.contains(id) {
                self.indexer.delete_record(&model.config, id, &opts, None)?;
                removed += 1;
            }
        }
        info!(
            type_tag,
            reindexed = records.len(),
            removed,
            "reconciled records"
        );
        Ok(())
    }

    fn remove_documents(&self, type_tag: &str, ids: &[String]) -> Result<()> {
        let model = self.registry.get(type_tag)?;
        let opts = IndexOptions::default();
        for id in ids {
            self.indexer.delete_record(&model.config, id, &opts, None)?;
        }
        info!(type_tag, removed = ids.len(), "removed documents");
        Ok(())
    }
}
