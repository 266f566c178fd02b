//! In-process index population
//!
//! Builds a new version by streaming the datastore in batches on the calling
//! thread. The blocking equivalent of [`DistributedIndexing`](crate::DistributedIndexing):
//! same create → populate → deploy sequence, no queue backend required.

use std::sync::Arc;

use tracing::{debug, info};

use cutover_core::{Config, RegisteredModel, Result};
use cutover_index::{IndexOptions, RecordIndexer, SearchEngine, VersionManager};

/// Populates and deploys index versions synchronously
pub struct LocalIndexing {
    engine: Arc<dyn SearchEngine>,
    indexer: RecordIndexer,
    batch_size: usize,
}

impl LocalIndexing {
    /// Create a local indexing pipeline over the given engine
    #[must_use]
    pub fn new(engine: Arc<dyn SearchEngine>, config: &Config) -> Self {
        let indexer = RecordIndexer::new(engine.clone(), config);
        Self {
            engine,
            indexer,
            batch_size: config.batch_size,
        }
    }

    /// The version manager this pipeline creates and deploys through
    #[must_use]
    pub const fn manager(&self) -> &VersionManager {
        self.indexer.manager()
    }

    /// Stream every record of the model into `version`, one bulk flush per
    /// batch, then refresh once. Returns the number of records indexed.
    ///
    /// # Errors
    /// Stops at the first datastore or engine error; the version is left
    /// partially populated and safe to repopulate from scratch.
    pub fn populate_version(&self, model: &RegisteredModel, version: &str) -> Result<usize> {
        let total = model.store.total_count()?;
        info!(type_tag = %model.config.type_tag, version, total, "populating index version");
        let opts = IndexOptions::target(version);
        let mut indexed = 0usize;
        model.store.find_in_batches(self.batch_size, &mut |batch| {
            if self.engine.supports_bulk() {
                self.engine.bulk(&mut |session| {
                    for record in &batch {
                        self.indexer.index_record(
                            &model.config,
                            record.as_ref(),
                            &opts,
                            Some(session),
                        )?;
                    }
                    Ok(())
                })?;
            } else {
                for record in &batch {
                    self.indexer
                        .index_record(&model.config, record.as_ref(), &opts, None)?;
                }
            }
            indexed += batch.len();
            debug!(version, indexed, total, "population progress");
            Ok(())
        })?;
        self.engine.refresh(version)?;
        Ok(indexed)
    }

    /// Full local rebuild: create a fresh version, populate it, deploy it,
    /// and optionally prune the versions it displaced. Returns the new
    /// version name.
    ///
    /// # Errors
    /// A failure before the deploy leaves live traffic on the old version;
    /// the orphaned new version is cleaned up by the next prune.
    pub fn rebuild(&self, model: &RegisteredModel, prune: bool) -> Result<String> {
        let version = self.manager().create_version(&model.config)?;
        self.populate_version(model, &version)?;
        self.manager().deploy(&model.config.index_name, &version)?;
        if prune {
            self.manager().prune(&model.config.index_name)?;
        }
        Ok(version)
    }
}
