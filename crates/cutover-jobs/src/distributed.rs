//! Queue-backed index population
//!
//! Splits population into `IndexBatch` jobs carrying ids only, so the heavy
//! work fans out across worker processes. The queue gives no ordering
//! guarantee between queues or concurrent workers: the deploy job may run
//! while population batches are still in flight. That is safe — batches
//! target the physical version by name, not through the alias, so late
//! batches land in the deployed version. Operators who need a fully
//! populated index before cutover deploy explicitly after the queue drains.

use std::sync::Arc;

use tracing::info;

use cutover_core::{Config, RegisteredModel, Result};
use cutover_index::{SearchEngine, VersionManager};

use crate::job::ReindexJob;
use crate::queue::JobQueue;

/// Fans index population out over a queue backend
pub struct DistributedIndexing {
    queue: Arc<dyn JobQueue>,
    manager: VersionManager,
    batch_size: usize,
}

impl DistributedIndexing {
    /// Create a distributed pipeline over the given engine and queue
    #[must_use]
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        queue: Arc<dyn JobQueue>,
        config: &Config,
    ) -> Self {
        Self {
            queue,
            manager: VersionManager::new(engine),
            batch_size: config.batch_size,
        }
    }

    /// The version manager this pipeline creates versions through
    #[must_use]
    pub const fn manager(&self) -> &VersionManager {
        &self.manager
    }

    /// Enqueue one `IndexBatch` job per datastore batch, targeting
    /// `version`. Returns the number of jobs enqueued.
    ///
    /// # Errors
    /// Stops at the first datastore or queue error; jobs already enqueued
    /// will run and are harmless to re-enqueue.
    pub fn enqueue_population(&self, model: &RegisteredModel, version: &str) -> Result<usize> {
        let mut jobs = 0usize;
        model.store.find_in_batches(self.batch_size, &mut |batch| {
            let ids: Vec<String> = batch.iter().map(|r| r.record_id()).collect();
            self.queue.enqueue(ReindexJob::IndexBatch {
                type_tag: model.config.type_tag.clone(),
                ids,
                version: version.to_owned(),
            })?;
            jobs += 1;
            Ok(())
        })?;
        info!(type_tag = %model.config.type_tag, version, jobs, "enqueued population");
        Ok(jobs)
    }

    /// Distributed rebuild: create a fresh version, enqueue its population,
    /// then enqueue a no-prune deploy. Returns the new version name.
    ///
    /// Pruning is deliberately left out of the enqueued deploy: with batches
    /// possibly still in flight, pruning belongs to a later, explicit step.
    ///
    /// # Errors
    /// Returns the first engine, datastore, or queue error.
    pub fn rebuild(&self, model: &RegisteredModel) -> Result<String> {
        let version = self.manager.create_version(&model.config)?;
        let jobs = self.enqueue_population(model, &version)?;
        self.queue.enqueue(ReindexJob::Deploy {
            logical: model.config.index_name.clone(),
            version: version.clone(),
            prune: false,
        })?;
        info!(
            type_tag = %model.config.type_tag,
            version,
            population_jobs = jobs,
            "enqueued distributed rebuild"
        );
        Ok(version)
    }
}
