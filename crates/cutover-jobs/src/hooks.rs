//! Live save/delete hooks
//!
//! The application calls these from its persistence layer after a record is
//! saved or destroyed. Behavior follows the model's [`UpdatePolicy`]: write
//! synchronously, write and refresh, enqueue a reconciliation job, or do
//! nothing.

use std::sync::Arc;

use tracing::warn;

use cutover_core::{Config, ModelConfig, Record, Result, UpdatePolicy};
use cutover_index::{IndexOptions, RecordIndexer, SearchEngine};

use crate::job::ReindexJob;
use crate::queue::JobQueue;

/// Dispatches record save/delete events to the index or the queue
pub struct LiveHooks {
    indexer: RecordIndexer,
    queue: Option<Arc<dyn JobQueue>>,
}

impl LiveHooks {
    /// Create hooks over the given engine. Without a queue backend,
    /// `Enqueue`-policy models fall back to synchronous writes.
    #[must_use]
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        queue: Option<Arc<dyn JobQueue>>,
        config: &Config,
    ) -> Self {
        Self {
            indexer: RecordIndexer::new(engine, config),
            queue,
        }
    }

    /// React to a record having been saved.
    ///
    /// # Errors
    /// Returns the engine or queue error; the save itself has already
    /// committed, so callers typically log and move on.
    pub fn record_saved(&self, model: &ModelConfig, record: &dyn Record) -> Result<()> {
        match model.update_policy {
            UpdatePolicy::Disabled => Ok(()),
            UpdatePolicy::Immediate => self.write(model, record, false),
            UpdatePolicy::ImmediateWithRefresh => self.write(model, record, true),
            UpdatePolicy::Enqueue => match &self.queue {
                Some(queue) => queue.enqueue(ReindexJob::Reconcile {
                    type_tag: model.type_tag.clone(),
                    ids: vec![record.record_id()],
                }),
                None => {
                    warn!(
                        type_tag = %model.type_tag,
                        "enqueue policy without a queue backend, writing synchronously"
                    );
                    self.write(model, record, false)
                }
            },
        }
    }

    /// React to a record having been destroyed.
    pub fn record_deleted(&self, model: &ModelConfig, id: &str) -> Result<()> {
        match model.update_policy {
            UpdatePolicy::Disabled => Ok(()),
            UpdatePolicy::Immediate => self.delete(model, id, false),
            UpdatePolicy::ImmediateWithRefresh => self.delete(model, id, true),
            UpdatePolicy::Enqueue => match &self.queue {
                Some(queue) => queue.enqueue(ReindexJob::RemoveDocuments {
                    type_tag: model.type_tag.clone(),
                    ids: vec![id.to_owned()],
                }),
                None => {
                    warn!(
                        type_tag = %model.type_tag,
                        "enqueue policy without a queue backend, deleting synchronously"
                    );
                    self.delete(model, id, false)
                }
            },
        }
    }

    fn write(&self, model: &ModelConfig, record: &dyn Record, refresh: bool) -> Result<()> {
        let opts = IndexOptions {
            target_version: None,
            refresh,
        };
        self.indexer.index_record(model, record, &opts, None)?;
        Ok(())
    }

    fn delete(&self, model: &ModelConfig, id: &str, refresh: bool) -> Result<()> {
        let opts = IndexOptions {
            target_version: None,
            refresh,
        };
        self.indexer.delete_record(model, id, &opts, None)?;
        Ok(())
    }
}
