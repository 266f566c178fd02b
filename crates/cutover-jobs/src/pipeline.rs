//! Pipeline selection
//!
//! `Reindexer` is the front door for full rebuilds: it owns both pipelines
//! and dispatches per `Config::distributed`, so callers declare the mode
//! once (typically via `CUTOVER_DISTRIBUTED`) instead of wiring a pipeline
//! per call site.

use std::sync::Arc;

use tracing::warn;

use cutover_core::{Config, RegisteredModel, Result};
use cutover_index::{SearchEngine, VersionManager};

use crate::distributed::DistributedIndexing;
use crate::local::LocalIndexing;
use crate::queue::JobQueue;

/// Rebuilds index versions through whichever pipeline the config selects
pub struct Reindexer {
    local: LocalIndexing,
    distributed: Option<DistributedIndexing>,
}

impl Reindexer {
    /// Create a reindexer over the given engine.
    ///
    /// Distributed mode requires both `config.distributed` and a queue
    /// backend; a distributed config without a queue falls back to the
    /// local pipeline with a warning.
    #[must_use]
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        queue: Option<Arc<dyn JobQueue>>,
        config: &Config,
    ) -> Self {
        let distributed = match (queue, config.distributed) {
            (Some(queue), true) => Some(DistributedIndexing::new(engine.clone(), queue, config)),
            (None, true) => {
                warn!("distributed mode configured without a queue backend, rebuilding inline");
                None
            }
            _ => None,
        };
        Self {
            local: LocalIndexing::new(engine, config),
            distributed,
        }
    }

    /// Whether rebuilds fan out over the queue
    #[must_use]
    pub const fn is_distributed(&self) -> bool {
        self.distributed.is_some()
    }

    /// The version manager rebuilds go through
    #[must_use]
    pub const fn manager(&self) -> &VersionManager {
        self.local.manager()
    }

    /// Full rebuild of the model's index through the configured pipeline.
    ///
    /// Inline mode creates, populates, and deploys before returning.
    /// Distributed mode returns as soon as the population and deploy jobs
    /// are enqueued; completion is the queue backend's concern.
    ///
    /// # Errors
    /// Returns the first engine, datastore, or queue error.
    pub fn rebuild(&self, model: &RegisteredModel) -> Result<String> {
        match &self.distributed {
            Some(pipeline) => pipeline.rebuild(model),
            None => self.local.rebuild(model, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    // Use the externally-built crate so types line up with the ones
    // `cutover_test_helpers` links against (dev-dependency cycle).
    use cutover_jobs::{Reindexer, Worker};
    use cutover_core::{ModelConfig, ModelRegistry};
    use cutover_test_helpers::{MemoryEngine, MemoryQueue, MemoryStore};
    use serde_json::json;

    fn registry() -> (Arc<MemoryStore>, Arc<ModelRegistry>) {
        let store = Arc::new(MemoryStore::new());
        store.insert("1", json!({"id": "1"}));
        store.insert("2", json!({"id": "2"}));
        let mut registry = ModelRegistry::new();
        registry.register(
            ModelConfig::new("article").schema_versions("1", None),
            store.clone(),
        );
        (store, Arc::new(registry))
    }

    #[test]
    fn inline_mode_rebuilds_synchronously() {
        let (_store, registry) = registry();
        let engine = Arc::new(MemoryEngine::new());
        let queue = Arc::new(MemoryQueue::new());
        let reindexer = Reindexer::new(
            engine.clone(),
            Some(queue.clone()),
            &Config {
                distributed: false,
                ..Config::default()
            },
        );
        assert!(!reindexer.is_distributed());

        let version = reindexer.rebuild(registry.get("article").unwrap()).unwrap();
        // everything happened inline; the queue saw nothing
        assert_eq!(engine.doc_count(&version), 2);
        assert!(queue.is_empty());
        assert_eq!(
            reindexer.manager().current_version("article").unwrap(),
            Some(version)
        );
    }

    #[test]
    fn distributed_mode_dispatches_to_the_queue() {
        let (_store, registry) = registry();
        let engine = Arc::new(MemoryEngine::new());
        let queue = Arc::new(MemoryQueue::new());
        let config = Config {
            distributed: true,
            ..Config::default()
        };
        let reindexer = Reindexer::new(engine.clone(), Some(queue.clone()), &config);
        assert!(reindexer.is_distributed());

        let version = reindexer.rebuild(registry.get("article").unwrap()).unwrap();
        // nothing written until workers run the enqueued jobs
        assert_eq!(engine.doc_count(&version), 0);
        assert_eq!(queue.len(), 2); // one population batch + deploy

        let worker = Worker::new(registry, engine.clone(), &config);
        queue.run_all(&worker).unwrap();
        assert_eq!(engine.doc_count(&version), 2);
    }

    #[test]
    fn distributed_without_queue_falls_back_inline() {
        let (_store, registry) = registry();
        let engine = Arc::new(MemoryEngine::new());
        let reindexer = Reindexer::new(
            engine.clone(),
            None,
            &Config {
                distributed: true,
                ..Config::default()
            },
        );
        assert!(!reindexer.is_distributed());

        let version = reindexer.rebuild(registry.get("article").unwrap()).unwrap();
        assert_eq!(engine.doc_count(&version), 2);
    }
}
