//! Model registry
//!
//! Maps each type tag to its configuration and record store. Populated once
//! at startup; looking up an unregistered tag is a named error, never a
//! runtime reflection into the type system.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{CutoverError, Result};
use crate::model::{ModelConfig, Record, RecordStore};

/// A search hit reduced to what hit mapping needs: which type, which record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitId {
    /// Type discriminator from the hit's document
    pub type_tag: String,
    /// Record primary key from the hit's document
    pub id: String,
}

/// One registered domain type
pub struct RegisteredModel {
    /// Immutable per-type indexing configuration
    pub config: ModelConfig,
    /// The type's datastore access
    pub store: Arc<dyn RecordStore>,
}

impl std::fmt::Debug for RegisteredModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredModel")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Registry of every domain type that participates in indexing
#[derive(Default)]
pub struct ModelRegistry {
    models: HashMap<String, RegisteredModel>,
}

impl ModelRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type. Re-registering a tag replaces the previous entry.
    pub fn register(&mut self, config: ModelConfig, store: Arc<dyn RecordStore>) {
        let tag = config.type_tag.clone();
        if self
            .models
            .insert(tag.clone(), RegisteredModel { config, store })
            .is_some()
        {
            debug!(type_tag = %tag, "replaced existing model registration");
        }
    }

    /// Look up a registered type by tag.
    ///
    /// # Errors
    /// Returns `CutoverError::UnknownTypeTag` when the tag was never
    /// registered.
    pub fn get(&self, type_tag: &str) -> Result<&RegisteredModel> {
        self.models
            .get(type_tag)
            .ok_or_else(|| CutoverError::UnknownTypeTag(type_tag.to_owned()))
    }

    /// Iterate over all registered models
    pub fn models(&self) -> impl Iterator<Item = &RegisteredModel> {
        self.models.values()
    }

    /// Number of registered types
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Remove every registration
    pub fn clear(&mut self) {
        self.models.clear();
    }

    /// Load the records behind a ranked list of search hits.
    ///
    /// Hits are grouped by type tag so each store is queried once, then the
    /// fetched records are reordered to match the hit ranking. Hits whose
    /// record has vanished from the datastore are skipped: the engine may
    /// serve a hit for a record deleted after the last index write, and that
    /// is not an error.
    ///
    /// # Errors
    /// Returns `CutoverError::UnknownTypeTag` for a hit naming an
    /// unregistered type, or a store error.
    pub fn load_hits(&self, hits: &[HitId]) -> Result<Vec<Box<dyn Record>>> {
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        // One fetch per type tag, preserving first-seen tag order
        let mut ids_by_tag: Vec<(&str, Vec<String>)> = Vec::new();
        for hit in hits {
            match ids_by_tag.iter_mut().find(|(tag, _)| *tag == hit.type_tag) {
                Some((_, ids)) => ids.push(hit.id.clone()),
                None => ids_by_tag.push((&hit.type_tag, vec![hit.id.clone()])),
            }
        }

        let mut fetched: HashMap<(String, String), Box<dyn Record>> = HashMap::new();
        for (tag, ids) in ids_by_tag {
            let entry = self.get(tag)?;
            for record in entry.store.find_by_ids(&ids)? {
                fetched.insert((tag.to_owned(), record.record_id()), record);
            }
        }

        // Reorder to hit ranking; vanished records drop out
        let mut ranked = Vec::with_capacity(hits.len());
        for hit in hits {
            if let Some(record) = fetched.remove(&(hit.type_tag.clone(), hit.id.clone())) {
                ranked.push(record);
            }
        }
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    struct FakeRecord {
        id: String,
    }

    impl Record for FakeRecord {
        fn record_id(&self) -> String {
            self.id.clone()
        }

        fn indexed_attributes(&self) -> Value {
            json!({"id": self.id})
        }
    }

    /// Store holding a fixed id set; records outside it "vanished"
    struct FakeStore {
        existing: Vec<String>,
        fetches: Mutex<usize>,
    }

    impl FakeStore {
        fn with_ids(ids: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                existing: ids.iter().map(|s| (*s).to_owned()).collect(),
                fetches: Mutex::new(0),
            })
        }
    }

    impl RecordStore for FakeStore {
        fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Box<dyn Record>>> {
            *self.fetches.lock().expect("fetch counter") += 1;
            Ok(ids
                .iter()
                .filter(|id| self.existing.contains(id))
                .map(|id| Box::new(FakeRecord { id: id.clone() }) as Box<dyn Record>)
                .collect())
        }

        fn find_in_batches(
            &self,
            batch_size: usize,
            visit: &mut dyn FnMut(Vec<Box<dyn Record>>) -> Result<()>,
        ) -> Result<()> {
            for chunk in self.existing.chunks(batch_size) {
                let batch = chunk
                    .iter()
                    .map(|id| Box::new(FakeRecord { id: id.clone() }) as Box<dyn Record>)
                    .collect();
                visit(batch)?;
            }
            Ok(())
        }

        fn total_count(&self) -> Result<usize> {
            Ok(self.existing.len())
        }
    }

    fn hit(tag: &str, id: &str) -> HitId {
        HitId {
            type_tag: tag.to_owned(),
            id: id.to_owned(),
        }
    }

    #[test]
    fn register_and_get() {
        let mut registry = ModelRegistry::new();
        assert!(registry.is_empty());
        registry.register(ModelConfig::new("article"), FakeStore::with_ids(&["1"]));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("article").unwrap().config.type_tag, "article");
    }

    #[test]
    fn unknown_tag_is_named_error() {
        let registry = ModelRegistry::new();
        let err = registry.get("widget").unwrap_err();
        assert_eq!(err.error_type(), "UNKNOWN_TYPE_TAG");
        assert!(err.to_string().contains("widget"));
    }

    #[test]
    fn re_registration_replaces() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelConfig::new("article"), FakeStore::with_ids(&[]));
        registry.register(
            ModelConfig::new("article").index_name("content"),
            FakeStore::with_ids(&[]),
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("article").unwrap().config.index_name, "content");
    }

    #[test]
    fn clear_empties_registry() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelConfig::new("a"), FakeStore::with_ids(&[]));
        registry.register(ModelConfig::new("b"), FakeStore::with_ids(&[]));
        assert_eq!(registry.len(), 2);
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn load_hits_preserves_ranking() {
        let mut registry = ModelRegistry::new();
        registry.register(
            ModelConfig::new("article"),
            FakeStore::with_ids(&["1", "2", "3"]),
        );

        let ranked = registry
            .load_hits(&[hit("article", "3"), hit("article", "1"), hit("article", "2")])
            .unwrap();
        let ids: Vec<String> = ranked.iter().map(|r| r.record_id()).collect();
        assert_eq!(ids, ["3", "1", "2"]);
    }

    #[test]
    fn load_hits_batches_one_fetch_per_type() {
        let mut registry = ModelRegistry::new();
        let articles = FakeStore::with_ids(&["1", "2"]);
        let users = FakeStore::with_ids(&["9"]);
        registry.register(ModelConfig::new("article"), articles.clone());
        registry.register(ModelConfig::new("user"), users.clone());

        let ranked = registry
            .load_hits(&[hit("article", "1"), hit("user", "9"), hit("article", "2")])
            .unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(*articles.fetches.lock().unwrap(), 1);
        assert_eq!(*users.fetches.lock().unwrap(), 1);
    }

    #[test]
    fn load_hits_skips_vanished_records() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelConfig::new("article"), FakeStore::with_ids(&["1", "3"]));

        let ranked = registry
            .load_hits(&[hit("article", "1"), hit("article", "2"), hit("article", "3")])
            .unwrap();
        let ids: Vec<String> = ranked.iter().map(|r| r.record_id()).collect();
        assert_eq!(ids, ["1", "3"]);
    }

    #[test]
    fn load_hits_unknown_tag_fails() {
        let registry = ModelRegistry::new();
        let err = registry.load_hits(&[hit("ghost", "1")]).unwrap_err();
        assert_eq!(err.error_type(), "UNKNOWN_TYPE_TAG");
    }

    #[test]
    fn load_hits_empty_input() {
        let registry = ModelRegistry::new();
        assert!(registry.load_hits(&[]).unwrap().is_empty());
    }
}
