//! In-memory search engine
//!
//! Mirrors the wire semantics the gateway contract promises: alias-resolving
//! status reads, atomic alias application, auto-created indices on write,
//! idempotent deletes, and a buffered bulk path that flushes exactly once.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;

use cutover_core::{CutoverError, Document, Result};
use cutover_index::{AliasActions, BulkOp, BulkSession, IndexMeta, SearchEngine, SearchHit,
    SearchHits, WriteOptions};

#[derive(Debug, Default)]
struct IndexData {
    settings: Value,
    mappings: BTreeMap<String, Value>,
    docs: BTreeMap<String, Document>,
}

#[derive(Debug, Default)]
struct EngineState {
    indices: BTreeMap<String, IndexData>,
    // alias name → physical index; single-target aliases only
    aliases: BTreeMap<String, String>,
    refreshes: BTreeMap<String, usize>,
    alias_updates: usize,
    fail_next: Option<String>,
}

impl EngineState {
    fn take_failure(&mut self, op: &str) -> Result<()> {
        if self.fail_next.as_deref() == Some(op) {
            self.fail_next = None;
            return Err(CutoverError::EngineUnavailable(format!(
                "injected failure in {op}"
            )));
        }
        Ok(())
    }

    fn apply(&mut self, op: BulkOp) {
        match op {
            BulkOp::Write { index, doc } => {
                let data = self.indices.entry(index).or_default();
                data.docs.insert(doc.id.clone(), doc);
            }
            BulkOp::Delete { index, id, .. } => {
                if let Some(data) = self.indices.get_mut(&index) {
                    data.docs.remove(&id);
                }
            }
        }
    }

    /// Resolve a status target to physical index names
    fn resolve(&self, target: &str) -> Result<Vec<String>> {
        if self.indices.contains_key(target) {
            return Ok(vec![target.to_owned()]);
        }
        if let Some(index) = self.aliases.get(target) {
            return Ok(vec![index.clone()]);
        }
        Err(CutoverError::IndexAbsent(target.to_owned()))
    }

    fn meta(&self, name: &str, data: &IndexData) -> IndexMeta {
        IndexMeta {
            doc_count: data.docs.len(),
            aliases: self
                .aliases
                .iter()
                .filter(|(_, index)| index.as_str() == name)
                .map(|(alias, _)| alias.clone())
                .collect(),
        }
    }
}

/// An in-process stand-in for the search engine
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: Mutex<EngineState>,
}

impl MemoryEngine {
    /// Create an empty engine
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call to the named operation fail with
    /// `EngineUnavailable`. One-shot.
    pub fn fail_next(&self, op: &str) {
        self.lock().fail_next = Some(op.to_owned());
    }

    /// Every physical index name, in lexicographic order
    #[must_use]
    pub fn indices(&self) -> Vec<String> {
        self.lock().indices.keys().cloned().collect()
    }

    /// The settings an index was created with
    #[must_use]
    pub fn settings(&self, index: &str) -> Option<Value> {
        self.lock()
            .indices
            .get(index)
            .map(|data| data.settings.clone())
    }

    /// The stored mapping for a type in an index
    #[must_use]
    pub fn mapping(&self, index: &str, type_tag: &str) -> Option<Value> {
        self.lock()
            .indices
            .get(index)
            .and_then(|data| data.mappings.get(type_tag).cloned())
    }

    /// The physical index an alias points at
    #[must_use]
    pub fn alias_target(&self, alias: &str) -> Option<String> {
        self.lock().aliases.get(alias).cloned()
    }

    /// Alias bindings whose alias names the given logical index
    #[must_use]
    pub fn aliases_for(&self, logical: &str) -> Vec<(String, String)> {
        let suffix = format!("_{logical}");
        self.lock()
            .aliases
            .iter()
            .filter(|(alias, _)| alias.ends_with(&suffix))
            .map(|(alias, index)| (alias.clone(), index.clone()))
            .collect()
    }

    /// How many `update_aliases` calls have been applied
    #[must_use]
    pub fn alias_update_count(&self) -> usize {
        self.lock().alias_updates
    }

    /// How many times an index has been refreshed
    #[must_use]
    pub fn refresh_count(&self, index: &str) -> usize {
        self.lock().refreshes.get(index).copied().unwrap_or(0)
    }

    /// Fetch one stored document
    #[must_use]
    pub fn document(&self, index: &str, id: &str) -> Option<Document> {
        self.lock()
            .indices
            .get(index)
            .and_then(|data| data.docs.get(id).cloned())
    }

    /// Number of documents in an index, zero when absent
    #[must_use]
    pub fn doc_count(&self, index: &str) -> usize {
        self.lock()
            .indices
            .get(index)
            .map_or(0, |data| data.docs.len())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().expect("engine state lock poisoned")
    }
}

impl SearchEngine for MemoryEngine {
    fn create_index(&self, name: &str, settings: &Value) -> Result<()> {
        let mut state = self.lock();
        state.take_failure("create_index")?;
        if state.indices.contains_key(name) {
            return Err(CutoverError::EngineUnavailable(format!(
                "index {name} already exists"
            )));
        }
        state.indices.insert(
            name.to_owned(),
            IndexData {
                settings: settings.clone(),
                ..IndexData::default()
            },
        );
        Ok(())
    }

    fn delete_index(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.take_failure("delete_index")?;
        if state.indices.remove(name).is_none() {
            return Err(CutoverError::IndexAbsent(name.to_owned()));
        }
        state.aliases.retain(|_, index| index != name);
        Ok(())
    }

    fn put_mapping(&self, index: &str, type_tag: &str, mapping: &Value) -> Result<()> {
        let mut state = self.lock();
        state.take_failure("put_mapping")?;
        let data = state
            .indices
            .get_mut(index)
            .ok_or_else(|| CutoverError::IndexAbsent(index.to_owned()))?;
        data.mappings.insert(type_tag.to_owned(), mapping.clone());
        Ok(())
    }

    fn index_status(&self, target: Option<&str>) -> Result<BTreeMap<String, IndexMeta>> {
        let mut state = self.lock();
        state.take_failure("index_status")?;
        let state = &*state;
        let names = match target {
            None => state.indices.keys().cloned().collect(),
            Some(target) => state.resolve(target)?,
        };
        Ok(names
            .into_iter()
            .filter_map(|name| {
                state
                    .indices
                    .get(&name)
                    .map(|data| (name.clone(), state.meta(&name, data)))
            })
            .collect())
    }

    fn update_aliases(&self, actions: &AliasActions) -> Result<()> {
        let mut state = self.lock();
        state.take_failure("update_aliases")?;
        // removals first, then additions, all under one lock: readers never
        // observe a half-applied action set
        for pair in &actions.remove {
            if state.aliases.get(&pair.alias) == Some(&pair.index) {
                state.aliases.remove(&pair.alias);
            }
        }
        for pair in &actions.add {
            if !state.indices.contains_key(&pair.index) {
                return Err(CutoverError::IndexAbsent(pair.index.clone()));
            }
            state.aliases.insert(pair.alias.clone(), pair.index.clone());
        }
        state.alias_updates += 1;
        Ok(())
    }

    fn refresh(&self, index: &str) -> Result<()> {
        let mut state = self.lock();
        state.take_failure("refresh")?;
        if !state.indices.contains_key(index) {
            return Err(CutoverError::IndexAbsent(index.to_owned()));
        }
        *state.refreshes.entry(index.to_owned()).or_insert(0) += 1;
        Ok(())
    }

    fn write_document(&self, doc: &Document, opts: &WriteOptions) -> Result<()> {
        let mut state = self.lock();
        state.take_failure("write_document")?;
        // engines auto-create an index on first write
        state.apply(BulkOp::Write {
            index: opts.index.clone(),
            doc: doc.clone(),
        });
        if opts.refresh {
            *state.refreshes.entry(opts.index.clone()).or_insert(0) += 1;
        }
        Ok(())
    }

    fn delete_document(&self, index: &str, type_tag: &str, id: &str) -> Result<()> {
        let mut state = self.lock();
        state.take_failure("delete_document")?;
        state.apply(BulkOp::Delete {
            index: index.to_owned(),
            type_tag: type_tag.to_owned(),
            id: id.to_owned(),
        });
        Ok(())
    }

    fn bulk(&self, ops: &mut dyn FnMut(&mut BulkSession) -> Result<()>) -> Result<()> {
        // the closure runs without the state lock so it may inspect the
        // engine; nothing it buffers is visible until the flush below
        let mut session = BulkSession::default();
        ops(&mut session)?;
        let mut state = self.lock();
        state.take_failure("bulk")?;
        for op in session.into_ops() {
            state.apply(op);
        }
        Ok(())
    }

    fn search(&self, target: &str, _query: &Value) -> Result<SearchHits> {
        let state = self.lock();
        let mut hits = Vec::new();
        for name in state.resolve(target)? {
            if let Some(data) = state.indices.get(&name) {
                hits.extend(data.docs.values().map(|doc| SearchHit {
                    id: doc.id.clone(),
                    type_tag: doc.type_tag.clone(),
                    score: 1.0,
                }));
            }
        }
        Ok(SearchHits {
            total: hits.len() as u64,
            hits,
        })
    }

    fn count(&self, target: &str, _query: &str) -> Result<u64> {
        let state = self.lock();
        let mut total = 0usize;
        for name in state.resolve(target)? {
            if let Some(data) = state.indices.get(&name) {
                total += data.docs.len();
            }
        }
        Ok(total as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_resolves_aliases() {
        let engine = MemoryEngine::new();
        engine.create_index("article_v1_2.0", &json!({})).unwrap();
        engine
            .update_aliases(&AliasActions::default().add("article_v1_2.0", "current_article"))
            .unwrap();

        let by_alias = engine.index_status(Some("current_article")).unwrap();
        assert!(by_alias.contains_key("article_v1_2.0"));
        assert_eq!(by_alias["article_v1_2.0"].aliases, vec!["current_article"]);

        let err = engine.index_status(Some("current_missing")).unwrap_err();
        assert_eq!(err.error_type(), "INDEX_ABSENT");
    }

    #[test]
    fn writes_auto_create_and_deletes_are_idempotent() {
        let engine = MemoryEngine::new();
        engine
            .write_document(
                &Document::new("1", "article", json!({"t": 1})),
                &WriteOptions {
                    index: "fresh".into(),
                    refresh: false,
                },
            )
            .unwrap();
        assert_eq!(engine.doc_count("fresh"), 1);

        engine.delete_document("fresh", "article", "1").unwrap();
        engine.delete_document("fresh", "article", "1").unwrap();
        engine.delete_document("never_created", "article", "1").unwrap();
        assert_eq!(engine.doc_count("fresh"), 0);
    }

    #[test]
    fn delete_index_drops_alias_bindings() {
        let engine = MemoryEngine::new();
        engine.create_index("article_v1_2.0", &json!({})).unwrap();
        engine
            .update_aliases(&AliasActions::default().add("article_v1_2.0", "current_article"))
            .unwrap();
        engine.delete_index("article_v1_2.0").unwrap();
        assert_eq!(engine.alias_target("current_article"), None);
        assert_eq!(
            engine.delete_index("article_v1_2.0").unwrap_err().error_type(),
            "INDEX_ABSENT"
        );
    }

    #[test]
    fn bulk_flushes_after_closure() {
        let engine = MemoryEngine::new();
        engine.create_index("idx", &json!({})).unwrap();
        engine
            .bulk(&mut |session| {
                session.write_document("idx", Document::new("1", "article", json!({})));
                assert_eq!(engine.doc_count("idx"), 0);
                Ok(())
            })
            .unwrap();
        assert_eq!(engine.doc_count("idx"), 1);
    }

    #[test]
    fn failed_bulk_closure_flushes_nothing() {
        let engine = MemoryEngine::new();
        engine.create_index("idx", &json!({})).unwrap();
        let result = engine.bulk(&mut |session| {
            session.write_document("idx", Document::new("1", "article", json!({})));
            Err(CutoverError::EngineUnavailable("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(engine.doc_count("idx"), 0);
    }

    #[test]
    fn injected_failure_is_one_shot() {
        let engine = MemoryEngine::new();
        engine.fail_next("create_index");
        assert!(engine.create_index("a", &json!({})).is_err());
        assert!(engine.create_index("a", &json!({})).is_ok());
    }

    #[test]
    fn count_through_alias() {
        let engine = MemoryEngine::new();
        engine.create_index("article_v1_2.0", &json!({})).unwrap();
        engine
            .write_document(
                &Document::new("1", "article", json!({})),
                &WriteOptions {
                    index: "article_v1_2.0".into(),
                    refresh: false,
                },
            )
            .unwrap();
        engine
            .update_aliases(&AliasActions::default().add("article_v1_2.0", "current_article"))
            .unwrap();
        assert_eq!(engine.count("current_article", "*").unwrap(), 1);
    }
}
