//! In-memory record store

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;

use cutover_core::{CutoverError, Record, RecordStore, Result};

/// A record double with explicit current and legacy serializations
#[derive(Debug, Clone)]
pub struct TestRecord {
    id: String,
    attrs: Value,
    legacy_attrs: Option<Value>,
}

impl TestRecord {
    /// Create a record with the given id and current-format attributes
    #[must_use]
    pub fn new(id: impl Into<String>, attrs: Value) -> Self {
        Self {
            id: id.into(),
            attrs,
            legacy_attrs: None,
        }
    }

    /// Declare a distinct legacy-format serialization
    #[must_use]
    pub fn legacy(mut self, attrs: Value) -> Self {
        self.legacy_attrs = Some(attrs);
        self
    }
}

impl Record for TestRecord {
    fn record_id(&self) -> String {
        self.id.clone()
    }

    fn indexed_attributes(&self) -> Value {
        self.attrs.clone()
    }

    fn legacy_indexed_attributes(&self) -> Value {
        self.legacy_attrs.clone().unwrap_or_else(|| self.attrs.clone())
    }
}

/// A record store double backed by a sorted map, so batch enumeration
/// order is deterministic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, TestRecord>>,
    fail_next_batch: Mutex<bool>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a record with current-format attributes only
    pub fn insert(&self, id: &str, attrs: Value) {
        self.insert_record(TestRecord::new(id, attrs));
    }

    /// Insert (or replace) a fully specified record
    pub fn insert_record(&self, record: TestRecord) {
        self.lock().insert(record.id.clone(), record);
    }

    /// Remove a record, simulating a datastore deletion
    pub fn remove(&self, id: &str) {
        self.lock().remove(id);
    }

    /// Make the next `find_in_batches` call fail with a store error.
    /// One-shot.
    pub fn fail_next_batch(&self) {
        *self
            .fail_next_batch
            .lock()
            .expect("store failure flag lock poisoned") = true;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, TestRecord>> {
        self.records.lock().expect("store lock poisoned")
    }
}

impl RecordStore for MemoryStore {
    fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Box<dyn Record>>> {
        let records = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| records.get(id).cloned())
            .map(|record| Box::new(record) as Box<dyn Record>)
            .collect())
    }

    fn find_in_batches(
        &self,
        batch_size: usize,
        visit: &mut dyn FnMut(Vec<Box<dyn Record>>) -> Result<()>,
    ) -> Result<()> {
        {
            let mut flag = self
                .fail_next_batch
                .lock()
                .expect("store failure flag lock poisoned");
            if *flag {
                *flag = false;
                return Err(CutoverError::RecordStore("injected batch failure".into()));
            }
        }
        let all: Vec<TestRecord> = self.lock().values().cloned().collect();
        for chunk in all.chunks(batch_size.max(1)) {
            let batch = chunk
                .iter()
                .cloned()
                .map(|record| Box::new(record) as Box<dyn Record>)
                .collect();
            visit(batch)?;
        }
        Ok(())
    }

    fn total_count(&self) -> Result<usize> {
        Ok(self.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn find_by_ids_omits_missing_and_preserves_request_order() {
        let store = MemoryStore::new();
        store.insert("2", json!({"id": "2"}));
        store.insert("1", json!({"id": "1"}));
        let records = store
            .find_by_ids(&["2".into(), "ghost".into(), "1".into()])
            .unwrap();
        let ids: Vec<String> = records.iter().map(|r| r.record_id()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn batches_cover_every_record_once() {
        let store = MemoryStore::new();
        for n in 0..7 {
            store.insert(&n.to_string(), json!({}));
        }
        let mut seen = Vec::new();
        store
            .find_in_batches(3, &mut |batch| {
                seen.push(batch.len());
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![3, 3, 1]);
        assert_eq!(store.total_count().unwrap(), 7);
    }

    #[test]
    fn legacy_serialization_defaults_to_current() {
        let plain = TestRecord::new("1", json!({"a": 1}));
        assert_eq!(plain.legacy_indexed_attributes(), plain.indexed_attributes());
        let dual = TestRecord::new("1", json!({"a": 1})).legacy(json!({"b": 2}));
        assert_ne!(dual.legacy_indexed_attributes(), dual.indexed_attributes());
    }
}
