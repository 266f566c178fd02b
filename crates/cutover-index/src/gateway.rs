//! Search engine gateway
//!
//! `SearchEngine` is the boundary to the external engine's wire client:
//! index creation and deletion, alias manipulation, refresh, document writes,
//! bulk sessions, and the read surface (status, search, count). Everything
//! crossing this boundary is JSON, as it is on the real wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cutover_core::{Document, HitId, ModelRegistry, Record, Result};

/// Metadata for one physical index, as reported by `index_status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Number of documents currently in the index
    pub doc_count: usize,
    /// Aliases pointing at this index
    pub aliases: Vec<String>,
}

/// One alias binding: a physical index and the alias pointing at it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasPair {
    /// Physical index name
    pub index: String,
    /// Alias name
    pub alias: String,
}

/// A set of alias additions and removals applied in one atomic engine call.
///
/// The deploy swap (add new, remove old) must go through a single
/// `update_aliases` call so readers never observe an alias-less interval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasActions {
    /// Bindings to add
    pub add: Vec<AliasPair>,
    /// Bindings to remove
    pub remove: Vec<AliasPair>,
}

impl AliasActions {
    /// Add an alias binding to the action set
    #[must_use]
    pub fn add(mut self, index: impl Into<String>, alias: impl Into<String>) -> Self {
        self.add.push(AliasPair {
            index: index.into(),
            alias: alias.into(),
        });
        self
    }

    /// Remove an alias binding from the action set
    #[must_use]
    pub fn remove(mut self, index: impl Into<String>, alias: impl Into<String>) -> Self {
        self.remove.push(AliasPair {
            index: index.into(),
            alias: alias.into(),
        });
        self
    }

    /// Whether the action set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Options for a single document write
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Target physical index (or alias)
    pub index: String,
    /// Force a refresh after the write
    pub refresh: bool,
}

/// One buffered bulk operation
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOp {
    /// Upsert a document into an index
    Write {
        /// Target physical index
        index: String,
        /// The document to store
        doc: Document,
    },
    /// Delete a document by id
    Delete {
        /// Target physical index
        index: String,
        /// Type discriminator of the document
        type_tag: String,
        /// Document id
        id: String,
    },
}

/// A scoped bulk-write session.
///
/// Operations recorded into the session are deferred; the engine flushes them
/// exactly once when the session's closure returns successfully. Sessions are
/// acquired per batch and never outlive it.
#[derive(Debug, Default)]
pub struct BulkSession {
    ops: Vec<BulkOp>,
}

impl BulkSession {
    /// Record a document write
    pub fn write_document(&mut self, index: impl Into<String>, doc: Document) {
        self.ops.push(BulkOp::Write {
            index: index.into(),
            doc,
        });
    }

    /// Record a document deletion
    pub fn delete_document(
        &mut self,
        index: impl Into<String>,
        type_tag: impl Into<String>,
        id: impl Into<String>,
    ) {
        self.ops.push(BulkOp::Delete {
            index: index.into(),
            type_tag: type_tag.into(),
            id: id.into(),
        });
    }

    /// Number of buffered operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the session has no buffered operations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consume the session, yielding the buffered operations in order
    #[must_use]
    pub fn into_ops(self) -> Vec<BulkOp> {
        self.ops
    }
}

/// One search result hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Document id
    pub id: String,
    /// Type discriminator
    pub type_tag: String,
    /// Relevance score
    pub score: f64,
}

/// A ranked page of search hits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    /// Total matching documents (may exceed `hits.len()`)
    pub total: u64,
    /// The returned hits, ranked
    pub hits: Vec<SearchHit>,
}

impl SearchHits {
    /// The hits reduced to (type tag, id) pairs for registry hit mapping
    #[must_use]
    pub fn ranked_ids(&self) -> Vec<HitId> {
        self.hits
            .iter()
            .map(|hit| HitId {
                type_tag: hit.type_tag.clone(),
                id: hit.id.clone(),
            })
            .collect()
    }
}

/// The search engine wire contract.
///
/// All calls are synchronous from the caller's point of view. Failures map to
/// `CutoverError::EngineUnavailable` (connection-level) or
/// `CutoverError::IndexAbsent` (the named index does not exist).
pub trait SearchEngine: Send + Sync {
    /// Create a physical index with the given settings
    fn create_index(&self, name: &str, settings: &Value) -> Result<()>;

    /// Delete a physical index. An absent index is reported as
    /// `IndexAbsent`; most call sites convert that to success.
    fn delete_index(&self, name: &str) -> Result<()>;

    /// Apply a field mapping for one type to an index
    fn put_mapping(&self, index: &str, type_tag: &str, mapping: &Value) -> Result<()>;

    /// Report physical indices and their metadata.
    ///
    /// `target` of `None` lists every index; a physical name lists itself; an
    /// alias resolves to the indices behind it. An unknown target is
    /// `IndexAbsent`.
    fn index_status(&self, target: Option<&str>) -> Result<BTreeMap<String, IndexMeta>>;

    /// Apply a set of alias additions and removals atomically
    fn update_aliases(&self, actions: &AliasActions) -> Result<()>;

    /// Make all writes to an index visible to search
    fn refresh(&self, index: &str) -> Result<()>;

    /// Write (upsert) one document
    fn write_document(&self, doc: &Document, opts: &WriteOptions) -> Result<()>;

    /// Delete one document by id. Deleting an absent document succeeds.
    fn delete_document(&self, index: &str, type_tag: &str, id: &str) -> Result<()>;

    /// Whether the engine supports deferred bulk writes
    fn supports_bulk(&self) -> bool {
        true
    }

    /// Run `ops` against a scoped bulk session and flush it exactly once.
    ///
    /// The default implementation replays the buffered operations through
    /// `write_document`/`delete_document`; engines with a native bulk
    /// endpoint override this.
    fn bulk(&self, ops: &mut dyn FnMut(&mut BulkSession) -> Result<()>) -> Result<()> {
        let mut session = BulkSession::default();
        ops(&mut session)?;
        for op in session.into_ops() {
            match op {
                BulkOp::Write { index, doc } => self.write_document(
                    &doc,
                    &WriteOptions {
                        index,
                        refresh: false,
                    },
                )?,
                BulkOp::Delete {
                    index,
                    type_tag,
                    id,
                } => self.delete_document(&index, &type_tag, &id)?,
            }
        }
        Ok(())
    }

    /// Execute a search against an index or alias
    fn search(&self, target: &str, query: &Value) -> Result<SearchHits>;

    /// Count documents matching a query against an index or alias
    fn count(&self, target: &str, query: &str) -> Result<u64>;
}

/// Load the datastore records behind a page of search hits, in hit order.
///
/// Convenience composing [`SearchHits::ranked_ids`] with
/// [`ModelRegistry::load_hits`]; records deleted since the last index write
/// are dropped from the result.
///
/// # Errors
/// Returns `CutoverError::UnknownTypeTag` for hits naming unregistered types,
/// or a record store error.
pub fn load_hit_records(
    registry: &ModelRegistry,
    hits: &SearchHits,
) -> Result<Vec<Box<dyn Record>>> {
    registry.load_hits(&hits.ranked_ids())
}
