//! Index version lifecycle for a search engine backing a primary datastore
//!
//! This crate provides:
//! - The search engine gateway trait (`SearchEngine`) — the external
//!   collaborator boundary to the wire client
//! - The index version manager (`VersionManager`) — create → deploy → prune
//! - The per-record indexer (`RecordIndexer`) — schema-aware dual-write
//!   routing of documents into live versions

#![forbid(unsafe_code)]

pub mod admin;
pub mod gateway;
pub mod indexer;

pub use admin::{VersionManager, current_alias, previous_alias};
pub use gateway::{
    AliasActions, AliasPair, BulkOp, BulkSession, IndexMeta, SearchEngine, SearchHit, SearchHits,
    WriteOptions, load_hit_records,
};
pub use indexer::{
    IndexOptions, LiveVersion, RecordIndexer, SchemaReadiness, WriteTarget, plan_writes,
};
