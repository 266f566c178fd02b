//! Reindex job pipeline
//!
//! Background population of new index versions, live save/delete hooks, and
//! the worker that executes queued jobs. Jobs are at-least-once: every job is
//! safe to re-run because document writes are idempotent upserts and the
//! datastore is re-read at execution time.

#![forbid(unsafe_code)]

pub mod distributed;
pub mod hooks;
pub mod job;
pub mod local;
pub mod pipeline;
pub mod queue;
pub mod worker;

pub use distributed::DistributedIndexing;
pub use hooks::LiveHooks;
pub use job::{JobKind, JobPolicy, QUEUE_INDEXING, QUEUE_RECONCILE, ReindexJob};
pub use local::LocalIndexing;
pub use pipeline::Reindexer;
pub use queue::JobQueue;
pub use worker::Worker;
