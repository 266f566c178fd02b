//! Test doubles for the cutover crates
//!
//! An in-memory search engine, job queue, and record store with the same
//! observable semantics as their production counterparts, plus accessors for
//! asserting on internal state. Used from unit tests and the integration
//! suite; never meant for production code.

#![forbid(unsafe_code)]

pub mod engine;
pub mod queue;
pub mod store;

pub use engine::MemoryEngine;
pub use queue::MemoryQueue;
pub use store::{MemoryStore, TestRecord};

use std::sync::OnceLock;

/// Install a compact tracing subscriber for test output, once per process.
/// Respects `RUST_LOG`; silent by default.
pub fn init_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .compact()
            .try_init();
    });
}
