//! Core types, configuration, and models for cutover
//!
//! This crate provides:
//! - The error taxonomy shared by every cutover crate
//! - Runtime configuration (`Config`, environment parsing)
//! - The index version name codec (schema tag + timestamp)
//! - Document and per-type model configuration types
//! - The model registry (type tag → record store mapping)

#![forbid(unsafe_code)]

pub mod config;
pub mod document;
pub mod error;
pub mod model;
pub mod registry;
pub mod version;

// Re-export key types for convenience
pub use config::Config;
pub use document::{DocFormat, Document};
pub use error::{CutoverError, Result};
pub use model::{DualWritePolicy, ModelConfig, Record, RecordStore, UpdatePolicy};
pub use registry::{HitId, ModelRegistry, RegisteredModel};
pub use version::{
    DEFAULT_SCHEMA_VERSION, extract_schema_version, is_version_of, version_name, version_timestamp,
};
