#![doc = "spec-ingest-core: core logic library for spec-ingest."]

//! Selects where an OpenAPI document comes from (local file or API Gateway export), loads it,
//! and upserts it into a spec registry workspace, triggering collection generation.
//!
//! Transport to the registry lives behind [`contract::SpecRegistry`]; the CLI crate provides the
//! HTTP client.
//!
//! # Usage
//! Build an [`config::IngestConfig`] and call [`synchronise::ingest`] with an exporter and a
//! registry.

pub mod config;
pub mod contract;
pub mod document;
pub mod error;
pub mod export;
pub mod source;
pub mod synchronise;

pub use error::{IngestError, RegistryError};
