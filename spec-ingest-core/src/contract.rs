//! # contract: seams between the ingestion pipeline and the outside world
//!
//! Two traits sit at the edges of a run:
//! - [`GatewayExporter`] produces the raw text of an OpenAPI export for a deployed gateway stage.
//! - [`SpecRegistry`] lists, creates and updates specs in a registry workspace, and triggers
//!   collection generation.
//!
//! Both are annotated for `mockall`, so the pipeline can be driven without a cloud account or a
//! registry. The mocks (`MockGatewayExporter`, `MockSpecRegistry`) are exported behind the default
//! `test-export-mocks` feature so other crates' integration tests can use them.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::Serialize;

use crate::document::{GatewayTarget, SpecFormat};
use crate::error::{ExportFailure, RegistryError};

/// A spec as listed in a registry workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSummary {
    /// Registry-assigned id. May be empty in malformed listings.
    pub id: String,
    pub name: String,
}

/// The data pushed on create or update. The client decides the wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecPayload {
    pub name: String,
    pub content: String,
    pub format: SpecFormat,
}

/// Outcome of an upsert, keyed by spec name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "spec_id", rename_all = "lowercase")]
pub enum SyncOutcome {
    Created(String),
    Updated(String),
}

impl SyncOutcome {
    pub fn spec_id(&self) -> &str {
        match self {
            SyncOutcome::Created(id) | SyncOutcome::Updated(id) => id,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            SyncOutcome::Created(_) => "Created",
            SyncOutcome::Updated(_) => "Updated",
        }
    }
}

/// Exports an OpenAPI document from a cloud API gateway.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait GatewayExporter: Send + Sync {
    /// Returns the raw exported document text for the given stage.
    async fn export(&self, target: &GatewayTarget) -> Result<String, ExportFailure>;
}

/// A hosted spec registry (e.g. Postman Spec Hub).
///
/// Implementors own authentication and transport; the pipeline only sees typed
/// [`RegistryError`]s.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SpecRegistry: Send + Sync {
    /// List all specs in a workspace.
    async fn list_specs(&self, workspace_id: &str) -> Result<Vec<SpecSummary>, RegistryError>;

    /// Create a spec in a workspace, returning its new id.
    async fn create_spec(
        &self,
        workspace_id: &str,
        payload: &SpecPayload,
    ) -> Result<String, RegistryError>;

    /// Replace the content of an existing spec.
    async fn update_spec(&self, spec_id: &str, payload: &SpecPayload)
        -> Result<(), RegistryError>;

    /// Ask the registry to regenerate the derived collection. Returns the top-level keys of the
    /// registry's response; completion is not awaited.
    async fn generate_collection(&self, spec_id: &str) -> Result<Vec<String>, RegistryError>;
}
