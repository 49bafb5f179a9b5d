//! # Ingestion configuration
//!
//! The fully merged settings for one run. The CLI crate builds an [`IngestConfig`] from flags,
//! environment variables and an optional YAML file; the core only consumes it.
//!
//! - `workspace_id` and `spec_name` are required and non-blank (checked by
//!   [`crate::synchronise::ingest`]).
//! - [`SourceSettings`] carries the raw source inputs. Blank values are treated as absent by
//!   [`crate::source::select_source`].
//! - `out` optionally names a path where the obtained document is copied before the sync.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

/// Fallback name of the spec in the registry.
pub const DEFAULT_SPEC_NAME: &str = "TechCorp Payments API (Spec Hub)";

/// Everything one ingestion run needs, already merged from flags, env and config file.
#[derive(Debug, Clone, Serialize)]
pub struct IngestConfig {
    pub workspace_id: String,
    pub spec_name: String,
    pub source: SourceSettings,
    /// Where to leave a copy of the obtained document, if anywhere.
    pub out: Option<PathBuf>,
}

impl IngestConfig {
    pub fn trace_loaded(&self) {
        info!(
            workspace_id = %self.workspace_id,
            spec_name = %self.spec_name,
            local_spec = ?self.source.local_spec,
            out = ?self.out,
            "Loaded IngestConfig"
        );
        debug!(?self, "IngestConfig loaded (full debug)");
    }
}

/// Raw source inputs. Which source is used is decided by
/// [`crate::source::select_source`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceSettings {
    pub local_spec: Option<PathBuf>,
    pub region: Option<String>,
    pub rest_api_id: Option<String>,
    pub stage_name: Option<String>,
}
