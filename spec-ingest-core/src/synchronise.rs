//! High-level pipeline: obtain → (copy) → upsert → generate.
//!
//! One run, strictly sequential:
//!   - Select a source ([`select_source`]) and obtain the document, either from a local file or from
//!     a [`GatewayExporter`]
//!   - Optionally leave a copy at `out` so a failed sync can be retried by hand
//!   - Upsert the document into the registry workspace by name ([`sync_spec`])
//!   - Ask the registry to regenerate the derived collection (not awaited)
//!
//! Fail-fast: the first error ends the run. Nothing is retried here; retry policy belongs to the
//! pipeline that invokes the tool.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::contract::{GatewayExporter, SpecPayload, SpecRegistry, SyncOutcome};
use crate::document::{SpecDocument, SpecFormat, SpecOrigin};
use crate::error::{IngestError, Result};
use crate::source::{load_local_spec, select_source, SpecSource};

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub spec_name: String,
    pub outcome: SyncOutcome,
    pub origin: SpecOrigin,
    pub format: SpecFormat,
    pub content_chars: usize,
    pub content_sha256: String,
    /// Top-level keys of the generation response.
    pub generation_keys: Vec<String>,
}

impl IngestReport {
    pub fn spec_id(&self) -> &str {
        self.outcome.spec_id()
    }
}

/// Runs one ingestion according to `config`.
pub async fn ingest<E, R>(config: &IngestConfig, exporter: &E, registry: &R) -> Result<IngestReport>
where
    E: GatewayExporter + ?Sized,
    R: SpecRegistry + ?Sized,
{
    info!("[INGEST] Starting ingestion run");

    if config.workspace_id.trim().is_empty() {
        return Err(IngestError::configuration("workspace id must not be empty"));
    }
    if config.spec_name.trim().is_empty() {
        return Err(IngestError::configuration("spec name must not be empty"));
    }

    // Step 1: obtain the document
    let source = select_source(&config.source)?;
    let document = obtain(&source, exporter).await?;

    if let Some(out) = &config.out {
        write_copy(&document, out)?;
    }

    // Step 2: upsert
    let outcome = sync_spec(registry, &config.workspace_id, &config.spec_name, &document).await?;

    // Step 3: derived collection
    info!(spec_id = outcome.spec_id(), "[INGEST] Requesting collection generation");
    let generation_keys = registry
        .generate_collection(outcome.spec_id())
        .await
        .map_err(|e| {
            error!(error = %e, spec_id = outcome.spec_id(), "[INGEST][ERROR] Collection generation request failed");
            IngestError::Sync(e)
        })?;
    info!(keys = ?generation_keys, "[INGEST] Generation request accepted");

    Ok(IngestReport {
        spec_name: config.spec_name.clone(),
        outcome,
        origin: document.origin().clone(),
        format: document.format(),
        content_chars: document.content().chars().count(),
        content_sha256: document.sha256(),
        generation_keys,
    })
}

/// Loads or exports the document for an already selected source.
pub async fn obtain<E>(source: &SpecSource, exporter: &E) -> Result<SpecDocument>
where
    E: GatewayExporter + ?Sized,
{
    match source {
        SpecSource::LocalFile(path) => load_local_spec(path),
        SpecSource::GatewayExport(target) => {
            let content = exporter.export(target).await.map_err(|e| {
                error!(error = %e, "[INGEST][ERROR] API Gateway export failed");
                IngestError::export(e.to_string())
            })?;
            let format = SpecFormat::detect(None, &content);
            SpecDocument::parse(content, format, SpecOrigin::GatewayExport(target.clone()))
                .map_err(|reason| {
                    error!(%reason, "[INGEST][ERROR] Exported document is not a valid spec");
                    IngestError::export(format!("exported document is unusable: {reason}"))
                })
        }
    }
}

/// Create-or-update `name` in `workspace_id`. Matching is by exact name; the first listed entry
/// with a non-empty id wins.
pub async fn sync_spec<R>(
    registry: &R,
    workspace_id: &str,
    name: &str,
    document: &SpecDocument,
) -> Result<SyncOutcome>
where
    R: SpecRegistry + ?Sized,
{
    info!(%workspace_id, spec_name = %name, "[SYNC] Looking up existing spec by name");
    let specs = registry.list_specs(workspace_id).await.map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Listing specs failed");
        IngestError::Sync(e)
    })?;

    let matches: Vec<_> = specs
        .iter()
        .filter(|s| s.name == name && !s.id.is_empty())
        .collect();
    if matches.len() > 1 {
        warn!(
            spec_name = %name,
            count = matches.len(),
            "[SYNC] Several specs share this name, updating the first"
        );
    }

    let payload = SpecPayload {
        name: name.to_owned(),
        content: document.content().to_owned(),
        format: document.format(),
    };

    match matches.first() {
        Some(existing) => {
            registry
                .update_spec(&existing.id, &payload)
                .await
                .map_err(|e| {
                    error!(error = %e, spec_id = %existing.id, "[SYNC][ERROR] Update failed");
                    IngestError::Sync(e)
                })?;
            info!(spec_id = %existing.id, spec_name = %name, "[SYNC] Updated spec");
            Ok(SyncOutcome::Updated(existing.id.clone()))
        }
        None => {
            let id = registry
                .create_spec(workspace_id, &payload)
                .await
                .map_err(|e| {
                    error!(error = %e, "[SYNC][ERROR] Create failed");
                    IngestError::Sync(e)
                })?;
            info!(spec_id = %id, spec_name = %name, "[SYNC] Created spec");
            Ok(SyncOutcome::Created(id))
        }
    }
}

/// Leaves a copy of the document at `out`, unless `out` is the file it was read from. An unwritable
/// `out` is a configuration problem, whichever source was used.
fn write_copy(document: &SpecDocument, out: &Path) -> Result<()> {
    if let SpecOrigin::LocalFile { path } = document.origin() {
        if path == out {
            return Ok(());
        }
    }
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            error!(error = ?e, path = %parent.display(), "Failed to create output directory");
            IngestError::configuration(format!(
                "cannot create directory {} for --out copy: {e}",
                parent.display()
            ))
        })?;
    }
    fs::write(out, document.content()).map_err(|e| {
        error!(error = ?e, path = %out.display(), "Failed to write spec copy");
        IngestError::configuration(format!("cannot write --out copy to {}: {e}", out.display()))
    })?;
    info!(path = %out.display(), "Wrote spec copy");
    Ok(())
}
