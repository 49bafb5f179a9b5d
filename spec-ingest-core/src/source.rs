//! Source selection and local loading.
//!
//! A run reads exactly one source. A local file wins when given; otherwise all three gateway
//! identifiers must be present. Selection never touches the network or the filesystem, so a
//! misconfigured run fails before any I/O.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::config::SourceSettings;
use crate::document::{GatewayTarget, SpecDocument, SpecFormat, SpecOrigin};
use crate::error::{IngestError, Result};

/// The source chosen for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    LocalFile(PathBuf),
    GatewayExport(GatewayTarget),
}

/// Decides where the document comes from. Empty or blank values count as absent.
pub fn select_source(settings: &SourceSettings) -> Result<SpecSource> {
    if let Some(path) = settings
        .local_spec
        .as_ref()
        .filter(|p| !p.to_string_lossy().trim().is_empty())
    {
        info!(path = %path.display(), "Selected local spec file as source");
        return Ok(SpecSource::LocalFile(path.clone()));
    }

    let present = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    };
    let region = present(&settings.region);
    let rest_api_id = present(&settings.rest_api_id);
    let stage_name = present(&settings.stage_name);

    match (region, rest_api_id, stage_name) {
        (Some(region), Some(rest_api_id), Some(stage_name)) => {
            info!(%region, %rest_api_id, %stage_name, "Selected API Gateway export as source");
            Ok(SpecSource::GatewayExport(GatewayTarget {
                region,
                rest_api_id,
                stage_name,
            }))
        }
        (region, rest_api_id, stage_name) => {
            let missing: Vec<&str> = [
                ("--region", region.is_none()),
                ("--rest-api-id", rest_api_id.is_none()),
                ("--stage-name", stage_name.is_none()),
            ]
            .into_iter()
            .filter_map(|(flag, absent)| absent.then_some(flag))
            .collect();
            error!(?missing, "No local spec and incomplete API Gateway identifiers");
            Err(IngestError::configuration(format!(
                "missing required arguments for API Gateway export mode: {} (or provide --local-spec)",
                missing.join(", ")
            )))
        }
    }
}

/// Reads and parses a local OpenAPI file. The content is returned byte-for-byte.
pub fn load_local_spec(path: &Path) -> Result<SpecDocument> {
    info!(path = %path.display(), "Loading OpenAPI spec from local file");

    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, path = %path.display(), "Failed to read local spec file");
        IngestError::source_file(path, format!("failed to read: {e}"))
    })?;

    let format = SpecFormat::detect(Some(path), &content);
    let doc = SpecDocument::parse(
        content,
        format,
        SpecOrigin::LocalFile {
            path: path.to_path_buf(),
        },
    )
    .map_err(|reason| {
        error!(path = %path.display(), %reason, "Failed to parse local spec file");
        IngestError::source_file(path, reason)
    })?;

    info!(
        path = %path.display(),
        %format,
        chars = doc.content().chars().count(),
        title = doc.title().unwrap_or("<untitled>"),
        "Loaded spec from local file"
    );
    Ok(doc)
}
