//! # spec-ingest CLI Interface (Module)
//!
//! Command parsing, the async entrypoint [`run`], and the stdout report.
//!
//! All ingestion logic (source selection, loading, export, upsert) lives in `spec-ingest-core`;
//! this module only wires configuration, the HTTP registry client and the AWS CLI exporter into
//! [`spec_ingest_core::synchronise::ingest`].
//!
//! Every flag can also come from an environment variable or from the optional `--config` YAML
//! file; see [`crate::load_config`].

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use spec_ingest_core::export::AwsCliExporter;
use spec_ingest_core::synchronise::{ingest, IngestReport};
use spec_ingest_core::IngestError;

use crate::load_config::load_config;
use crate::registry::PostmanClient;

/// Export (or read) an OpenAPI spec and sync it to Postman Spec Hub.
#[derive(Parser, Debug, Default)]
#[clap(
    name = "spec-ingest",
    version,
    about = "Export an OpenAPI spec from API Gateway (or read a local file) and sync it to Postman Spec Hub"
)]
pub struct Cli {
    /// Postman workspace ID
    #[clap(long, env = "POSTMAN_WORKSPACE_ID")]
    pub workspace_id: Option<String>,

    /// AWS region (e.g. us-east-1)
    #[clap(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// API Gateway REST API ID
    #[clap(long, env = "REST_API_ID")]
    pub rest_api_id: Option<String>,

    /// API Gateway stage (e.g. dev)
    #[clap(long, env = "STAGE_NAME")]
    pub stage_name: Option<String>,

    /// Local OpenAPI spec to ingest (skips the API Gateway export)
    #[clap(long, env = "LOCAL_SPEC")]
    pub local_spec: Option<PathBuf>,

    /// Name of the spec in Spec Hub
    #[clap(long, env = "SPEC_NAME")]
    pub spec_name: Option<String>,

    /// Also write the obtained spec to this path (kept even if the sync fails)
    #[clap(long, env = "SPEC_OUT")]
    pub out: Option<PathBuf>,

    /// Optional YAML config file with defaults for the flags above
    #[clap(long)]
    pub config: Option<PathBuf>,
}

/// Async entrypoint used by main() and integration tests.
pub async fn run(cli: Cli) -> Result<IngestReport> {
    tracing::info!("trace_initialised");

    let config = load_config(&cli)?;
    config.ingest.trace_loaded();

    let registry = PostmanClient::new(&config.registry).map_err(IngestError::from)?;
    let exporter = AwsCliExporter::new();

    match ingest(&config.ingest, &exporter, &registry).await {
        Ok(report) => {
            tracing::info!(
                spec_id = report.spec_id(),
                action = report.outcome.verb(),
                "Ingestion complete"
            );
            Ok(report)
        }
        Err(e) => {
            tracing::error!(error = %e, exit_code = e.exit_code(), "Ingestion failed");
            Err(e.into())
        }
    }
}

/// Exit code for an error returned by [`run`]. Errors that are not ingestion errors exit 1.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<IngestError>()
        .map(IngestError::exit_code)
        .unwrap_or(1)
}

/// Human-readable run summary for stdout.
pub fn render_report(report: &IngestReport) -> String {
    format!(
        "{} spec: {} (id={})\nSource: {} ({}, {} chars, sha256={})\nCollection generation requested (response keys: {:?})",
        report.outcome.verb(),
        report.spec_name,
        report.spec_id(),
        report.origin,
        report.format,
        report.content_chars,
        report.content_sha256,
        report.generation_keys,
    )
}
