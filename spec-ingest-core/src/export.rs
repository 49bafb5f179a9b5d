//! API Gateway export via the AWS CLI.
//!
//! Runs `aws apigateway get-export ... --export-type oas30` into a temporary file and returns its
//! contents. Credentials and profiles are resolved by the AWS CLI itself.

use std::ffi::OsString;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info};

use crate::contract::GatewayExporter;
use crate::document::GatewayTarget;
use crate::error::ExportFailure;

/// Exporter that shells out to the `aws` executable.
#[derive(Debug, Clone)]
pub struct AwsCliExporter {
    program: PathBuf,
}

impl Default for AwsCliExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl AwsCliExporter {
    /// Uses `aws` from `PATH`.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("aws"),
        }
    }

    /// Uses a specific executable, e.g. a pinned install or a test double.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments passed to the executable, output path last.
    pub fn export_args(target: &GatewayTarget, out_path: &std::path::Path) -> Vec<OsString> {
        vec![
            "apigateway".into(),
            "get-export".into(),
            "--region".into(),
            target.region.clone().into(),
            "--rest-api-id".into(),
            target.rest_api_id.clone().into(),
            "--stage-name".into(),
            target.stage_name.clone().into(),
            "--export-type".into(),
            "oas30".into(),
            "--accepts".into(),
            "application/yaml".into(),
            out_path.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl GatewayExporter for AwsCliExporter {
    async fn export(&self, target: &GatewayTarget) -> Result<String, ExportFailure> {
        let out_file = tempfile::Builder::new()
            .prefix("openapi-export-")
            .suffix(".yaml")
            .tempfile()?;
        let args = Self::export_args(target, out_file.path());

        info!(
            program = %self.program.display(),
            region = %target.region,
            rest_api_id = %target.rest_api_id,
            stage_name = %target.stage_name,
            "Running API Gateway export"
        );

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                error!(error = ?e, program = %self.program.display(), "Failed to launch export command");
                format!("failed to launch {}: {e}", self.program.display())
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(status = ?output.status, stderr = %stderr.trim(), "Export command exited with failure");
            return Err(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )
            .into());
        }

        let content = tokio::fs::read_to_string(out_file.path()).await?;
        info!(chars = content.chars().count(), "API Gateway export completed");
        Ok(content)
    }
}
