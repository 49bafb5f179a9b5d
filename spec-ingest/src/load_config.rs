//! `load_config`: merges CLI flags, environment and an optional YAML file into a [`RunConfig`].
//!
//! Precedence, highest first: flag → environment variable (both resolved by clap) → `--config`
//! file → built-in default. A blank value at any level counts as absent and falls through to the
//! next one. Secrets are read from the environment only:
//! - `POSTMAN_API_KEY` (required)
//! - `POSTMAN_API_BASE` (optional, overrides the file's `api_base`)
//!
//! Every failure here is an [`IngestError::Configuration`], so the CLI exits 2 before any file or
//! network access for the spec itself.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use reqwest::Url;
use serde::Deserialize;
use spec_ingest_core::config::{IngestConfig, SourceSettings, DEFAULT_SPEC_NAME};
use spec_ingest_core::IngestError;
use tracing::{error, info};

use crate::cli::Cli;
use crate::registry::{RegistrySettings, DEFAULT_TIMEOUT_SECS, POSTMAN_API_BASE};

/// Shape of the optional `--config` YAML file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub workspace_id: Option<String>,
    pub region: Option<String>,
    pub rest_api_id: Option<String>,
    pub stage_name: Option<String>,
    pub local_spec: Option<PathBuf>,
    pub spec_name: Option<String>,
    pub out: Option<PathBuf>,
    pub api_base: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully merged settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub ingest: IngestConfig,
    pub registry: RegistrySettings,
}

fn config_error(message: String) -> anyhow::Error {
    IngestError::configuration(message).into()
}

/// Reads and parses a `--config` file.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(config_error(format!(
                "failed to read config file {}: {e}",
                path.display()
            )));
        }
    };

    // An empty file deserialises as null, not as an empty mapping.
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }

    match serde_yaml::from_str::<FileConfig>(&content) {
        Ok(conf) => {
            info!(config_path = ?path, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            Err(config_error(format!(
                "failed to parse config YAML {}: {e}",
                path.display()
            )))
        }
    }
}

/// Non-empty value from the environment.
fn env_value(key: &str) -> Option<String> {
    non_empty(std::env::var(key).ok())
}

/// Blank strings count as absent; unset CI secrets expand to `""`.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_empty_path(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|p| !p.to_string_lossy().trim().is_empty())
}

/// First non-blank of flag/env and file value.
fn merged(flag: &Option<String>, file: Option<String>) -> Option<String> {
    non_empty(flag.clone()).or_else(|| non_empty(file))
}

fn merged_path(flag: &Option<PathBuf>, file: Option<PathBuf>) -> Option<PathBuf> {
    non_empty_path(flag.clone()).or_else(|| non_empty_path(file))
}

/// Merges everything into a [`RunConfig`].
pub fn load_config(cli: &Cli) -> Result<RunConfig> {
    let file = match &cli.config {
        Some(path) => load_file_config(path)?,
        None => FileConfig::default(),
    };

    let workspace_id = merged(&cli.workspace_id, file.workspace_id).ok_or_else(|| {
        error!("No workspace id given");
        config_error("missing workspace id: pass --workspace-id or set POSTMAN_WORKSPACE_ID".into())
    })?;

    let api_key = env_value("POSTMAN_API_KEY").ok_or_else(|| {
        error!("POSTMAN_API_KEY environment variable not set");
        config_error("missing POSTMAN_API_KEY environment variable".into())
    })?;
    info!("POSTMAN_API_KEY found in env");

    let api_base = env_value("POSTMAN_API_BASE")
        .or_else(|| non_empty(file.api_base))
        .unwrap_or_else(|| POSTMAN_API_BASE.to_string());
    let base_url = match Url::parse(&api_base) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        Ok(url) => {
            return Err(config_error(format!(
                "registry base URL must be http(s), got scheme '{}'",
                url.scheme()
            )))
        }
        Err(e) => {
            error!(error = ?e, api_base = %api_base, "Invalid registry base URL");
            return Err(config_error(format!(
                "invalid registry base URL '{api_base}': {e}"
            )));
        }
    };

    let timeout_secs = file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(config_error("timeout_secs must be greater than zero".into()));
    }

    let ingest = IngestConfig {
        workspace_id,
        spec_name: merged(&cli.spec_name, file.spec_name)
            .unwrap_or_else(|| DEFAULT_SPEC_NAME.to_string()),
        source: SourceSettings {
            local_spec: merged_path(&cli.local_spec, file.local_spec),
            region: merged(&cli.region, file.region),
            rest_api_id: merged(&cli.rest_api_id, file.rest_api_id),
            stage_name: merged(&cli.stage_name, file.stage_name),
        },
        out: merged_path(&cli.out, file.out),
    };

    info!(
        workspace_id = %ingest.workspace_id,
        base_url = %base_url,
        timeout_secs,
        "Config loaded and merged successfully"
    );

    Ok(RunConfig {
        ingest,
        registry: RegistrySettings {
            api_key,
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        },
    })
}
