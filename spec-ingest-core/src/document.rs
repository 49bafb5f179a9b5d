//! The OpenAPI document carried through one run.
//!
//! The raw text is kept exactly as obtained and is what gets pushed to the registry; parsing only
//! validates it and pulls out a few fields for logging.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Serialisation format of a specification document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecFormat {
    Yaml,
    Json,
}

impl SpecFormat {
    /// Picks the format from the file extension, falling back to sniffing the content.
    pub fn detect(path: Option<&Path>, content: &str) -> Self {
        let ext = path
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => SpecFormat::Json,
            Some("yaml") | Some("yml") => SpecFormat::Yaml,
            _ if content.trim_start().starts_with('{') => SpecFormat::Json,
            _ => SpecFormat::Yaml,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpecFormat::Yaml => "yaml",
            SpecFormat::Json => "json",
        }
    }
}

impl fmt::Display for SpecFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API Gateway coordinates of a deployed REST API stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayTarget {
    pub region: String,
    pub rest_api_id: String,
    pub stage_name: String,
}

/// Where a document came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecOrigin {
    LocalFile { path: PathBuf },
    GatewayExport(GatewayTarget),
}

impl fmt::Display for SpecOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecOrigin::LocalFile { path } => write!(f, "local file {}", path.display()),
            SpecOrigin::GatewayExport(t) => write!(
                f,
                "API Gateway export {}/{} ({})",
                t.rest_api_id, t.stage_name, t.region
            ),
        }
    }
}

/// A parsed, immutable OpenAPI document.
#[derive(Debug, Clone)]
pub struct SpecDocument {
    content: String,
    format: SpecFormat,
    origin: SpecOrigin,
    title: Option<String>,
}

impl SpecDocument {
    /// Parses `content` and keeps it verbatim. Fails with a human-readable reason when the text is
    /// not a YAML/JSON mapping.
    pub fn parse(content: String, format: SpecFormat, origin: SpecOrigin) -> Result<Self, String> {
        // YAML keys may be non-strings (e.g. unquoted `200:` response codes), so YAML stays in
        // serde_yaml's value model.
        let (version, title) = match format {
            SpecFormat::Json => {
                let root: serde_json::Value =
                    serde_json::from_str(&content).map_err(|e| format!("invalid JSON: {e}"))?;
                let map = root
                    .as_object()
                    .ok_or_else(|| "document root is not a mapping".to_string())?;
                let version = map
                    .get("openapi")
                    .or_else(|| map.get("swagger"))
                    .map(|v| v.as_str().map(str::to_owned).unwrap_or_else(|| v.to_string()));
                let title = map
                    .get("info")
                    .and_then(|info| info.get("title"))
                    .and_then(|t| t.as_str())
                    .map(str::to_owned);
                (version, title)
            }
            SpecFormat::Yaml => {
                let root: serde_yaml::Value =
                    serde_yaml::from_str(&content).map_err(|e| format!("invalid YAML: {e}"))?;
                if !root.is_mapping() {
                    return Err("document root is not a mapping".to_string());
                }
                let version = root
                    .get("openapi")
                    .or_else(|| root.get("swagger"))
                    .map(yaml_scalar_to_string);
                let title = root
                    .get("info")
                    .and_then(|info| info.get("title"))
                    .and_then(|t| t.as_str())
                    .map(str::to_owned);
                (version, title)
            }
        };

        match version {
            Some(version) => debug!(%version, %origin, "Parsed OpenAPI document"),
            None => warn!(%origin, "Document has no 'openapi' or 'swagger' version key"),
        }

        Ok(SpecDocument {
            content,
            format,
            origin,
            title,
        })
    }

    /// Raw text exactly as read or exported.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn format(&self) -> SpecFormat {
        self.format
    }

    pub fn origin(&self) -> &SpecOrigin {
        &self.origin
    }

    /// `info.title`, when declared.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Hex SHA-256 of the raw content.
    pub fn sha256(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        other => format!("{other:?}"),
    }
}
