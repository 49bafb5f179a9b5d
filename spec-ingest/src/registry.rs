#![doc = "Spec registry client for the CLI: implements the core `SpecRegistry` trait against the Postman API (Spec Hub)."]
//
//! # Postman Spec Hub client
//!
//! [`PostmanClient`] wires the [`SpecRegistry`] trait from `spec-ingest-core` to the Postman API
//! over HTTPS with `reqwest`.
//!
//! - Authentication is an `X-Api-Key` header; the key is never logged.
//! - Listing follows `meta.nextCursor` until the workspace is exhausted. A cursor seen twice is a
//!   malformed response.
//! - Create and update try each [`PayloadShape`] in turn. Only a payload rejection moves on to the
//!   next shape; authentication failures, other statuses and transport errors stop at once.
//! - Non-success statuses are classified by [`RegistryError::from_status`].

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};

pub use spec_ingest_core::contract::{SpecPayload, SpecRegistry, SpecSummary};
use spec_ingest_core::RegistryError;

pub const POSTMAN_API_BASE: &str = "https://api.getpostman.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection settings for the registry.
#[derive(Clone)]
pub struct RegistrySettings {
    pub api_key: String,
    pub base_url: Url,
    pub timeout: Duration,
}

impl std::fmt::Debug for RegistrySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrySettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Body shapes accepted by the create/update endpoints, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `{"name", "type", "language", "schema"}`
    Flat,
    /// `{"specName", "specType", "filePath", "content"}`
    File,
    /// `{"spec": {..Flat}}`
    Wrapped,
}

impl PayloadShape {
    pub const ALL: [PayloadShape; 3] = [PayloadShape::Flat, PayloadShape::File, PayloadShape::Wrapped];

    pub fn body(&self, payload: &SpecPayload) -> Value {
        let flat = || {
            json!({
                "name": payload.name,
                "type": "openapi3",
                "language": payload.format.as_str(),
                "schema": payload.content,
            })
        };
        match self {
            PayloadShape::Flat => flat(),
            PayloadShape::File => json!({
                "specName": payload.name,
                "specType": "openapi3",
                "filePath": format!("{}.{}", payload.name, payload.format.as_str()),
                "content": payload.content,
            }),
            PayloadShape::Wrapped => json!({ "spec": flat() }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SpecListResponse {
    #[serde(default)]
    specs: Vec<SpecListEntry>,
    #[serde(default)]
    meta: Option<ListMeta>,
}

#[derive(Debug, Deserialize)]
struct SpecListEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ListMeta {
    #[serde(default, rename = "nextCursor")]
    next_cursor: Option<String>,
}

pub struct PostmanClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl PostmanClient {
    pub fn new(settings: &RegistrySettings) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| RegistryError::Transport {
                url: settings.base_url.to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        tracing::info!(
            base_url = %settings.base_url,
            api_key_set = !settings.api_key.is_empty(),
            timeout_secs = settings.timeout.as_secs(),
            "Initialized PostmanClient"
        );
        Ok(PostmanClient {
            http,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    /// Base URL joined with path segments, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RegistryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RegistryError::Transport {
                url: self.base_url.to_string(),
                message: "base URL cannot carry a path".into(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends one request and returns the JSON body. An empty body reads as `{}`.
    async fn send_json(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value, RegistryError> {
        tracing::debug!(%method, %url, "Registry request");
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header("X-Api-Key", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, %method, %url, "Registry request failed");
            RegistryError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| RegistryError::Transport {
            url: url.to_string(),
            message: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), %method, %url, body = %text, "Registry returned error status");
            return Err(RegistryError::from_status(status.as_u16(), url.as_str(), text));
        }

        if text.trim().is_empty() {
            return Ok(json!({}));
        }
        serde_json::from_str(&text).map_err(|e| {
            RegistryError::MalformedResponse(format!("{method} {url} returned non-JSON body ({e}): {text}"))
        })
    }

    /// Tries every [`PayloadShape`] until one is accepted.
    async fn send_with_shapes(
        &self,
        method: Method,
        url: Url,
        payload: &SpecPayload,
    ) -> Result<Value, RegistryError> {
        let mut last_rejection = None;
        for shape in PayloadShape::ALL {
            let body = shape.body(payload);
            match self.send_json(method.clone(), url.clone(), Some(&body)).await {
                Ok(value) => {
                    tracing::debug!(?shape, %method, %url, "Registry accepted payload shape");
                    return Ok(value);
                }
                Err(e) if e.is_payload_rejection() => {
                    tracing::warn!(?shape, error = %e, "Registry rejected payload shape, trying next");
                    last_rejection = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_rejection.unwrap_or_else(|| {
            RegistryError::MalformedResponse("no payload shapes to try".into())
        }))
    }
}

/// Spec id from either `{"spec": {"id": ..}}` or `{"id": ..}`.
pub fn extract_spec_id(response: &Value) -> Result<String, RegistryError> {
    response
        .get("spec")
        .and_then(|s| s.get("id"))
        .and_then(Value::as_str)
        .or_else(|| response.get("id").and_then(Value::as_str))
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| RegistryError::MalformedResponse(format!("no spec id in {response}")))
}

#[async_trait]
impl SpecRegistry for PostmanClient {
    async fn list_specs(&self, workspace_id: &str) -> Result<Vec<SpecSummary>, RegistryError> {
        tracing::info!(workspace_id, "Listing specs in workspace");
        let mut specs = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors = HashSet::new();
        loop {
            let mut url = self.endpoint(&["specs"])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("workspaceId", workspace_id);
                if let Some(c) = &cursor {
                    query.append_pair("cursor", c);
                }
            }
            let value = self.send_json(Method::GET, url, None).await?;
            let page: SpecListResponse = serde_json::from_value(value).map_err(|e| {
                RegistryError::MalformedResponse(format!("spec listing has unexpected shape: {e}"))
            })?;
            specs.extend(page.specs.into_iter().map(|s| SpecSummary {
                id: s.id,
                name: s.name,
            }));
            cursor = page
                .meta
                .and_then(|m| m.next_cursor)
                .filter(|c| !c.is_empty());
            match &cursor {
                None => break,
                Some(c) if !seen_cursors.insert(c.clone()) => {
                    tracing::error!(cursor = %c, "Spec listing repeated a cursor");
                    return Err(RegistryError::MalformedResponse(format!(
                        "spec listing repeated cursor '{c}'"
                    )));
                }
                Some(_) => {}
            }
        }
        tracing::info!(count = specs.len(), "Fetched specs in workspace");
        Ok(specs)
    }

    async fn create_spec(
        &self,
        workspace_id: &str,
        payload: &SpecPayload,
    ) -> Result<String, RegistryError> {
        tracing::info!(workspace_id, spec_name = %payload.name, "Creating spec");
        let mut url = self.endpoint(&["specs"])?;
        url.query_pairs_mut().append_pair("workspaceId", workspace_id);
        let response = self.send_with_shapes(Method::POST, url, payload).await?;
        let id = extract_spec_id(&response)?;
        tracing::info!(spec_id = %id, "Successfully created spec");
        Ok(id)
    }

    async fn update_spec(&self, spec_id: &str, payload: &SpecPayload) -> Result<(), RegistryError> {
        tracing::info!(spec_id, spec_name = %payload.name, "Updating spec");
        let url = self.endpoint(&["specs", spec_id])?;
        self.send_with_shapes(Method::PUT, url, payload).await?;
        tracing::info!(spec_id, "Successfully updated spec");
        Ok(())
    }

    async fn generate_collection(&self, spec_id: &str) -> Result<Vec<String>, RegistryError> {
        tracing::info!(spec_id, "Requesting collection generation");
        let url = self.endpoint(&["specs", spec_id, "generations", "collection"])?;
        let response = self.send_json(Method::POST, url, Some(&json!({}))).await?;
        let mut keys: Vec<String> = response
            .as_object()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}
