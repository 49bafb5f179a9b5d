//! In-process stand-in for the Postman Spec Hub API.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};

pub const API_KEY: &str = "PMAK-test";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Value,
}

#[derive(Debug, Default)]
pub struct StubState {
    /// (id, name, content)
    pub specs: Vec<(String, String, String)>,
    pub requests: Vec<RecordedRequest>,
    /// Top-level body keys that make create/update answer 422 ("name", "specName", "spec").
    pub reject_keys: Vec<&'static str>,
    /// Page size for listings; 0 returns everything at once.
    pub page_size: usize,
    /// When set, every listing page points at this same cursor.
    pub stuck_cursor: Option<&'static str>,
}

impl StubState {
    pub fn with_spec(mut self, id: &str, name: &str) -> Self {
        self.specs.push((id.into(), name.into(), String::new()));
        self
    }

    pub fn requests_matching(&self, method: &str, path_prefix: &str) -> Vec<RecordedRequest> {
        self.requests
            .iter()
            .filter(|r| r.method == method && r.path.starts_with(path_prefix))
            .cloned()
            .collect()
    }
}

pub type SharedState = Arc<Mutex<StubState>>;

/// Name and content from whichever payload shape was sent.
fn name_and_content(body: &Value) -> (String, String) {
    let flat = body.get("spec").unwrap_or(body);
    let name = flat
        .get("name")
        .or_else(|| flat.get("specName"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let content = flat
        .get("schema")
        .or_else(|| flat.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    (name, content)
}

fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    query?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| v.to_string())
    })
}

async fn handle(State(state): State<SharedState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    let path = parts.uri.path().to_string();
    let query = parts.uri.query().map(str::to_owned);

    let mut s = state.lock().unwrap();
    s.requests.push(RecordedRequest {
        method: parts.method.to_string(),
        path: path.clone(),
        query: query.clone(),
        body: body.clone(),
    });

    let key = parts.headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if key != Some(API_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"name": "AuthenticationError", "message": "Invalid API Key"}})),
        )
            .into_response();
    }

    let rejected = body
        .as_object()
        .map(|o| s.reject_keys.iter().any(|k| o.contains_key(*k)))
        .unwrap_or(false);

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match (parts.method.as_str(), segments.as_slice()) {
        ("GET", ["specs"]) => {
            let all: Vec<Value> = s
                .specs
                .iter()
                .map(|(id, name, _)| json!({"id": id, "name": name, "type": "OPENAPI:3.0"}))
                .collect();
            if let Some(cursor) = s.stuck_cursor {
                return Json(json!({ "specs": all, "meta": { "nextCursor": cursor } }))
                    .into_response();
            }
            if s.page_size == 0 {
                return Json(json!({ "specs": all })).into_response();
            }
            let offset: usize = query_param(query.as_deref(), "cursor")
                .and_then(|c| c.parse().ok())
                .unwrap_or(0);
            let end = (offset + s.page_size).min(all.len());
            let next = (end < all.len()).then(|| end.to_string());
            let page = all[offset.min(end)..end].to_vec();
            Json(json!({ "specs": page, "meta": { "nextCursor": next } }))
                .into_response()
        }
        ("POST", ["specs"]) => {
            if rejected {
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"error": "invalidParamsError"})))
                    .into_response();
            }
            let (name, content) = name_and_content(&body);
            let id = format!("spec-{}", s.specs.len() + 1);
            s.specs.push((id.clone(), name, content));
            Json(json!({ "spec": { "id": id } })).into_response()
        }
        ("PUT", ["specs", id]) => {
            if rejected {
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"error": "invalidParamsError"})))
                    .into_response();
            }
            let (name, content) = name_and_content(&body);
            match s.specs.iter_mut().find(|entry| entry.0 == *id) {
                Some(entry) => {
                    entry.1 = name;
                    entry.2 = content;
                    // Some deployments answer updates with an empty body.
                    StatusCode::OK.into_response()
                }
                None => StatusCode::NOT_FOUND.into_response(),
            }
        }
        ("POST", ["specs", id, "generations", "collection"]) => (
            StatusCode::ACCEPTED,
            Json(json!({ "taskId": "task-1", "url": format!("/specs/{id}/tasks/task-1") })),
        )
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Starts the stub on an ephemeral port and returns its base URL.
pub async fn start(state: StubState) -> (String, SharedState) {
    let shared: SharedState = Arc::new(Mutex::new(state));
    let app = Router::new().fallback(handle).with_state(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr: SocketAddr = listener.local_addr().expect("listener addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve stub registry");
    });

    (format!("http://{addr}"), shared)
}
