//! Error kinds for an ingestion run.
//!
//! Every kind is terminal: the run stops at the first failure and the CLI maps the kind to a
//! process exit code via [`IngestError::exit_code`].

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the ingestion pipeline.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Boxed failure returned by [`crate::contract::GatewayExporter`] implementations.
pub type ExportFailure = Box<dyn std::error::Error + Send + Sync>;

/// Terminal failure of an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// No usable source, or required settings/credentials are missing. Raised before any
    /// network call.
    #[error("configuration error: {message}")]
    Configuration {
        /// What is missing or invalid.
        message: String,
    },

    /// The local specification file could not be read, parsed, or copied.
    #[error("source error: {}: {message}", .path.display())]
    Source {
        /// File that failed.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// The gateway export failed or produced an unusable document.
    #[error("export error: {message}")]
    Export {
        /// Description of the failure.
        message: String,
    },

    /// Pushing the document to the registry failed.
    #[error("sync error: {0}")]
    Sync(#[from] RegistryError),
}

impl IngestError {
    pub fn configuration(message: impl Into<String>) -> Self {
        IngestError::Configuration {
            message: message.into(),
        }
    }

    pub fn source_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        IngestError::Source {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn export(message: impl Into<String>) -> Self {
        IngestError::Export {
            message: message.into(),
        }
    }

    /// Process exit code for this error kind. Usage errors from argument parsing also exit 2.
    pub fn exit_code(&self) -> u8 {
        match self {
            IngestError::Configuration { .. } => 2,
            IngestError::Source { .. } => 3,
            IngestError::Export { .. } => 4,
            IngestError::Sync(_) => 5,
        }
    }
}

/// Failure talking to the spec registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry refused the credentials (401/403).
    #[error("authentication failed (HTTP {status}) calling {url}: {body}")]
    Unauthorized { status: u16, url: String, body: String },

    /// The registry rejected the request body as malformed or unsupported.
    #[error("payload rejected (HTTP {status}) calling {url}: {body}")]
    Rejected { status: u16, url: String, body: String },

    /// Any other non-success status.
    #[error("HTTP {status} calling {url}: {body}")]
    Status { status: u16, url: String, body: String },

    /// Connection, TLS, or timeout failure.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// A success response that does not have the expected shape.
    #[error("unexpected registry response: {0}")]
    MalformedResponse(String),
}

impl RegistryError {
    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        let url = url.into();
        let body = body.into();
        match status {
            401 | 403 => RegistryError::Unauthorized { status, url, body },
            400 | 404 | 405 | 415 | 422 => RegistryError::Rejected { status, url, body },
            _ => RegistryError::Status { status, url, body },
        }
    }

    /// Only a rejected body is worth retrying with a different payload shape.
    pub fn is_payload_rejection(&self) -> bool {
        matches!(self, RegistryError::Rejected { .. })
    }
}
