use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("no API key was entered and {var} is not set")]
    MissingCredential { var: String },

    #[error("Vector store directory not found at: {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("download of {url} failed with status {status}")]
    Download { url: String, status: StatusCode },

    #[error("index snapshot {}: line {line}: {reason}", path.display())]
    Snapshot {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("query embedding has {got} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("completion request failed: {status} {body}")]
    Completion { status: StatusCode, body: String },

    #[error("completion stream error: {0}")]
    Stream(String),

    #[error("{method} {url} failed: {status} {body}")]
    HttpStatus {
        method: &'static str,
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("{url}: could not decode response: {reason}")]
    Decode { url: String, reason: String },

    #[error("{url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RagError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RagError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn http(url: &str, source: reqwest::Error) -> Self {
        RagError::Http {
            url: url.to_string(),
            source,
        }
    }
}
