//! Error types for Ringline Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Call record store error: {0}")]
    Store(String),

    #[error("Push platform error: {0}")]
    Platform(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Server misconfigured: {0}")]
    NotConfigured(String),

    #[error("Upstream provider failed: {0}")]
    Upstream(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Illegal call status transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Error::Network(e.to_string())
        } else {
            Error::Http(e.to_string())
        }
    }
}
