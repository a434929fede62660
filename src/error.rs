// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for tidyfile

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tidyfile operations
pub type Result<T> = std::result::Result<T, TidyError>;

/// Crate-level error
#[derive(Error, Debug)]
pub enum TidyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scan error: {0}")]
    Scan(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Move error: {0}")]
    Move(#[from] MoveError),

    #[error("History error: {0}")]
    History(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure talking to the categorization provider
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Missing API key: set `api_key` in the config or the {0} environment variable")]
    MissingApiKey(String),

    #[error("Provider unreachable: {0}")]
    Unavailable(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Failure relocating a single item
#[derive(Error, Debug)]
pub enum MoveError {
    #[error("Destination already exists: {0}")]
    Collision(PathBuf),

    #[error("Permission denied moving {path:?}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source no longer exists: {0}")]
    SourceMissing(PathBuf),

    #[error("Cannot move folder {0:?} into itself")]
    IntoItself(PathBuf),

    #[error("I/O error moving {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MoveError {
    /// Classify an I/O failure raised while moving `path`
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => MoveError::PermissionDenied { path, source },
            std::io::ErrorKind::NotFound => MoveError::SourceMissing(path),
            std::io::ErrorKind::AlreadyExists => MoveError::Collision(path),
            _ => MoveError::Io { path, source },
        }
    }
}
