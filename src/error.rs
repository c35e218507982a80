//! Error types for the ingestion pipeline.
//!
//! Anything in here is fatal for the run. Recoverable shape irregularities are
//! reported as [`crate::normalize::Diagnostic`] values instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout, or body read failure
    #[error("HTTP request for page {page} failed: {source}")]
    Transport {
        page: u32,
        #[source]
        source: reqwest::Error,
    },

    /// A successful response whose body is not a page of jobs
    #[error("Failed to decode page {page}: {source}")]
    Decode {
        page: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Job record has no `id`")]
    MissingId,

    #[error("Job ID {job_id} is missing required field `{field}`")]
    MissingField { job_id: i64, field: &'static str },

    #[error("Job ID {job_id} has an invalid `{field}` field: {reason}")]
    InvalidField {
        job_id: i64,
        field: &'static str,
        reason: String,
    },

    #[error("Job ID {job_id} has no entry in `levels`")]
    MissingLevel { job_id: i64 },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database {} is locked by another process", path.display())]
    Locked { path: PathBuf },

    #[error("Failed to open database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Invalid table name '{0}'")]
    InvalidTableName(String),

    #[error("Failed to serialize a row for table '{table}': {source}")]
    Serialize {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
