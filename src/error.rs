//! Pipeline errors
//!
//! Every error here ends the current run. Unsupported but well-formed input
//! never becomes an error; it is reported as a skip in the routing report.

use thiserror::Error;

/// Broad classification used by the caller when logging a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing fields, bad JSON, bad timestamps, unknown change kinds
    MalformedInput,
    /// S3 delivery failures, blob fetch failures, CMDB submission failures
    Upstream,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unparsable timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("unknown change type {change_type:?} for {property}")]
    UnknownChangeType {
        property: String,
        change_type: String,
    },

    #[error("not implemented: {0}")]
    Unimplemented(String),

    #[error("S3 delivery failed: {code} - {message}")]
    StorageDelivery { code: String, message: String },

    #[error("failed to fetch s3://{bucket}/{key}: {source:#}")]
    Storage {
        bucket: String,
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to submit to {url}: {reason}")]
    Submission { url: String, reason: String },
}

impl PipelineError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput(_)
            | Self::Json(_)
            | Self::Timestamp { .. }
            | Self::UnknownChangeType { .. }
            | Self::Unimplemented(_) => ErrorKind::MalformedInput,
            Self::StorageDelivery { .. } | Self::Storage { .. } | Self::Submission { .. } => {
                ErrorKind::Upstream
            }
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
