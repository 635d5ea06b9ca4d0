//! # Pipeline Errors
//!
//! Every stage returns `Result<_, TideError>`. The binary matches on the
//! final result once, logs it with the failing stage attached, and leaves the
//! previously published page in place.

use reqwest::StatusCode;
use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors that can end a run.
#[derive(Error, Debug)]
pub enum TideError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// NIWA answered with a non-success status
    #[error("{url} returned {status}")]
    Status { status: StatusCode, url: String },

    /// API payload was not the expected JSON shape
    #[error("invalid tide JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An event time could not be read as a date and time
    #[error("unparsable tide timestamp {value:?}")]
    Timestamp { value: String },

    /// Writing or renaming the page failed
    #[error("publish to {}: {source}", path.display())]
    Publish {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Settings or API key file is missing or malformed
    #[error("config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl TideError {
    /// Pipeline stage the error came from, for log context.
    pub fn stage(&self) -> &'static str {
        match self {
            TideError::Transport(_) | TideError::Status { .. } => "query",
            TideError::Json(_) | TideError::Timestamp { .. } => "extract",
            TideError::Publish { .. } => "publish",
            TideError::Config { .. } => "config",
        }
    }

    /// Upstream HTTP status, when the failure was a bad response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TideError::Status { status, .. } => Some(*status),
            TideError::Transport(err) => err.status(),
            _ => None,
        }
    }

    pub(crate) fn config(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        TideError::Config {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn publish(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TideError::Publish {
            path: path.into(),
            source,
        }
    }
}
