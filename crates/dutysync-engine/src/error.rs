//! Error types for dutysync-engine operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DutyError {
    #[error("Malformed spec: {field}: {reason}")]
    MalformedSpec { field: String, reason: String },

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Cannot read document: {0}")]
    Io(#[from] std::io::Error),
}

impl DutyError {
    pub(crate) fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DutyError::MalformedSpec {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DutyError>;

/// Why a remote call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// Network or protocol failure.
    Transport,
    /// Credentials rejected.
    Auth,
    /// The per-call timeout elapsed.
    Timeout,
    /// The remote entity does not exist.
    NotFound,
    /// The service refused the payload.
    Rejected,
    /// The operation is not offered by this service.
    Unsupported,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteErrorKind::Transport => "transport",
            RemoteErrorKind::Auth => "auth",
            RemoteErrorKind::Timeout => "timeout",
            RemoteErrorKind::NotFound => "not found",
            RemoteErrorKind::Rejected => "rejected",
            RemoteErrorKind::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// The remote state could not be read. Fatal for a reconciliation run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A single mutation failed. Collected per operation, never fatal to the run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}{}: {message}", remote_id_suffix(.remote_id))]
pub struct MutationError {
    pub kind: RemoteErrorKind,
    pub remote_id: Option<String>,
    pub message: String,
}

fn remote_id_suffix(remote_id: &Option<String>) -> String {
    remote_id
        .as_ref()
        .map(|id| format!(" ({id})"))
        .unwrap_or_default()
}

impl MutationError {
    pub fn new(kind: RemoteErrorKind, remote_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            remote_id: remote_id.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == RemoteErrorKind::Timeout
    }
}
