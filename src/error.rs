//! Error types for taskmaster
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad path, bad metadata, bad arguments or config)
//! - 3: Target state (missing task or project, destination already taken)
//! - 4: Operation failed (IO, lock timeout, unreadable document)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the taskmaster CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const TARGET_STATE: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for store, search and adapter operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Invalid {field}: {reason}")]
    InvalidMetadata { field: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Target state (exit code 3)
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    // Operation failures (exit code 4)
    #[error("Unreadable task document {path}: {reason}")]
    InvalidDocument { path: String, reason: String },

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_metadata(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidMetadata {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidPath { .. }
            | Error::InvalidMetadata { .. }
            | Error::InvalidArgument(_)
            | Error::InvalidConfig(_) => exit_codes::USER_ERROR,

            // Target state
            Error::NotFound(_) | Error::AlreadyExists(_) | Error::ProjectNotFound(_) => {
                exit_codes::TARGET_STATE
            }

            // Operation failures
            Error::InvalidDocument { .. }
            | Error::LockFailed(_)
            | Error::Io(_)
            | Error::Walk(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::Yaml(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidPath { .. } => "invalid_path",
            Error::InvalidMetadata { .. } => "invalid_metadata",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::InvalidConfig(_) => "invalid_config",
            Error::NotFound(_) => "not_found",
            Error::AlreadyExists(_) => "already_exists",
            Error::ProjectNotFound(_) => "project_not_found",
            Error::InvalidDocument { .. } => "invalid_document",
            Error::LockFailed(_) => "lock_failed",
            Error::Io(_) | Error::Walk(_) => "io",
            Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::Yaml(_) => "serialization",
        }
    }

    /// Structured details naming the offending input, when there is one.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::InvalidPath { path, reason } => {
                Some(serde_json::json!({ "path": path, "reason": reason }))
            }
            Error::InvalidMetadata { field, reason } => {
                Some(serde_json::json!({ "field": field, "reason": reason }))
            }
            Error::NotFound(path) | Error::AlreadyExists(path) => {
                Some(serde_json::json!({ "path": path }))
            }
            Error::ProjectNotFound(project) => Some(serde_json::json!({ "project": project })),
            Error::InvalidDocument { path, .. } => Some(serde_json::json!({ "path": path })),
            _ => None,
        }
    }
}

/// Result type alias for taskmaster operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            details: err.details(),
        }
    }
}
