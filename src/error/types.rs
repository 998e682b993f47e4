//! Error types for provisioning and auditing.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for both procedures.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors.
    #[error("Validation error: {kind}")]
    Validation { kind: ValidationErrorKind },

    /// External command errors.
    #[error("Command error: {kind}")]
    Command { kind: CommandErrorKind },

    /// Template-related errors.
    #[error("Template error: {message}")]
    Template { message: String },

    /// PHP-FPM detection failed.
    #[error("Detection error: {message}")]
    Detection { message: String },

    /// The operation needs privileges the process does not have.
    #[error("Permission denied: {message}")]
    Permission { message: String },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Validation error kinds.
#[derive(Error, Debug)]
pub enum ValidationErrorKind {
    #[error("Path traversal detected in: {path}")]
    PathTraversal { path: PathBuf },

    #[error("Missing required parameter: {param}")]
    MissingParameter { param: String },

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },
}

/// Command error kinds.
#[derive(Error, Debug)]
pub enum CommandErrorKind {
    #[error("Command execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("{program} exited with status {code:?}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },
}

impl ProvisionError {
    /// Shorthand for an invalid parameter error.
    pub fn invalid_parameter(param: &str, message: impl Into<String>) -> Self {
        ProvisionError::Validation {
            kind: ValidationErrorKind::InvalidParameter {
                param: param.to_string(),
                message: message.into(),
            },
        }
    }

    /// Shorthand for a failed execution step.
    pub fn execution_failed(message: impl Into<String>) -> Self {
        ProvisionError::Command {
            kind: CommandErrorKind::ExecutionFailed {
                message: message.into(),
            },
        }
    }

    /// Stable machine-readable code, used in command results and the run journal.
    pub fn code(&self) -> &'static str {
        match self {
            ProvisionError::Config { .. } => "CONFIG_ERROR",
            ProvisionError::Validation { .. } => "VALIDATION_ERROR",
            ProvisionError::Command {
                kind: CommandErrorKind::Timeout { .. },
            } => "COMMAND_TIMEOUT",
            ProvisionError::Command { .. } => "COMMAND_FAILED",
            ProvisionError::Template { .. } => "TEMPLATE_ERROR",
            ProvisionError::Detection { .. } => "DETECTION_FAILED",
            ProvisionError::Permission { .. } => "PERMISSION_DENIED",
            ProvisionError::Io(_) => "IO_ERROR",
            ProvisionError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// Result type alias for provisioning operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;
