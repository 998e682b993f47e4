//! Command results and execution context.

use chrono::{DateTime, SecondsFormat, Utc};
use nix::unistd::geteuid;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditResult};
use crate::error::ProvisionError;

/// Result of command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CommandResult {
    /// Create a success result with data.
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error_code: None,
            error_message: None,
        }
    }

    /// Create a failure result.
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error_code: Some(code.into()),
            error_message: Some(message.into()),
        }
    }

    pub fn from_error(error: &ProvisionError) -> Self {
        Self::failure(error.code(), error.to_string())
    }
}

impl From<&CommandResult> for AuditResult {
    fn from(result: &CommandResult) -> Self {
        if result.success {
            AuditResult::Success {
                data: result.data.clone(),
            }
        } else {
            AuditResult::Failure {
                error_code: result.error_code.clone().unwrap_or_default(),
                error_message: result.error_message.clone().unwrap_or_default(),
            }
        }
    }
}

/// Metadata for one run of a command.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Effective uid of this process.
    pub uid: u32,
    pub command: String,
}

impl ExecutionContext {
    pub fn new(command: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            uid: geteuid().as_raw(),
            command: command.to_string(),
        }
    }

    /// Build the journal line for this run.
    pub fn journal_entry(
        &self,
        params: serde_json::Value,
        result: &CommandResult,
        duration_ms: u64,
    ) -> AuditEntry {
        AuditEntry {
            timestamp: self.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            run_id: self.run_id,
            command: self.command.clone(),
            params,
            uid: self.uid,
            result: result.into(),
            duration_ms,
        }
    }
}
