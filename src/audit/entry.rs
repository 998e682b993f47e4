//! Journal entry types.

use serde::Serialize;
use uuid::Uuid;

/// A single journal line.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// RFC 3339 timestamp of when the run started.
    pub timestamp: String,
    pub run_id: Uuid,
    /// Procedure name, e.g. `site.provision`.
    pub command: String,
    pub params: serde_json::Value,
    /// Effective uid of the invoking process.
    pub uid: u32,
    pub result: AuditResult,
    pub duration_ms: u64,
}

/// Outcome recorded in the journal.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status")]
pub enum AuditResult {
    #[serde(rename = "success")]
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    #[serde(rename = "failure")]
    Failure {
        error_code: String,
        error_message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(result: AuditResult) -> AuditEntry {
        AuditEntry {
            timestamp: "2026-01-15T10:30:45.123Z".to_string(),
            run_id: Uuid::nil(),
            command: "site.provision".to_string(),
            params: serde_json::json!({"domain": "example.com"}),
            uid: 0,
            result,
            duration_ms: 15,
        }
    }

    #[test]
    fn test_success_serialization() {
        let json = serde_json::to_string(&entry(AuditResult::Success {
            data: Some(serde_json::json!({"fpm": "php8.3"})),
        }))
        .unwrap();
        assert!(json.contains("\"status\":\"success\""));
        assert!(json.contains("\"command\":\"site.provision\""));
        assert!(json.contains("\"duration_ms\":15"));
    }

    #[test]
    fn test_failure_serialization() {
        let json = serde_json::to_string(&entry(AuditResult::Failure {
            error_code: "DETECTION_FAILED".to_string(),
            error_message: "No PHP-FPM socket found".to_string(),
        }))
        .unwrap();
        assert!(json.contains("\"status\":\"failure\""));
        assert!(json.contains("\"error_code\":\"DETECTION_FAILED\""));
    }

    #[test]
    fn test_success_without_data() {
        let json = serde_json::to_string(&AuditResult::Success { data: None }).unwrap();
        assert_eq!(json, r#"{"status":"success"}"#);
    }
}
