//! `php.session_timeout`: audit the PHP session timeout and optionally set it.
//!
//! Unlike provisioning, problems here are collected in the report rather
//! than aborting, so the closing audit always runs.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ProvisionError;
use crate::php::{
    apply_session_timeout, PhpRuntime, TimeoutChange, GC_MAXLIFETIME, REPORTED_DIRECTIVES,
};
use crate::validation::parse_hours_to_seconds;

use super::traits::Command;
use super::types::{CommandResult, ExecutionContext};

/// One directive as PHP resolves it after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectiveValue {
    pub key: String,
    pub value: Option<String>,
}

/// Everything the auditor learned and did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionReport {
    pub ini_file: Option<PathBuf>,
    /// `session.gc_maxlifetime` before any change.
    pub previous_value: Option<String>,
    pub requested_hours: Option<String>,
    pub requested_seconds: Option<u64>,
    pub change: Option<TimeoutChange>,
    pub directives: Vec<DirectiveValue>,
    pub failures: Vec<String>,
}

impl SessionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Value of a reported directive after the run.
    pub fn directive(&self, key: &str) -> Option<&str> {
        self.directives
            .iter()
            .find(|d| d.key == key)
            .and_then(|d| d.value.as_deref())
    }

    /// Current session timeout in seconds, if PHP reports a number.
    pub fn gc_maxlifetime_seconds(&self) -> Option<u64> {
        self.directive(GC_MAXLIFETIME)?.trim().parse().ok()
    }

    fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(failure = %message, "Session audit problem");
        self.failures.push(message);
    }
}

/// Audits the session timeout; with `hours`, rewrites it first.
pub struct SessionTimeoutCommand<'a> {
    hours: Option<String>,
    runtime: &'a dyn PhpRuntime,
}

impl<'a> SessionTimeoutCommand<'a> {
    pub fn new(hours: Option<String>, runtime: &'a dyn PhpRuntime) -> Self {
        Self { hours, runtime }
    }

    fn locate_ini(&self, report: &mut SessionReport) {
        match self.runtime.loaded_ini_file() {
            Ok(Some(path)) => {
                debug!(ini_file = %path.display(), "Loaded php.ini");
                report.ini_file = Some(path);
            }
            Ok(None) => report.fail("PHP is running without a loaded php.ini"),
            Err(e) => report.fail(format!("Could not query PHP: {}", e)),
        }

        if report.ini_file.is_some() {
            report.previous_value = self.runtime.ini_get(GC_MAXLIFETIME).ok().flatten();
        }
    }

    fn modify(&self, hours: &str, report: &mut SessionReport) {
        let seconds = match parse_hours_to_seconds(hours) {
            Ok(seconds) => seconds,
            Err(e) => {
                report.fail(e.to_string());
                return;
            }
        };
        report.requested_seconds = Some(seconds);

        let Some(ini_file) = report.ini_file.clone() else {
            report.fail("No php.ini to modify");
            return;
        };

        match apply_session_timeout(&ini_file, seconds) {
            Ok(change) => report.change = Some(change),
            Err(ProvisionError::Permission { message }) => {
                report.fail(format!("Skipped modification: {}", message))
            }
            Err(e) => report.fail(e.to_string()),
        }
    }

    fn audit(&self, report: &mut SessionReport) {
        let mut php_failed = false;

        for key in REPORTED_DIRECTIVES {
            let value = if php_failed {
                None
            } else {
                match self.runtime.ini_get(key) {
                    Ok(value) => value,
                    Err(e) => {
                        // Later keys would fail the same way.
                        php_failed = true;
                        report.fail(format!("Could not read {}: {}", key, e));
                        None
                    }
                }
            };
            report.directives.push(DirectiveValue {
                key: key.to_string(),
                value,
            });
        }

        if php_failed {
            return;
        }
        let mismatch = match (report.requested_seconds, &report.change) {
            (Some(requested), Some(change)) if report.gc_maxlifetime_seconds() != Some(requested) => {
                Some(format!(
                    "{} was written to {} but PHP reports {}",
                    GC_MAXLIFETIME,
                    change.ini_file.display(),
                    report.directive(GC_MAXLIFETIME).unwrap_or("nothing")
                ))
            }
            _ => None,
        };
        if let Some(message) = mismatch {
            report.fail(message);
        }
    }
}

impl Command for SessionTimeoutCommand<'_> {
    type Output = SessionReport;

    fn name(&self) -> &'static str {
        "php.session_timeout"
    }

    fn params(&self) -> serde_json::Value {
        serde_json::json!({ "hours": self.hours })
    }

    /// Bad hours are reported in the audit rather than rejected up front.
    fn validate(&self) -> Result<(), ProvisionError> {
        Ok(())
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<SessionReport, ProvisionError> {
        let mut report = SessionReport {
            requested_hours: self.hours.clone(),
            ..Default::default()
        };

        self.locate_ini(&mut report);
        if let Some(hours) = &self.hours {
            self.modify(hours, &mut report);
        }
        self.audit(&mut report);

        info!(
            run_id = %ctx.run_id,
            modified = report.change.is_some(),
            failures = report.failures.len(),
            "Session audit complete"
        );
        Ok(report)
    }

    fn outcome(&self, report: &SessionReport) -> CommandResult {
        if report.is_success() {
            match serde_json::to_value(report) {
                Ok(data) => CommandResult::success(data),
                Err(e) => CommandResult::failure("SERIALIZATION_ERROR", e.to_string()),
            }
        } else {
            CommandResult::failure("SESSION_AUDIT_FAILED", report.failures.join("; "))
        }
    }
}
