//! Append-only journal file writer.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::JournalConfig;
use crate::error::ProvisionError;

use super::entry::AuditEntry;

/// Writes journal entries as JSON lines.
pub struct AuditLogger {
    file: File,
    path: PathBuf,
}

impl AuditLogger {
    /// Open `path` for appending, creating the parent directory if needed.
    pub fn new(path: &Path) -> Result<Self, ProvisionError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                debug!(path = %parent.display(), "Creating journal directory");
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Append one entry.
    pub fn log(&mut self, entry: &AuditEntry) -> Result<(), ProvisionError> {
        let json = serde_json::to_string(entry)?;
        writeln!(self.file, "{}", json)?;

        if let Err(e) = self.file.sync_data() {
            warn!(error = %e, "Failed to sync journal");
        }

        debug!(run_id = %entry.run_id, command = %entry.command, "Journal entry written");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Whether opening the journal failed only because this user may not write it.
fn is_permission_denied(err: &ProvisionError) -> bool {
    matches!(err, ProvisionError::Io(e) if e.kind() == ErrorKind::PermissionDenied)
}

/// Open the configured journal, or `None` when disabled or unusable.
///
/// An unwritable journal only costs the record of the run, so it is
/// skipped. Unprivileged runs are expected to lack access and are only
/// noted at debug level.
pub fn open_journal(config: &JournalConfig) -> Option<AuditLogger> {
    if !config.enabled {
        debug!("Journal disabled");
        return None;
    }

    match AuditLogger::new(&config.log_path) {
        Ok(logger) => Some(logger),
        Err(e) if is_permission_denied(&e) => {
            debug!(path = %config.log_path.display(), error = %e, "Journal not writable by this user");
            None
        }
        Err(e) => {
            warn!(path = %config.log_path.display(), error = %e, "Journal unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditResult;
    use uuid::Uuid;

    fn entry(command: &str) -> AuditEntry {
        AuditEntry {
            timestamp: "2026-01-15T10:30:45.123Z".to_string(),
            run_id: Uuid::nil(),
            command: command.to_string(),
            params: serde_json::json!({}),
            uid: 1000,
            result: AuditResult::Success { data: None },
            duration_ms: 10,
        }
    }

    #[test]
    fn test_logger_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("subdir/provision.log");

        let logger = AuditLogger::new(&log_path).unwrap();
        assert!(log_path.parent().unwrap().exists());
        assert_eq!(logger.path(), log_path);
    }

    #[test]
    fn test_open_journal_respects_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = JournalConfig {
            enabled: false,
            log_path: dir.path().join("provision.log"),
        };
        assert!(open_journal(&config).is_none());
        assert!(!config.log_path.exists());

        config.enabled = true;
        assert!(open_journal(&config).is_some());
        assert!(config.log_path.exists());

        // A path whose parent is a regular file cannot be opened
        config.log_path = config.log_path.join("nested.log");
        assert!(open_journal(&config).is_none());
    }

    #[test]
    fn test_permission_denied_is_not_a_warning() {
        let denied = ProvisionError::Io(std::io::Error::from(ErrorKind::PermissionDenied));
        assert!(is_permission_denied(&denied));

        let missing = ProvisionError::Io(std::io::Error::from(ErrorKind::NotFound));
        assert!(!is_permission_denied(&missing));
        assert!(!is_permission_denied(&ProvisionError::execution_failed(
            "permission denied"
        )));
    }

    #[test]
    fn test_logger_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("provision.log");

        AuditLogger::new(&log_path).unwrap().log(&entry("site.provision")).unwrap();
        // A second run appends rather than truncates
        AuditLogger::new(&log_path).unwrap().log(&entry("php.session_timeout")).unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["command"], "php.session_timeout");
        assert_eq!(second["result"]["status"], "success");
    }
}
