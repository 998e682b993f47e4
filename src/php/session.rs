//! Session timeout directive editing.
//!
//! Rewrites `session.gc_maxlifetime` in a php.ini file, matching both the
//! active and the commented-out (`;session.gc_maxlifetime = ...`) forms.

use std::fs;
use std::path::{Path, PathBuf};

use nix::unistd::{access, AccessFlags};
use regex::bytes::{NoExpand, Regex};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ProvisionError;

/// Directive holding the session garbage-collection timeout in seconds.
pub const GC_MAXLIFETIME: &str = "session.gc_maxlifetime";

/// Directives shown alongside the timeout in the audit report.
pub const REPORTED_DIRECTIVES: &[&str] = &[
    GC_MAXLIFETIME,
    "session.gc_probability",
    "session.gc_divisor",
    "session.cookie_lifetime",
    "session.save_handler",
    "session.save_path",
];

/// Outcome of a successful rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeoutChange {
    pub ini_file: PathBuf,
    pub backup: PathBuf,
    pub seconds: u64,
    /// Number of existing lines replaced.
    pub replaced_lines: usize,
    /// True when no line matched and the directive was appended.
    pub appended: bool,
}

/// Backup location: the ini path with `.bak` appended.
pub fn backup_path(ini_file: &Path) -> PathBuf {
    let mut name = ini_file.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Whether the ini file can be modified.
///
/// A file whose permission bits carry no write bit counts as read-only even
/// for root, so an explicitly protected php.ini is left alone.
pub fn is_writable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            !meta.permissions().readonly() && access(path, AccessFlags::W_OK).is_ok()
        }
        _ => false,
    }
}

fn directive_regex(key: &str) -> Result<Regex, ProvisionError> {
    // Any byte up to the line ending; CRLF files keep their `\r`.
    let pattern = format!(
        r"(?m)^[ \t]*;?[ \t]*{}[ \t]*=(?-u:[^\r\n])*",
        regex::escape(key)
    );
    Regex::new(&pattern).map_err(|e| {
        ProvisionError::invalid_parameter("ini_key", format!("Bad directive pattern: {}", e))
    })
}

/// Replace every active or commented `key = ...` line with `key = value`.
///
/// Works on raw bytes: php.ini files are not required to be UTF-8.
/// Returns the new content and the number of lines replaced.
pub fn rewrite_directive(
    content: &[u8],
    key: &str,
    value: &str,
) -> Result<(Vec<u8>, usize), ProvisionError> {
    let re = directive_regex(key)?;
    let count = re.find_iter(content).count();
    let line = format!("{} = {}", key, value);
    Ok((
        re.replace_all(content, NoExpand(line.as_bytes())).into_owned(),
        count,
    ))
}

/// Value of the last active (uncommented) `key = value` line, as PHP would
/// resolve it. Surrounding quotes are stripped.
pub fn read_directive(content: impl AsRef<[u8]>, key: &str) -> Option<String> {
    content
        .as_ref()
        .split(|b| *b == b'\n')
        .filter_map(|line| {
            let eq = line.iter().position(|b| *b == b'=')?;
            let name = String::from_utf8_lossy(&line[..eq]);
            if name.trim() != key {
                return None;
            }
            let rest = &line[eq + 1..];
            let value = rest.split(|b| *b == b';').next().unwrap_or_default();
            let value = String::from_utf8_lossy(value);
            Some(value.trim().trim_matches('"').to_string())
        })
        .last()
}

fn line_ending(content: &[u8]) -> &'static [u8] {
    if content.windows(2).any(|w| w == b"\r\n") {
        b"\r\n"
    } else {
        b"\n"
    }
}

/// Back up `ini_file` and set its session timeout to `seconds`.
///
/// Fails without touching the file if it is missing or not writable.
pub fn apply_session_timeout(ini_file: &Path, seconds: u64) -> Result<TimeoutChange, ProvisionError> {
    if !ini_file.is_file() {
        return Err(ProvisionError::execution_failed(format!(
            "PHP ini file {} does not exist",
            ini_file.display()
        )));
    }

    if !is_writable(ini_file) {
        return Err(ProvisionError::Permission {
            message: format!("{} is not writable", ini_file.display()),
        });
    }

    let content = fs::read(ini_file)?;

    let backup = backup_path(ini_file);
    fs::copy(ini_file, &backup).map_err(|e| {
        ProvisionError::execution_failed(format!(
            "Failed to back up {} to {}: {}",
            ini_file.display(),
            backup.display(),
            e
        ))
    })?;
    debug!(backup = %backup.display(), "PHP ini backed up");

    let value = seconds.to_string();
    let (mut updated, replaced_lines) = rewrite_directive(&content, GC_MAXLIFETIME, &value)?;
    let appended = replaced_lines == 0;
    if appended {
        let eol = line_ending(&content);
        if !updated.is_empty() && !updated.ends_with(b"\n") {
            updated.extend_from_slice(eol);
        }
        updated.extend_from_slice(format!("{} = {}", GC_MAXLIFETIME, value).as_bytes());
        updated.extend_from_slice(eol);
    }

    // Write in place so ownership and mode are preserved.
    fs::write(ini_file, &updated)?;

    if read_directive(&updated, GC_MAXLIFETIME).as_deref() != Some(value.as_str()) {
        return Err(ProvisionError::execution_failed(format!(
            "{} does not resolve to {} after rewrite",
            GC_MAXLIFETIME, value
        )));
    }

    info!(
        ini_file = %ini_file.display(),
        seconds,
        replaced_lines,
        appended,
        "Session timeout updated"
    );

    Ok(TimeoutChange {
        ini_file: ini_file.to_path_buf(),
        backup,
        seconds,
        replaced_lines,
        appended,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const SAMPLE: &str = "[Session]\n\
        session.save_handler = files\n\
        ; After this number of seconds, stored data will be seen as 'garbage'\n\
        session.gc_maxlifetime = 1440\n\
        session.gc_divisor = 1000\n";

    #[test]
    fn test_rewrite_active_line() {
        let (out, count) = rewrite_directive(SAMPLE.as_bytes(), GC_MAXLIFETIME, "3600").unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(count, 1);
        assert!(out.contains("session.gc_maxlifetime = 3600\n"));
        assert!(!out.contains("1440"));
        assert!(out.contains("stored data will be seen as 'garbage'"));
    }

    #[test]
    fn test_rewrite_commented_line() {
        let content = "  ;session.gc_maxlifetime=1440\n";
        let (out, count) = rewrite_directive(content.as_bytes(), GC_MAXLIFETIME, "1800").unwrap();
        assert_eq!(count, 1);
        assert_eq!(out, b"session.gc_maxlifetime = 1800\n");
    }

    #[test]
    fn test_rewrite_ignores_similar_keys() {
        let content = "session.gc_maxlifetime_extra = 5\nxsession.gc_maxlifetime = 5\n";
        let (out, count) = rewrite_directive(content.as_bytes(), GC_MAXLIFETIME, "60").unwrap();
        assert_eq!(count, 0);
        assert_eq!(out, content.as_bytes());
    }

    #[test]
    fn test_rewrite_keeps_crlf_endings() {
        let content = b"a = 1\r\nsession.gc_maxlifetime = 1440\r\nb = 2\r\n";
        let (out, count) = rewrite_directive(content, GC_MAXLIFETIME, "60").unwrap();
        assert_eq!(count, 1);
        assert_eq!(out, b"a = 1\r\nsession.gc_maxlifetime = 60\r\nb = 2\r\n");
        assert_eq!(read_directive(&out, GC_MAXLIFETIME), Some("60".to_string()));
    }

    #[test]
    fn test_apply_handles_latin1_comments() {
        let dir = tempfile::tempdir().unwrap();
        let ini = dir.path().join("php.ini");
        let original = b"; Konfiguration f\xfcr Sitzungen\nsession.gc_maxlifetime = 1440\n";
        fs::write(&ini, original).unwrap();

        apply_session_timeout(&ini, 7200).unwrap();

        assert_eq!(
            fs::read(&ini).unwrap(),
            b"; Konfiguration f\xfcr Sitzungen\nsession.gc_maxlifetime = 7200\n"
        );
        assert_eq!(fs::read(backup_path(&ini)).unwrap(), original);
    }

    #[test]
    fn test_apply_appends_with_crlf() {
        let dir = tempfile::tempdir().unwrap();
        let ini = dir.path().join("php.ini");
        fs::write(&ini, "[PHP]\r\nmemory_limit = 128M").unwrap();

        let change = apply_session_timeout(&ini, 60).unwrap();
        assert!(change.appended);
        assert_eq!(
            fs::read_to_string(&ini).unwrap(),
            "[PHP]\r\nmemory_limit = 128M\r\nsession.gc_maxlifetime = 60\r\n"
        );
    }

    #[test]
    fn test_read_directive() {
        assert_eq!(read_directive(SAMPLE, GC_MAXLIFETIME), Some("1440".to_string()));
        assert_eq!(
            read_directive("session.save_path = \"/var/lib/php/sessions\"\n", "session.save_path"),
            Some("/var/lib/php/sessions".to_string())
        );
        assert_eq!(read_directive(";session.gc_maxlifetime = 10\n", GC_MAXLIFETIME), None);
        assert_eq!(
            read_directive("session.gc_maxlifetime = 10\nsession.gc_maxlifetime = 20\n", GC_MAXLIFETIME),
            Some("20".to_string())
        );
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/etc/php/8.3/cli/php.ini")),
            PathBuf::from("/etc/php/8.3/cli/php.ini.bak")
        );
    }

    #[test]
    fn test_apply_writes_backup_and_value() {
        let dir = tempfile::tempdir().unwrap();
        let ini = dir.path().join("php.ini");
        fs::write(&ini, SAMPLE).unwrap();

        let change = apply_session_timeout(&ini, 3600).unwrap();
        assert_eq!(change.replaced_lines, 1);
        assert!(!change.appended);
        assert_eq!(fs::read_to_string(&change.backup).unwrap(), SAMPLE);
        assert_eq!(
            read_directive(&fs::read_to_string(&ini).unwrap(), GC_MAXLIFETIME),
            Some("3600".to_string())
        );
    }

    #[test]
    fn test_apply_appends_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let ini = dir.path().join("php.ini");
        fs::write(&ini, "memory_limit = 128M").unwrap();

        let change = apply_session_timeout(&ini, 1800).unwrap();
        assert!(change.appended);
        assert_eq!(
            fs::read_to_string(&ini).unwrap(),
            "memory_limit = 128M\nsession.gc_maxlifetime = 1800\n"
        );
    }

    #[test]
    fn test_apply_refuses_read_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let ini = dir.path().join("php.ini");
        fs::write(&ini, SAMPLE).unwrap();
        fs::set_permissions(&ini, fs::Permissions::from_mode(0o444)).unwrap();

        let result = apply_session_timeout(&ini, 3600);
        assert!(matches!(result, Err(ProvisionError::Permission { .. })));
        assert!(!backup_path(&ini).exists());
        assert_eq!(fs::read_to_string(&ini).unwrap(), SAMPLE);
    }

    #[test]
    fn test_apply_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = apply_session_timeout(&dir.path().join("absent.ini"), 3600);
        assert!(result.is_err());
    }
}
