//! PHP-FPM socket detection.
//!
//! The CLI interpreter's version is tried first against the conventional
//! `php<major.minor>-fpm.sock`; otherwise existing sockets are scanned.

use std::fmt;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ProvisionError;

use super::runtime::PhpRuntime;

const SOCKET_SUFFIX: &str = "-fpm.sock";

/// How the PHP-FPM identity was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    /// The CLI version matched an existing socket.
    CliVersion,
    /// Parsed from the first socket found in the socket directory.
    SocketScan,
}

/// A detected PHP-FPM pool, e.g. `php8.3` at `/run/php/php8.3-fpm.sock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FpmIdentity {
    pub name: String,
    pub socket: PathBuf,
    pub source: DetectionSource,
}

impl fmt::Display for FpmIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.socket.display())
    }
}

/// Expected socket path for a CLI version such as `8.3`.
pub fn socket_for_version(socket_dir: &Path, version: &str) -> PathBuf {
    socket_dir.join(format!("php{}{}", version, SOCKET_SUFFIX))
}

/// Extract the identifier from a socket file name.
///
/// `php8.3-fpm.sock` yields `php8.3`. Names without a numeric version
/// (`php-fpm.sock`, `phpfoo-fpm.sock`) yield `None`.
pub fn parse_socket_name(file_name: &str) -> Option<String> {
    let version = file_name
        .strip_suffix(SOCKET_SUFFIX)?
        .strip_prefix("php")?;

    let well_formed = !version.is_empty()
        && version.split('.').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_digit())
        });

    well_formed.then(|| format!("php{}", version))
}

/// Detect the PHP-FPM pool from an already-known CLI version.
///
/// Kept separate from [`detect`] so the decision logic does not need a
/// live interpreter.
pub fn detect_from(
    cli_version: Option<&str>,
    socket_dir: &Path,
) -> Result<FpmIdentity, ProvisionError> {
    if let Some(version) = cli_version {
        let socket = socket_for_version(socket_dir, version);
        if socket.exists() {
            return Ok(FpmIdentity {
                name: format!("php{}", version),
                socket,
                source: DetectionSource::CliVersion,
            });
        }
        debug!(
            version,
            expected = %socket.display(),
            "No socket for CLI version, scanning"
        );
    }

    scan_sockets(socket_dir)?.ok_or_else(|| ProvisionError::Detection {
        message: format!(
            "No PHP-FPM socket found in {} (is php-fpm installed and running?)",
            socket_dir.display()
        ),
    })
}

/// Detect the PHP-FPM pool, asking the interpreter for its version first.
///
/// An unusable interpreter is not fatal; the socket scan still runs.
pub fn detect(
    runtime: &dyn PhpRuntime,
    socket_dir: &Path,
) -> Result<FpmIdentity, ProvisionError> {
    let version = match runtime.version() {
        Ok(version) => Some(version),
        Err(e) => {
            warn!(error = %e, "Could not query PHP CLI version");
            None
        }
    };

    let identity = detect_from(version.as_deref(), socket_dir)?;
    info!(
        fpm = %identity.name,
        socket = %identity.socket.display(),
        source = ?identity.source,
        "PHP-FPM detected"
    );
    Ok(identity)
}

fn scan_sockets(socket_dir: &Path) -> Result<Option<FpmIdentity>, ProvisionError> {
    let pattern = format!(
        "{}/php*{}",
        Pattern::escape(&socket_dir.to_string_lossy()),
        SOCKET_SUFFIX
    );

    let mut candidates: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| ProvisionError::Detection {
            message: format!("Invalid socket pattern '{}': {}", pattern, e),
        })?
        .filter_map(Result::ok)
        .collect();
    candidates.sort();

    for socket in candidates {
        let Some(file_name) = socket.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(name) = parse_socket_name(file_name) {
            return Ok(Some(FpmIdentity {
                name,
                socket,
                source: DetectionSource::SocketScan,
            }));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_parse_socket_name() {
        assert_eq!(parse_socket_name("php8.3-fpm.sock"), Some("php8.3".to_string()));
        assert_eq!(parse_socket_name("php7.4-fpm.sock"), Some("php7.4".to_string()));
        assert_eq!(parse_socket_name("php-fpm.sock"), None);
        assert_eq!(parse_socket_name("phpX-fpm.sock"), None);
        assert_eq!(parse_socket_name("php8..3-fpm.sock"), None);
        assert_eq!(parse_socket_name("php8.3-fpm.pid"), None);
    }

    #[test]
    fn test_cli_version_with_matching_socket() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "php8.2-fpm.sock");
        touch(dir.path(), "php8.3-fpm.sock");

        let identity = detect_from(Some("8.3"), dir.path()).unwrap();
        assert_eq!(identity.name, "php8.3");
        assert_eq!(identity.socket, dir.path().join("php8.3-fpm.sock"));
        assert_eq!(identity.source, DetectionSource::CliVersion);
    }

    #[test]
    fn test_falls_back_to_socket_scan() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "php8.3-fpm.sock");

        let identity = detect_from(Some("8.2"), dir.path()).unwrap();
        assert_eq!(identity.name, "php8.3");
        assert_eq!(identity.source, DetectionSource::SocketScan);
    }

    #[test]
    fn test_scan_without_cli_picks_first_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "php8.4-fpm.sock");
        touch(dir.path(), "php8.1-fpm.sock");
        touch(dir.path(), "php-fpm.sock");

        let identity = detect_from(None, dir.path()).unwrap();
        assert_eq!(identity.name, "php8.1");
    }

    #[test]
    fn test_nothing_found_is_detection_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "mysqld.sock");

        let result = detect_from(Some("8.3"), dir.path());
        assert!(matches!(result, Err(ProvisionError::Detection { .. })));
    }

    #[test]
    fn test_missing_directory_is_detection_error() {
        let result = detect_from(None, Path::new("/nonexistent/run/php"));
        assert!(matches!(result, Err(ProvisionError::Detection { .. })));
    }
}
