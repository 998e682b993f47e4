//! PHP interpreter introspection.

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::ProvisionError;
use crate::executor::SubprocessBuilder;

/// Read-only view of the PHP installation.
///
/// The live implementation asks the `php` binary; tests substitute an
/// in-process fake.
pub trait PhpRuntime {
    /// `major.minor` of the CLI interpreter, e.g. `8.3`.
    fn version(&self) -> Result<String, ProvisionError>;

    /// The `php.ini` actually loaded, or `None` when PHP runs without one.
    fn loaded_ini_file(&self) -> Result<Option<PathBuf>, ProvisionError>;

    /// Current value of an ini directive, or `None` if PHP does not know it.
    fn ini_get(&self, key: &str) -> Result<Option<String>, ProvisionError>;
}

/// `PhpRuntime` backed by `php -r`.
pub struct PhpCli {
    binary: String,
    timeout: Duration,
}

impl PhpCli {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Evaluate a snippet and return its stdout.
    fn eval(&self, code: &str) -> Result<String, ProvisionError> {
        let result = SubprocessBuilder::new(&self.binary)
            .args(["-d", "display_errors=stderr", "-r", code])
            .timeout(self.timeout)
            .run()?
            .check(&self.binary)?;
        Ok(result.stdout)
    }
}

impl PhpRuntime for PhpCli {
    fn version(&self) -> Result<String, ProvisionError> {
        let out = self.eval(r#"echo PHP_MAJOR_VERSION . "." . PHP_MINOR_VERSION;"#)?;
        let version = out.trim().to_string();
        debug!(binary = %self.binary, version = %version, "PHP CLI version");
        if version.is_empty() {
            return Err(ProvisionError::execution_failed(format!(
                "{} reported an empty version",
                self.binary
            )));
        }
        Ok(version)
    }

    fn loaded_ini_file(&self) -> Result<Option<PathBuf>, ProvisionError> {
        let out = self.eval("echo json_encode(php_ini_loaded_file());")?;
        match decode_json_scalar(&out)? {
            Some(path) if !path.is_empty() => Ok(Some(PathBuf::from(path))),
            _ => Ok(None),
        }
    }

    fn ini_get(&self, key: &str) -> Result<Option<String>, ProvisionError> {
        validate_ini_key(key)?;
        let out = self.eval(&format!("echo json_encode(ini_get('{}'));", key))?;
        decode_json_scalar(&out)
    }
}

/// Decode PHP's `json_encode` output of a string-or-false value.
fn decode_json_scalar(raw: &str) -> Result<Option<String>, ProvisionError> {
    let value: serde_json::Value = serde_json::from_str(raw.trim())?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Bool(false) | serde_json::Value::Null => None,
        other => Some(other.to_string()),
    })
}

/// Ini keys are embedded in PHP source, so only directive characters pass.
fn validate_ini_key(key: &str) -> Result<(), ProvisionError> {
    if key.is_empty() || key.len() > 128 {
        return Err(ProvisionError::invalid_parameter(
            "ini_key",
            format!("INI key '{}' must be 1-128 characters", key),
        ));
    }

    if let Some(c) = key
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '_' && *c != '.')
    {
        return Err(ProvisionError::invalid_parameter(
            "ini_key",
            format!("INI key '{}' contains invalid character: '{}'", key, c),
        ));
    }

    Ok(())
}
