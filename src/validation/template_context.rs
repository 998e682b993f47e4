//! Template context validation.
//!
//! Paths rendered into Nginx server blocks are checked so a configured value
//! cannot break out of its directive.

use crate::error::{ProvisionError, ValidationErrorKind};

/// Characters that would end or restructure an Nginx directive.
const FORBIDDEN_CHARS: &[char] = &[';', '{', '}', '"', '\'', '`', '$', '#', '\\'];

/// Validates a filesystem path destined for an Nginx template.
///
/// # Rules
///
/// - Must be non-empty and absolute
/// - Cannot contain `..` components
/// - Cannot contain whitespace, control characters or directive syntax
pub fn validate_template_path<'a>(path: &'a str, param: &str) -> Result<&'a str, ProvisionError> {
    if path.is_empty() {
        return Err(ProvisionError::invalid_parameter(param, "Path cannot be empty"));
    }

    if !path.starts_with('/') {
        return Err(ProvisionError::invalid_parameter(
            param,
            "Path must be absolute (start with /)",
        ));
    }

    if path.split('/').any(|component| component == "..") {
        return Err(ProvisionError::Validation {
            kind: ValidationErrorKind::PathTraversal { path: path.into() },
        });
    }

    if let Some(c) = path
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_CHARS.contains(c))
    {
        return Err(ProvisionError::invalid_parameter(
            param,
            format!("Path contains forbidden character {:?}", c),
        ));
    }

    Ok(path)
}

/// Validates a PHP-FPM socket path.
pub fn validate_php_socket(path: &str) -> Result<&str, ProvisionError> {
    let path = validate_template_path(path, "php_socket")?;

    if !path.ends_with(".sock") {
        return Err(ProvisionError::invalid_parameter(
            "php_socket",
            "PHP socket path must end with .sock",
        ));
    }

    Ok(path)
}
