//! systemd unit name validation.

use crate::error::ProvisionError;

/// Validates a unit name passed to `systemctl`.
///
/// Allows the characters systemd accepts in unit names and rejects a leading
/// `-`, which systemctl would parse as an option.
pub fn validate_unit_name(name: &str) -> Result<(), ProvisionError> {
    if name.is_empty() || name.len() > 255 {
        return Err(ProvisionError::invalid_parameter(
            "service",
            "Unit name must be 1-255 characters",
        ));
    }

    if name.starts_with('-') {
        return Err(ProvisionError::invalid_parameter(
            "service",
            format!("Unit name '{}' cannot start with '-'", name),
        ));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, ':' | '_' | '.' | '@' | '-'))
    {
        return Err(ProvisionError::invalid_parameter(
            "service",
            format!("Unit name '{}' contains invalid character '{}'", name, c),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_units() {
        assert!(validate_unit_name("nginx").is_ok());
        assert!(validate_unit_name("php8.3-fpm").is_ok());
        assert!(validate_unit_name("nginx.service").is_ok());
        assert!(validate_unit_name("getty@tty1.service").is_ok());
    }

    #[test]
    fn test_invalid_units() {
        assert!(validate_unit_name("").is_err());
        assert!(validate_unit_name("--now").is_err());
        assert!(validate_unit_name("nginx; reboot").is_err());
        assert!(validate_unit_name("nginx/../x").is_err());
    }
}
