//! Domain name validation.
//!
//! The domain argument becomes an Nginx `server_name`, a directory name under
//! the web root base, a file name in `sites-available` and a certbot `-d`
//! value, so it is held to strict hostname rules.

use std::net::IpAddr;

use crate::error::ProvisionError;

/// Maximum length for a domain name.
const MAX_DOMAIN_LENGTH: usize = 253;

/// Maximum length for a single label.
const MAX_LABEL_LENGTH: usize = 63;

/// Validates and normalizes a domain name.
///
/// # Rules
///
/// - 1-253 characters, at least two labels
/// - Labels are 1-63 ASCII alphanumerics or hyphens, no leading/trailing hyphen
/// - No wildcards and no IP literals (HTTP-01 cannot validate either)
/// - A single trailing dot is accepted and dropped
///
/// Returns the lowercase form used for every derived path.
pub fn validate_domain(domain: &str) -> Result<String, ProvisionError> {
    let domain = domain.trim();
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.is_empty() {
        return Err(invalid("Domain name cannot be empty"));
    }

    if domain.len() > MAX_DOMAIN_LENGTH {
        return Err(invalid(format!(
            "Domain name exceeds maximum length of {} characters",
            MAX_DOMAIN_LENGTH
        )));
    }

    if domain.contains('*') {
        return Err(invalid("Wildcard domains cannot be validated over HTTP-01"));
    }

    if domain.parse::<IpAddr>().is_ok() {
        return Err(invalid("IP addresses are not valid certificate domains"));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(invalid(
            "Domain must have at least two parts (e.g., example.com)",
        ));
    }

    for label in &labels {
        check_label(label)?;
    }

    Ok(domain.to_ascii_lowercase())
}

fn check_label(label: &str) -> Result<(), ProvisionError> {
    if label.is_empty() {
        return Err(invalid("Domain contains empty label (consecutive dots)"));
    }

    if label.len() > MAX_LABEL_LENGTH {
        return Err(invalid(format!(
            "Domain label '{}' exceeds maximum length of {} characters",
            label, MAX_LABEL_LENGTH
        )));
    }

    if let Some(c) = label
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '-')
    {
        return Err(invalid(format!(
            "Domain label '{}' contains invalid character '{}'",
            label, c
        )));
    }

    if label.starts_with('-') || label.ends_with('-') {
        return Err(invalid(format!(
            "Domain label '{}' must start and end with a letter or number",
            label
        )));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ProvisionError {
    ProvisionError::invalid_parameter("domain", message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_domains() {
        assert_eq!(validate_domain("example.com").unwrap(), "example.com");
        assert!(validate_domain("sub.example.com").is_ok());
        assert!(validate_domain("my-site.example.org").is_ok());
        assert!(validate_domain("a1.b2.c3.example.net").is_ok());
    }

    #[test]
    fn test_normalization() {
        assert_eq!(validate_domain("Example.COM").unwrap(), "example.com");
        assert_eq!(validate_domain("example.com.").unwrap(), "example.com");
        assert_eq!(validate_domain("  example.com ").unwrap(), "example.com");
    }

    #[test]
    fn test_invalid_domains() {
        assert!(validate_domain("").is_err());
        assert!(validate_domain("localhost").is_err());
        assert!(validate_domain("*.example.com").is_err());
        assert!(validate_domain("example_site.com").is_err());
        assert!(validate_domain("example site.com").is_err());
        assert!(validate_domain("-example.com").is_err());
        assert!(validate_domain("example-.com").is_err());
        assert!(validate_domain("example..com").is_err());
        assert!(validate_domain("../etc/passwd").is_err());
        assert!(validate_domain("example.com;reboot").is_err());
    }

    #[test]
    fn test_rejects_ip_literals() {
        assert!(validate_domain("192.168.1.10").is_err());
    }

    #[test]
    fn test_length_limits() {
        let long_label = format!("{}.com", "a".repeat(64));
        assert!(validate_domain(&long_label).is_err());

        let long_domain = format!("{}.com", vec!["abcdefghi"; 26].join("."));
        assert!(long_domain.len() > MAX_DOMAIN_LENGTH);
        assert!(validate_domain(&long_domain).is_err());
    }
}
