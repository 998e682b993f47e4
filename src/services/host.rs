//! Side effects of a provisioning run.

use std::time::Duration;

use nix::unistd::geteuid;

use crate::config::Settings;
use crate::error::ProvisionError;
use crate::ssl::{self, CertificateRequest, ProbeResult};

use super::systemctl::reload_unit;

/// External actions the provisioner performs between file writes.
pub trait SiteHost {
    /// Make the web server pick up the current site config.
    fn reload_web_server(&self) -> Result<(), ProvisionError>;

    /// Obtain a certificate; an error aborts the run.
    fn request_certificate(&self, request: &CertificateRequest) -> Result<(), ProvisionError>;

    /// Fetch the site over HTTPS.
    fn probe_https(&self, domain: &str) -> Result<ProbeResult, ProvisionError>;

    /// Wait before probing so the reload has settled.
    fn pause(&self, duration: Duration);
}

/// `SiteHost` backed by systemctl, certbot and curl.
pub struct SystemHost<'a> {
    settings: &'a Settings,
}

impl<'a> SystemHost<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }
}

impl SiteHost for SystemHost<'_> {
    fn reload_web_server(&self) -> Result<(), ProvisionError> {
        reload_unit(
            &self.settings.nginx.service,
            self.settings.limits.command_timeout(),
        )
    }

    fn request_certificate(&self, request: &CertificateRequest) -> Result<(), ProvisionError> {
        ssl::request_certificate(
            &self.settings.acme.certbot_binary,
            request,
            self.settings.limits.certbot_timeout(),
        )
    }

    fn probe_https(&self, domain: &str) -> Result<ProbeResult, ProvisionError> {
        ssl::probe_https(domain, self.settings.limits.command_timeout())
    }

    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Fail unless running with effective uid 0.
pub fn require_root() -> Result<(), ProvisionError> {
    if geteuid().is_root() {
        Ok(())
    } else {
        Err(ProvisionError::Permission {
            message: "this command must be run as root".to_string(),
        })
    }
}
