//! `site.provision`: issue a certificate for a domain and serve it over HTTPS.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::ProvisionError;
use crate::nginx::{enable_site, EnableOutcome, SiteConfigurator, SiteLayout};
use crate::php::{self, FpmIdentity, PhpRuntime};
use crate::services::SiteHost;
use crate::ssl::CertificateRequest;
use crate::ui::Reporter;
use crate::validation::validate_domain;

use super::traits::Command;
use super::types::ExecutionContext;

/// Result of the final HTTPS check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verification {
    Reachable { http_status: u16 },
    UnexpectedStatus { http_status: u16 },
    Failed { message: String },
}

impl Verification {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Verification::Reachable { .. })
    }
}

/// What a successful provisioning run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionOutcome {
    pub domain: String,
    pub fpm: FpmIdentity,
    pub web_root: PathBuf,
    pub config_path: PathBuf,
    pub ssl_certificate: PathBuf,
    pub verification: Verification,
}

/// Provisions one domain.
///
/// Steps run strictly in order; the first error aborts the run. Only the
/// closing reachability check is allowed to fail without failing the run.
pub struct ProvisionSiteCommand<'a> {
    domain: String,
    settings: &'a Settings,
    configurator: &'a SiteConfigurator,
    runtime: &'a dyn PhpRuntime,
    host: &'a dyn SiteHost,
    reporter: &'a dyn Reporter,
}

impl<'a> ProvisionSiteCommand<'a> {
    pub fn new(
        domain: impl Into<String>,
        settings: &'a Settings,
        configurator: &'a SiteConfigurator,
        runtime: &'a dyn PhpRuntime,
        host: &'a dyn SiteHost,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            domain: domain.into(),
            settings,
            configurator,
            runtime,
            host,
            reporter,
        }
    }

    fn certificate_request(&self, layout: &SiteLayout) -> CertificateRequest {
        CertificateRequest {
            domain: layout.domain.clone(),
            webroot: layout.web_root.clone(),
            email: self.settings.acme.email.clone(),
            staging: self.settings.acme.staging,
        }
    }

    fn verify(&self, domain: &str) -> Verification {
        let delay = self.settings.limits.verify_delay();
        self.reporter.step(&format!(
            "Waiting {}s before checking https://{}/",
            delay.as_secs(),
            domain
        ));
        self.host.pause(delay);

        let verification = match self.host.probe_https(domain) {
            Ok(probe) if probe.is_reachable() => Verification::Reachable {
                http_status: probe.status,
            },
            Ok(probe) => Verification::UnexpectedStatus {
                http_status: probe.status,
            },
            Err(e) => Verification::Failed {
                message: e.to_string(),
            },
        };

        match &verification {
            Verification::Reachable { http_status } => self.reporter.success(&format!(
                "https://{}/ answered with HTTP {}",
                domain, http_status
            )),
            Verification::UnexpectedStatus { http_status } => {
                warn!(domain, http_status, "HTTPS check returned a server error");
                self.reporter.warning(&format!(
                    "https://{}/ answered with HTTP {}; check the site and PHP-FPM logs",
                    domain, http_status
                ));
            }
            Verification::Failed { message } => {
                warn!(domain, error = %message, "HTTPS check failed");
                self.reporter.warning(&format!(
                    "Could not reach https://{}/ yet: {}",
                    domain, message
                ));
            }
        }

        verification
    }
}

impl Command for ProvisionSiteCommand<'_> {
    type Output = ProvisionOutcome;

    fn name(&self) -> &'static str {
        "site.provision"
    }

    fn params(&self) -> serde_json::Value {
        serde_json::json!({
            "domain": self.domain,
            "staging": self.settings.acme.staging,
        })
    }

    fn validate(&self) -> Result<(), ProvisionError> {
        validate_domain(&self.domain).map(|_| ())
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<ProvisionOutcome, ProvisionError> {
        let domain = validate_domain(&self.domain)?;
        let layout = SiteLayout::new(&domain, &self.settings.paths);

        self.reporter.step("Detecting PHP-FPM");
        let fpm = php::detect(self.runtime, &self.settings.paths.php_fpm_socket_dir)?;
        self.reporter.success(&format!("Using {}", fpm));

        self.reporter
            .step(&format!("Preparing web root {}", layout.web_root.display()));
        layout.prepare_web_root()?;

        self.reporter.step("Writing temporary HTTP config for the ACME challenge");
        self.configurator.write_acme_config(&layout)?;
        match enable_site(&layout)? {
            EnableOutcome::Created => self.reporter.success("Site enabled"),
            EnableOutcome::Relinked => self.reporter.success("Site link replaced"),
            EnableOutcome::AlreadyEnabled => self.reporter.success("Site already enabled"),
        }
        self.host.reload_web_server()?;
        self.reporter.success("Nginx reloaded");

        self.reporter
            .step(&format!("Requesting certificate for {}", domain));
        self.host
            .request_certificate(&self.certificate_request(&layout))?;
        self.reporter.success("Certificate issued");

        self.reporter.step("Writing HTTPS config");
        self.configurator.write_https_config(&layout, &fpm)?;
        self.host.reload_web_server()?;
        self.reporter.success("Nginx reloaded with HTTPS");

        let verification = self.verify(&domain);

        info!(
            run_id = %ctx.run_id,
            domain = %domain,
            fpm = %fpm.name,
            reachable = verification.is_reachable(),
            "Site provisioned"
        );

        Ok(ProvisionOutcome {
            domain,
            fpm,
            web_root: layout.web_root,
            config_path: layout.config_path,
            ssl_certificate: layout.ssl_certificate,
            verification,
        })
    }
}
