//! Let's Encrypt certificates via certbot's webroot plugin.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::ProvisionError;
use crate::executor::run_command;

/// Parameters for one certbot webroot request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateRequest {
    pub domain: String,
    pub webroot: PathBuf,
    /// Registration email; `None` registers without one.
    pub email: Option<String>,
    /// Use the Let's Encrypt staging server.
    pub staging: bool,
}

impl CertificateRequest {
    /// certbot arguments for a non-interactive webroot request.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "certonly".to_string(),
            "--webroot".to_string(),
            "-w".to_string(),
            self.webroot.to_string_lossy().into_owned(),
            "-d".to_string(),
            self.domain.clone(),
            "--non-interactive".to_string(),
            "--agree-tos".to_string(),
            "--keep-until-expiring".to_string(),
        ];

        match &self.email {
            Some(email) => {
                args.push("--email".to_string());
                args.push(email.clone());
            }
            None => args.push("--register-unsafely-without-email".to_string()),
        }

        if self.staging {
            args.push("--staging".to_string());
        }

        args
    }
}

/// Run certbot. Any non-zero exit is an error.
pub fn request_certificate(
    certbot: &str,
    request: &CertificateRequest,
    timeout: Duration,
) -> Result<(), ProvisionError> {
    debug!(
        domain = %request.domain,
        webroot = %request.webroot.display(),
        staging = request.staging,
        "Requesting Let's Encrypt certificate"
    );

    let args = request.args();
    let args_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    run_command(certbot, &args_refs, timeout)?.check(certbot)?;

    info!(domain = %request.domain, "Certificate obtained");
    Ok(())
}
