//! Post-provisioning reachability check.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::error::ProvisionError;
use crate::executor::run_command;

/// HTTP status seen when fetching the site over HTTPS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub status: u16,
}

impl ProbeResult {
    /// Anything below 500 means Nginx answered and TLS worked.
    pub fn is_reachable(&self) -> bool {
        (100..500).contains(&self.status)
    }
}

/// Fetch `https://<domain>/` with curl and report the status code.
///
/// TLS or connection failures make curl exit non-zero and surface as errors.
pub fn probe_https(domain: &str, timeout: Duration) -> Result<ProbeResult, ProvisionError> {
    let url = format!("https://{}/", domain);
    let max_time = timeout.as_secs().max(1).to_string();

    let result = run_command(
        "curl",
        &[
            "--silent",
            "--show-error",
            "--output",
            "/dev/null",
            "--write-out",
            "%{http_code}",
            "--max-time",
            &max_time,
            &url,
        ],
        timeout + Duration::from_secs(5),
    )?
    .check("curl")?;

    let status = parse_status(&result.stdout)?;
    debug!(url = %url, status, "HTTPS probe completed");
    Ok(ProbeResult { status })
}

fn parse_status(raw: &str) -> Result<u16, ProvisionError> {
    raw.trim().parse().map_err(|_| {
        ProvisionError::execution_failed(format!("Unexpected curl status output '{}'", raw.trim()))
    })
}
