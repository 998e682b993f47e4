//! Certificate acquisition and HTTPS reachability checks.

mod certbot;
mod verify;

pub use certbot::{request_certificate, CertificateRequest};
pub use verify::{probe_https, ProbeResult};
