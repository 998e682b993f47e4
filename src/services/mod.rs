//! The live system the provisioner acts on.
//!
//! `SiteHost` collects the external side effects of a provisioning run so
//! the sequencing can be exercised without root, Nginx or certbot.

mod host;
mod systemctl;

pub use host::{require_root, SiteHost, SystemHost};
pub use systemctl::reload_unit;
