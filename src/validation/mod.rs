//! Input validation module.
//!
//! Validates domains, session timeout input, systemd unit names and values
//! rendered into Nginx templates.

mod domain;
mod hours;
mod template_context;
mod unit_name;

pub use domain::validate_domain;
pub use hours::parse_hours_to_seconds;
pub use template_context::{validate_php_socket, validate_template_path};
pub use unit_name::validate_unit_name;
