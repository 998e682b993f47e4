//! Nginx configuration templates.

mod engine;

pub use engine::{TemplateEngine, ACME_CHALLENGE_TEMPLATE, HTTPS_SITE_TEMPLATE};
