//! Lumo provisioning tools.
//!
//! Library behind two host utilities: `provision-site`, which puts a
//! PHP site behind Let's Encrypt HTTPS on Nginx, and `session-timeout`,
//! which audits and adjusts PHP's session lifetime.

pub mod audit;
pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod nginx;
pub mod php;
pub mod services;
pub mod ssl;
pub mod templates;
pub mod ui;
pub mod validation;
