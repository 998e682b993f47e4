//! Error types for the provisioning tools.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
