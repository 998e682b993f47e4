//! Run journal.
//!
//! Every procedure run appends one JSON line describing what was asked,
//! who asked, how it ended and how long it took.

mod entry;
mod logger;

pub use entry::{AuditEntry, AuditResult};
pub use logger::{open_journal, AuditLogger};
