//! PHP installation helpers: interpreter introspection, PHP-FPM socket
//! detection and session timeout editing.

pub mod fpm;
mod runtime;
pub mod session;

pub use fpm::{detect, detect_from, DetectionSource, FpmIdentity};
pub use runtime::{PhpCli, PhpRuntime};
pub use session::{
    apply_session_timeout, backup_path, read_directive, TimeoutChange, GC_MAXLIFETIME,
    REPORTED_DIRECTIVES,
};
