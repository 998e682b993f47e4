//! External program executor.
//!
//! Handles subprocess spawning, execution timeouts and output trimming.

mod output;
mod subprocess;

pub use output::sanitize_output;
pub use subprocess::{run_command, SubprocessBuilder, SubprocessResult};
