//! Command trait definition.

use serde::Serialize;

use crate::error::ProvisionError;

use super::types::{CommandResult, ExecutionContext};

/// A procedure the binaries can run through [`dispatch`](super::dispatch).
///
/// `validate` rejects bad input before anything on the system is touched;
/// `execute` then does the work and returns a typed output the binary
/// renders. Both feed the run journal.
pub trait Command {
    /// Structured result of a run.
    type Output: Serialize;

    /// Procedure identifier recorded in the journal (e.g. `site.provision`).
    fn name(&self) -> &'static str;

    /// Arguments recorded in the journal.
    fn params(&self) -> serde_json::Value;

    /// Check arguments before execution.
    fn validate(&self) -> Result<(), ProvisionError>;

    /// Perform the procedure.
    fn execute(&self, ctx: &ExecutionContext) -> Result<Self::Output, ProvisionError>;

    /// Summarize a finished run for the journal.
    ///
    /// Procedures that collect failures instead of returning an error
    /// override this to report them.
    fn outcome(&self, output: &Self::Output) -> CommandResult {
        match serde_json::to_value(output) {
            Ok(data) => CommandResult::success(data),
            Err(e) => CommandResult::failure("SERIALIZATION_ERROR", e.to_string()),
        }
    }
}
