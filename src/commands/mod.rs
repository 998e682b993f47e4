//! The two procedures and the dispatcher that runs them.
//!
//! `dispatch` validates, executes, times the run and appends it to the
//! journal. Journal problems are logged and never change the outcome.

mod provision;
mod session_timeout;
mod traits;
mod types;

use std::time::Instant;

use tracing::{info, warn};

use crate::audit::AuditLogger;
use crate::error::ProvisionError;

pub use provision::{ProvisionOutcome, ProvisionSiteCommand, Verification};
pub use session_timeout::{DirectiveValue, SessionReport, SessionTimeoutCommand};
pub use traits::Command;
pub use types::{CommandResult, ExecutionContext};

/// Run `command` once and record it.
pub fn dispatch<C: Command>(
    command: &C,
    journal: Option<&mut AuditLogger>,
) -> Result<C::Output, ProvisionError> {
    let ctx = ExecutionContext::new(command.name());
    let started = Instant::now();
    info!(run_id = %ctx.run_id, command = %ctx.command, uid = ctx.uid, "Run started");

    let result = command.validate().and_then(|()| command.execute(&ctx));

    let summary = match &result {
        Ok(output) => command.outcome(output),
        Err(e) => CommandResult::from_error(e),
    };
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    info!(
        run_id = %ctx.run_id,
        success = summary.success,
        duration_ms,
        "Run finished"
    );

    if let Some(journal) = journal {
        let entry = ctx.journal_entry(command.params(), &summary, duration_ms);
        if let Err(e) = journal.log(&entry) {
            warn!(error = %e, path = %journal.path().display(), "Failed to write journal entry");
        }
    }

    result
}
