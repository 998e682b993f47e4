//! systemd unit control.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::ProvisionError;
use crate::executor::run_command;
use crate::validation::validate_unit_name;

/// `systemctl reload <unit>`.
pub fn reload_unit(unit: &str, timeout: Duration) -> Result<(), ProvisionError> {
    validate_unit_name(unit)?;

    let result = run_command("systemctl", &["reload", unit], timeout)?;
    if !result.success {
        warn!(unit, stderr = %result.stderr.trim(), "Reload failed");
    }
    result.check("systemctl")?;

    info!(unit, "Service reloaded");
    Ok(())
}
