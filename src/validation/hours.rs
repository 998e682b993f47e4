//! Session timeout input.

use regex::Regex;

use crate::error::ProvisionError;

const SECONDS_PER_HOUR: u128 = 3600;

/// Largest accepted timeout: ten years.
const MAX_HOURS: u128 = 87_600;

/// Plain decimal hours: digits with an optional fractional part.
const HOURS_PATTERN: &str = r"^([0-9]{1,9})(?:\.([0-9]{1,30}))?$";

/// Convert an hours argument (`"1"`, `"0.5"`, `"24"`) into whole seconds.
///
/// The decimal is evaluated exactly, so `4.1` is 14760 seconds, and any
/// fraction of a second is truncated. Signs, exponents, bare fractions
/// (`.5`), non-finite words, zero and values over ten years are rejected.
pub fn parse_hours_to_seconds(input: &str) -> Result<u64, ProvisionError> {
    let re = Regex::new(HOURS_PATTERN).map_err(|e| {
        ProvisionError::invalid_parameter("hours", format!("Bad hours pattern: {}", e))
    })?;

    let caps = re.captures(input.trim()).ok_or_else(|| {
        ProvisionError::invalid_parameter(
            "hours",
            format!("'{}' is not a decimal number of hours", input),
        )
    })?;

    // Both groups are bounded digit runs, so they fit in u128.
    let whole: u128 = caps[1].parse().unwrap_or(u128::MAX);
    let mut seconds = whole.saturating_mul(SECONDS_PER_HOUR);
    if let Some(frac) = caps.get(2) {
        let digits: u128 = frac.as_str().parse().unwrap_or(0);
        let scale = 10u128.pow(frac.as_str().len() as u32);
        seconds = seconds.saturating_add(digits * SECONDS_PER_HOUR / scale);
    }

    if seconds > MAX_HOURS * SECONDS_PER_HOUR {
        return Err(ProvisionError::invalid_parameter(
            "hours",
            format!("{} hours exceeds the maximum of {}", input.trim(), MAX_HOURS),
        ));
    }

    if seconds < 1 {
        return Err(ProvisionError::invalid_parameter(
            "hours",
            "timeout must be at least one second",
        ));
    }

    u64::try_from(seconds)
        .map_err(|_| ProvisionError::invalid_parameter("hours", "timeout out of range"))
}
