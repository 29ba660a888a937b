//! Wall-clock budget helpers for the conversation loop.

use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};

/// Return the remaining time budget until the provided deadline.
pub fn remaining_budget(deadline: Instant) -> Result<Duration> {
    let remaining = deadline
        .checked_duration_since(Instant::now())
        .unwrap_or(Duration::from_secs(0));
    if remaining.is_zero() {
        return Err(anyhow!("conversation timed out"));
    }
    Ok(remaining)
}

/// Cap a per-request timeout by what is left of the overall budget.
pub fn request_timeout(deadline: Instant, per_request: Duration) -> Result<Duration> {
    Ok(remaining_budget(deadline)?.min(per_request))
}
