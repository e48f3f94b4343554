//! Recovery policy applied where errors reach the poll loop boundary.
//!
//! Components return typed errors; the loop asks [`ErrorRecovery`] what to do
//! with them so the policy lives in one place.

use crate::{CoreError, ErrorExt, TimingConfig};
use std::time::Duration;

/// What the caller should do after an operation failed.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryStrategy {
    /// Stop the bot; the error needs operator intervention.
    Abort,
    /// Wait before the next unit of work. For a single item this means the
    /// rest of the iteration is abandoned too.
    Backoff(Duration),
    /// Log and move on immediately.
    Skip,
}

pub struct ErrorRecovery;

impl ErrorRecovery {
    /// Strategy for an error that escaped a whole iteration.
    pub fn for_iteration(error: &CoreError, timing: &TimingConfig) -> RecoveryStrategy {
        if error.is_fatal() {
            return RecoveryStrategy::Abort;
        }

        if error.is_rate_limited() {
            let delay = error
                .retry_after()
                .unwrap_or_else(|| timing.throttle_backoff())
                .max(timing.recovery_delay());
            return RecoveryStrategy::Backoff(delay);
        }

        RecoveryStrategy::Backoff(timing.recovery_delay())
    }

    /// Strategy for an error confined to a single account or post. Throttling
    /// would hit every remaining account as well, so it escalates.
    pub fn for_item(error: &CoreError) -> RecoveryStrategy {
        if error.is_fatal() {
            RecoveryStrategy::Abort
        } else if error.is_rate_limited() {
            RecoveryStrategy::Backoff(error.retry_after().unwrap_or_default())
        } else {
            RecoveryStrategy::Skip
        }
    }
}
