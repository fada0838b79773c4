//! Engine configuration.
//!
//! Plain values with compiled defaults. Hosts layer their own sources
//! (CLI, environment, config file) on top and hand the result to
//! [`TaskLifecycleController`](crate::lifecycle::TaskLifecycleController).

use std::time::Duration;

use crate::deadline::MAX_UTC_OFFSET_MINUTES;

/// A tunable whose value the engine cannot run with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidConfig {
    /// The value must be positive.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    /// The UTC offset is more than a day either way.
    #[error("utc_offset_minutes {0} is outside -{MAX_UTC_OFFSET_MINUTES}..={MAX_UTC_OFFSET_MINUTES}")]
    UtcOffset(i32),
}

/// Tunables for the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long a completed task stays visible before it resets or is deleted.
    pub grace_delay: Duration,
    /// Interval of the periodic reconcile trigger.
    pub reconcile_interval: Duration,
    /// Upper bound on every storage call.
    pub storage_timeout: Duration,
    /// Attempts the controller makes at each version-checked task write
    /// before reporting a conflict. Stats backends wrapped in
    /// [`OptimisticStats`](crate::store::optimistic::OptimisticStats) carry
    /// their own bound, set with `with_max_attempts`.
    pub conflict_retries: u32,
    /// Fixed offset (minutes east of UTC) used to interpret date and time input.
    pub utc_offset_minutes: i32,
    /// Capacity of the change notification channel.
    pub notification_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // 1s of completed display plus the 0.9s fade-out.
            grace_delay: Duration::from_millis(1_900),
            reconcile_interval: Duration::from_secs(60),
            storage_timeout: Duration::from_secs(5),
            conflict_retries: 8,
            utc_offset_minutes: 0,
            notification_buffer: 64,
        }
    }
}

impl EngineConfig {
    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`] for a zero interval, timeout, retry count or
    /// channel capacity, or an out-of-range UTC offset.
    pub const fn validate(&self) -> Result<(), InvalidConfig> {
        if self.reconcile_interval.is_zero() {
            return Err(InvalidConfig::Zero("reconcile_interval"));
        }
        if self.storage_timeout.is_zero() {
            return Err(InvalidConfig::Zero("storage_timeout"));
        }
        if self.conflict_retries == 0 {
            return Err(InvalidConfig::Zero("conflict_retries"));
        }
        if self.notification_buffer == 0 {
            return Err(InvalidConfig::Zero("notification_buffer"));
        }
        if self.utc_offset_minutes < -MAX_UTC_OFFSET_MINUTES
            || self.utc_offset_minutes > MAX_UTC_OFFSET_MINUTES
        {
            return Err(InvalidConfig::UtcOffset(self.utc_offset_minutes));
        }
        Ok(())
    }
}
