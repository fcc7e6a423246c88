//! Bounded retry with exponential backoff.
//!
//! Wraps content fetches and the publish upload. Only faults that
//! [`StoreError::is_transient`] accepts are retried; everything else is
//! returned on the first attempt, so retrying never changes whether a fault
//! is fatal or per-item.

use crate::store::StoreError;
use backon::{BlockingRetryable, ExponentialBuilder};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub const NONE: RetryPolicy = RetryPolicy {
        retries: 0,
        backoff: Duration::ZERO,
    };

    pub fn new(retries: u32, backoff: Duration) -> Self {
        Self { retries, backoff }
    }

    fn builder(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.backoff)
            .with_factor(2.0)
            .with_max_times(self.retries as usize)
    }

    pub fn run<T>(&self, op: impl FnMut() -> Result<T, StoreError>) -> Result<T, StoreError> {
        op.retry(self.builder())
            .when(StoreError::is_transient)
            .notify(|err, dur| {
                tracing::debug!(error = %err, delay = ?dur, "retrying after transient store error");
            })
            .call()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::NONE
    }
}
