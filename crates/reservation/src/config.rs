//! Coordinator configuration.

use chrono::Duration;
use domain::RefundPolicy;

use crate::retry::RetryPolicy;

/// Tunables for the reservation coordinator.
#[derive(Debug, Clone)]
pub struct ReservationConfig {
    /// Cancellations closer to departure than this are refused.
    pub cancellation_cutoff: Duration,

    /// How many identifiers to try before giving up on a unique one.
    pub reference_attempts: u32,

    /// Retry policy for transient transaction aborts.
    pub retry_policy: RetryPolicy,

    /// Refund schedule applied on cancellation.
    pub refund_policy: RefundPolicy,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            cancellation_cutoff: Duration::hours(2),
            reference_attempts: 5,
            retry_policy: RetryPolicy::default(),
            refund_policy: RefundPolicy::tiered(),
        }
    }
}

impl ReservationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation_cutoff(mut self, cutoff: Duration) -> Self {
        self.cancellation_cutoff = cutoff;
        self
    }

    pub fn with_reference_attempts(mut self, attempts: u32) -> Self {
        self.reference_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_refund_policy(mut self, policy: RefundPolicy) -> Self {
        self.refund_policy = policy;
        self
    }
}
