//! Collision-checked booking references and transaction ids.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::ReferenceKind;
use store::UnitOfWork;

use crate::error::{ReservationError, Result};

/// Generates identifiers that no committed or staged record uses yet.
///
/// Two concurrent units of work can still pick the same identifier; the
/// store's uniqueness check rejects the second commit as a transient abort.
#[async_trait]
pub trait ReferenceGenerator: UnitOfWork {
    async fn unique_reference(
        &mut self,
        kind: ReferenceKind,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<String> {
        for attempt in 1..=max_attempts {
            let candidate = kind.generate(now);
            let taken = match kind {
                ReferenceKind::Booking => self.booking_reference_exists(&candidate).await?,
                ReferenceKind::Transaction => self.transaction_id_exists(&candidate).await?,
            };
            if !taken {
                return Ok(candidate);
            }
            tracing::debug!(prefix = kind.prefix(), attempt, "Reference collision");
        }

        Err(ReservationError::aborted(format!(
            "no unique {} identifier after {max_attempts} attempts",
            kind.prefix()
        )))
    }
}

impl<T: UnitOfWork> ReferenceGenerator for T {}
