//! Human-readable booking references and transaction ids.
//!
//! Identifiers are a fixed prefix, the millisecond timestamp and a
//! zero-padded random suffix, e.g. `BK17607412345670042`. They are not
//! unique by construction; callers check them against the ledger.

use chrono::{DateTime, Utc};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `booking_reference` on a booking.
    Booking,
    /// `transaction_id` on a payment.
    Transaction,
}

impl ReferenceKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ReferenceKind::Booking => "BK",
            ReferenceKind::Transaction => "TXN",
        }
    }

    fn suffix_digits(&self) -> usize {
        match self {
            ReferenceKind::Booking => 4,
            ReferenceKind::Transaction => 5,
        }
    }

    /// Formats a candidate identifier for `now`.
    pub fn generate(&self, now: DateTime<Utc>) -> String {
        let digits = self.suffix_digits();
        let bound = 10u32.pow(digits as u32);
        let suffix = rand::thread_rng().gen_range(0..bound);
        format!(
            "{}{}{:0width$}",
            self.prefix(),
            now.timestamp_millis(),
            suffix,
            width = digits
        )
    }
}
