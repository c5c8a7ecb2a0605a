use thiserror::Error;

/// Unique constraint on `bookings.booking_reference`.
pub const BOOKING_REFERENCE_CONSTRAINT: &str = "bookings_booking_reference_key";
/// Unique constraint on `payments.transaction_id`.
pub const TRANSACTION_ID_CONSTRAINT: &str = "payments_transaction_id_key";
/// Unique constraint on `payments.booking_id`.
pub const PAYMENT_BOOKING_CONSTRAINT: &str = "payments_booking_id_key";
/// Unique constraint on `(seats.schedule_id, seats.seat_number)`.
pub const SEAT_NUMBER_CONSTRAINT: &str = "seats_schedule_id_seat_number_key";
/// Primary key of `schedules`.
pub const SCHEDULE_PKEY_CONSTRAINT: &str = "schedules_pkey";

/// Errors that can occur when interacting with the reservation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row lock could not be acquired within the lock timeout.
    #[error("Timed out waiting for a lock on {entity}")]
    LockTimeout { entity: &'static str },

    /// The database aborted the transaction (serialization failure or deadlock).
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// A commit would have broken a uniqueness constraint.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A value does not fit the column it is written to.
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// A stored row could not be mapped back into a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true for contention failures where re-running the whole
    /// transaction may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::LockTimeout { .. } | StoreError::Conflict(_) => true,
            StoreError::UniqueViolation { constraint } => {
                constraint == BOOKING_REFERENCE_CONSTRAINT
                    || constraint == TRANSACTION_ID_CONSTRAINT
            }
            _ => false,
        }
    }

    pub(crate) fn unique(constraint: &str) -> Self {
        StoreError::UniqueViolation {
            constraint: constraint.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
