//! Reservation error types.

use domain::DomainError;
use store::StoreError;
use thiserror::Error;

/// Stable, machine-readable classification of a [`ReservationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    SeatUnavailable,
    InvalidSelection,
    Unauthorized,
    InvalidState,
    TransactionAborted,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::SeatUnavailable => "seat_unavailable",
            ErrorKind::InvalidSelection => "invalid_selection",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::TransactionAborted => "transaction_aborted",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors returned by the reservation coordinator.
///
/// Every variant means the operation was fully aborted: nothing it
/// staged was committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    /// Malformed or mismatched input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The schedule, booking or payment does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A requested seat is taken or the schedule has too few seats left.
    #[error("Seat unavailable: {0}")]
    SeatUnavailable(String),

    /// Seat ids that don't belong to the schedule.
    #[error("Invalid seat selection: {0}")]
    InvalidSelection(String),

    /// The booking belongs to another user.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The operation is not allowed in the booking's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The unit of work could not be committed.
    #[error("Transaction aborted: {reason}")]
    TransactionAborted { reason: String, transient: bool },
}

impl ReservationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReservationError::Validation(_) => ErrorKind::Validation,
            ReservationError::NotFound { .. } => ErrorKind::NotFound,
            ReservationError::SeatUnavailable(_) => ErrorKind::SeatUnavailable,
            ReservationError::InvalidSelection(_) => ErrorKind::InvalidSelection,
            ReservationError::Unauthorized(_) => ErrorKind::Unauthorized,
            ReservationError::InvalidState(_) => ErrorKind::InvalidState,
            ReservationError::TransactionAborted { .. } => ErrorKind::TransactionAborted,
        }
    }

    /// Returns true if re-running the whole operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReservationError::TransactionAborted {
                transient: true,
                ..
            }
        )
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ReservationError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn aborted(reason: impl Into<String>) -> Self {
        ReservationError::TransactionAborted {
            reason: reason.into(),
            transient: false,
        }
    }
}

impl From<StoreError> for ReservationError {
    fn from(err: StoreError) -> Self {
        let transient = err.is_transient();
        let reason = match &err {
            StoreError::LockTimeout { .. } => "timed out waiting for a lock",
            StoreError::Conflict(_) => "conflicting concurrent update",
            StoreError::UniqueViolation { .. } if transient => "generated identifier collided",
            _ => "storage failure",
        };

        if transient {
            tracing::warn!(error = %err, "Transient store failure");
        } else {
            tracing::error!(error = %err, "Store failure");
        }

        ReservationError::TransactionAborted {
            reason: reason.to_string(),
            transient,
        }
    }
}

impl From<DomainError> for ReservationError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::SeatNotFree { .. } | DomainError::InsufficientSeats { .. } => {
                ReservationError::SeatUnavailable(err.to_string())
            }
            DomainError::PassengerCountMismatch { .. }
            | DomainError::EmptyBooking
            | DomainError::AmountOverflow { .. }
            | DomainError::TooManySeats { .. } => {
                ReservationError::Validation(err.to_string())
            }
            DomainError::InvalidStateTransition { .. } | DomainError::ScheduleNotBookable { .. } => {
                ReservationError::InvalidState(err.to_string())
            }
            // Stored state contradicts itself; retrying won't help.
            DomainError::SeatNotHeld { .. }
            | DomainError::CapacityExceeded { .. }
            | DomainError::RefundExceedsAmount { .. } => {
                tracing::error!(error = %err, "Inconsistent reservation state");
                ReservationError::aborted(err.to_string())
            }
        }
    }
}

/// A notification could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Notification failed: {0}")]
pub struct NotificationError(pub String);

/// Convenience type alias for reservation results.
pub type Result<T> = std::result::Result<T, ReservationError>;
