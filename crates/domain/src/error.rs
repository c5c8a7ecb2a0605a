//! Domain error types.

use common::BookingId;
use thiserror::Error;

use crate::money::Money;
use crate::schedule::ScheduleStatus;

/// Errors raised when an entity refuses a state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The entity is not in a state that allows the action.
    #[error("Invalid state transition: cannot {action} {entity} in {current} state")]
    InvalidStateTransition {
        entity: &'static str,
        current: String,
        action: &'static str,
    },

    /// A seat that had to be free is already held.
    #[error("Seat {seat_number} is already booked")]
    SeatNotFree { seat_number: String },

    /// A seat being released is not held by the releasing booking.
    #[error("Seat {seat_number} is not held by booking {booking_id}")]
    SeatNotHeld {
        seat_number: String,
        booking_id: BookingId,
    },

    /// The schedule does not have enough free seats left.
    #[error("Not enough seats available: requested {requested}, available {available}")]
    InsufficientSeats { requested: u32, available: u32 },

    /// Releasing seats would push the counter above the schedule capacity.
    #[error("Cannot release {released} seats: {available} of {capacity} already available")]
    CapacityExceeded {
        capacity: u32,
        available: u32,
        released: u32,
    },

    /// Seat and passenger lists differ in length.
    #[error("Number of seats ({seats}) must match number of passengers ({passengers})")]
    PassengerCountMismatch { seats: usize, passengers: usize },

    /// A price times a seat count does not fit in the amount type.
    #[error("Amount {amount} times {quantity} overflows")]
    AmountOverflow { amount: Money, quantity: u32 },

    /// More seats than a schedule could ever hold.
    #[error("Too many seats requested: {requested}")]
    TooManySeats { requested: usize },

    /// A booking must cover at least one seat.
    #[error("A booking requires at least one seat")]
    EmptyBooking,

    /// A refund may never exceed what was paid.
    #[error("Refund {refund} exceeds paid amount {amount}")]
    RefundExceedsAmount { refund: Money, amount: Money },

    /// The schedule is not open for new bookings.
    #[error("Schedule is {status} and cannot be booked")]
    ScheduleNotBookable { status: ScheduleStatus },
}
