//! Shared identifier types used across the reservation workspace.

pub mod types;

pub use types::{BookingId, PaymentId, ScheduleId, SeatId, UserId};
