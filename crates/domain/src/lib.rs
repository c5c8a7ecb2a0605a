//! Domain layer for the seat reservation engine.
//!
//! This crate holds the entities the reservation coordinator moves between
//! states, with no I/O:
//! - `Schedule` with its aggregate available-seat counter
//! - `Seat` and the lazily generated seat layout
//! - `Booking` and `Payment` with their state machines
//! - `RefundPolicy`, the tiered cancellation refund schedule
//! - booking reference / transaction id formatting

pub mod booking;
pub mod error;
pub mod money;
pub mod payment;
pub mod reference;
pub mod refund;
pub mod schedule;
pub mod seat;

pub use booking::{Booking, BookingStatus, Gender, Passenger, PaymentStatus};
pub use error::DomainError;
pub use money::Money;
pub use payment::{ChargeStatus, Payment, PaymentMethod};
pub use reference::ReferenceKind;
pub use refund::{RefundPolicy, RefundTier};
pub use schedule::{Schedule, ScheduleStatus};
pub use seat::{Seat, SeatStatus, SeatType};
