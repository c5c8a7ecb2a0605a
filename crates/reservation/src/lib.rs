//! Reservation transaction engine.
//!
//! [`ReservationCoordinator`] books and cancels seats as single atomic
//! units of work. Inside a unit of work it goes through four layers, each
//! an extension trait over [`store::UnitOfWork`]:
//! 1. [`ScheduleCapacityCounter`] locks the schedule and keeps its
//!    available-seat counter
//! 2. [`SeatInventoryStore`] claims or releases the seat rows
//! 3. [`BookingLedger`] / [`PaymentLedger`] record the booking and payment
//! 4. [`ReferenceGenerator`] hands out collision-checked identifiers
//!
//! Nothing becomes visible until the unit of work commits. Notifications go
//! out only after a successful commit.

pub mod capacity;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod notification;
pub mod reference;
pub mod retry;

pub use capacity::ScheduleCapacityCounter;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ReservationConfig;
pub use coordinator::{BookingPage, ReservationCoordinator};
pub use error::{ErrorKind, NotificationError, ReservationError, Result};
pub use inventory::SeatInventoryStore;
pub use ledger::{BookingLedger, PaymentLedger};
pub use notification::{
    InMemoryNotificationSink, LoggingNotificationSink, Notification, NotificationSink,
};
pub use reference::ReferenceGenerator;
pub use retry::RetryPolicy;
