pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{
    BOOKING_REFERENCE_CONSTRAINT, PAYMENT_BOOKING_CONSTRAINT, Result, SCHEDULE_PKEY_CONSTRAINT,
    SEAT_NUMBER_CONSTRAINT, StoreError, TRANSACTION_ID_CONSTRAINT,
};
pub use memory::{InMemoryReservationStore, InMemoryUnitOfWork};
pub use postgres::{PostgresReservationStore, PostgresUnitOfWork};
pub use query::BookingQuery;
pub use store::{DEFAULT_LOCK_TIMEOUT, ReservationStore, UnitOfWork};
