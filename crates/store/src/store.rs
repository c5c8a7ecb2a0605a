use std::time::Duration;

use async_trait::async_trait;
use common::{BookingId, ScheduleId, SeatId};
use domain::{Booking, Payment, Schedule, Seat};

use crate::{BookingQuery, Result};

/// How long a unit of work waits for a row lock before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Core trait for reservation store implementations.
///
/// All implementations must be thread-safe (Send + Sync). Every method
/// outside [`UnitOfWork`] reads committed state only.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// The transaction type handed out by [`ReservationStore::begin`].
    type UnitOfWork: UnitOfWork;

    /// Opens an atomic unit of work.
    async fn begin(&self) -> Result<Self::UnitOfWork>;

    /// Stores a new schedule with every seat available.
    async fn insert_schedule(&self, schedule: Schedule) -> Result<()>;

    /// Retrieves a schedule.
    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>>;

    /// Returns the seat map for a schedule, creating it from the schedule's
    /// capacity on first use.
    ///
    /// Returns None if the schedule doesn't exist. Concurrent first calls
    /// create the layout exactly once.
    async fn ensure_seat_map(&self, schedule_id: ScheduleId) -> Result<Option<Vec<Seat>>>;

    /// Returns the seats of a schedule in layout order (empty if none exist yet).
    async fn list_seats(&self, schedule_id: ScheduleId) -> Result<Vec<Seat>>;

    /// Retrieves a booking.
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>>;

    /// Retrieves a booking by its reference.
    async fn get_booking_by_reference(&self, reference: &str) -> Result<Option<Booking>>;

    /// Lists bookings matching a query, newest first.
    async fn list_bookings(&self, query: BookingQuery) -> Result<Vec<Booking>>;

    /// Counts bookings matching a query, ignoring its paging.
    async fn count_bookings(&self, query: BookingQuery) -> Result<usize>;

    /// Retrieves the payment attached to a booking.
    async fn get_payment_for_booking(&self, booking_id: BookingId) -> Result<Option<Payment>>;
}

/// An atomic unit of work over schedules, seats, bookings and payments.
///
/// `lock_*` reads take an exclusive lock on the rows they return, held
/// until the unit of work ends; waiting is bounded by the store's lock
/// timeout. `save_*` writes are staged and only become visible on
/// [`UnitOfWork::commit`]. Dropping a unit of work without committing
/// discards everything it staged.
///
/// Callers lock in the order booking, schedule, seats, payment.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Locks and returns a schedule.
    async fn lock_schedule(&mut self, id: ScheduleId) -> Result<Option<Schedule>>;

    /// Locks the named seats of a schedule.
    ///
    /// Ids that don't exist or belong to another schedule are silently
    /// absent from the result. Duplicate ids are returned once.
    async fn lock_seats(&mut self, schedule_id: ScheduleId, seat_ids: &[SeatId])
    -> Result<Vec<Seat>>;

    /// Locks and returns a booking.
    async fn lock_booking(&mut self, id: BookingId) -> Result<Option<Booking>>;

    /// Locks and returns the payment attached to a booking.
    async fn lock_payment_for_booking(&mut self, booking_id: BookingId)
    -> Result<Option<Payment>>;

    /// Returns true if a committed or staged booking uses `reference`.
    async fn booking_reference_exists(&mut self, reference: &str) -> Result<bool>;

    /// Returns true if a committed or staged payment uses `transaction_id`.
    async fn transaction_id_exists(&mut self, transaction_id: &str) -> Result<bool>;

    /// Stages an update to a schedule.
    async fn save_schedule(&mut self, schedule: &Schedule) -> Result<()>;

    /// Stages updates to seats.
    async fn save_seats(&mut self, seats: &[Seat]) -> Result<()>;

    /// Stages an insert or update of a booking.
    async fn save_booking(&mut self, booking: &Booking) -> Result<()>;

    /// Stages an insert or update of a payment.
    async fn save_payment(&mut self, payment: &Payment) -> Result<()>;

    /// Makes every staged write visible at once and releases all locks.
    ///
    /// Fails with `UniqueViolation` (applying nothing) if the staged rows
    /// would duplicate a booking reference, transaction id, booking payment
    /// or seat number.
    async fn commit(self) -> Result<()>;

    /// Discards every staged write and releases all locks.
    async fn rollback(self) -> Result<()>;
}
