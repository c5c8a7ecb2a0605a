//! Seat inventory operations inside a unit of work.

use async_trait::async_trait;
use common::{BookingId, ScheduleId, SeatId};
use domain::{
    Seat,
    seat::{claim_all, release_all},
};
use store::UnitOfWork;

use crate::error::{ReservationError, Result};

/// Atomic claim and release of seat sets.
///
/// Nothing here commits: changes become visible with the surrounding
/// unit of work or not at all.
#[async_trait]
pub trait SeatInventoryStore: UnitOfWork {
    /// Locks the requested seats of a schedule.
    ///
    /// Fails `InvalidSelection` if any id is unknown or belongs to another
    /// schedule.
    async fn load_seats(&mut self, schedule_id: ScheduleId, seat_ids: &[SeatId]) -> Result<Vec<Seat>> {
        let seats = self.lock_seats(schedule_id, seat_ids).await?;
        if seats.len() != seat_ids.len() {
            return Err(ReservationError::InvalidSelection(format!(
                "{} of {} seats do not belong to schedule {schedule_id}",
                seat_ids.len() - seats.len(),
                seat_ids.len()
            )));
        }
        Ok(seats)
    }

    /// Marks every seat booked by `booking_id`, or none of them.
    async fn claim(&mut self, seats: &mut [Seat], booking_id: BookingId) -> Result<()> {
        claim_all(seats, booking_id)?;
        self.save_seats(seats).await?;
        Ok(())
    }

    /// Frees every seat held by `booking_id`.
    async fn release(
        &mut self,
        schedule_id: ScheduleId,
        seat_ids: &[SeatId],
        booking_id: BookingId,
    ) -> Result<Vec<Seat>> {
        let mut seats = self.lock_seats(schedule_id, seat_ids).await?;
        if seats.len() != seat_ids.len() {
            return Err(ReservationError::aborted(format!(
                "booking {booking_id} references seats missing from schedule {schedule_id}"
            )));
        }
        release_all(&mut seats, booking_id)?;
        self.save_seats(&seats).await?;
        Ok(seats)
    }
}

impl<T: UnitOfWork> SeatInventoryStore for T {}
