//! The per-schedule available-seat counter.

use async_trait::async_trait;
use common::ScheduleId;
use domain::Schedule;
use store::UnitOfWork;

use crate::error::{ReservationError, Result};

/// Keeps `available_seats` in step with the seat inventory.
#[async_trait]
pub trait ScheduleCapacityCounter: UnitOfWork {
    /// Locks a schedule, failing `NotFound` if it doesn't exist.
    async fn load_schedule_for_update(&mut self, schedule_id: ScheduleId) -> Result<Schedule> {
        self.lock_schedule(schedule_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("schedule", schedule_id))
    }

    async fn reserve_capacity(&mut self, schedule: &mut Schedule, count: u32) -> Result<()> {
        schedule.reserve_seats(count)?;
        self.save_schedule(schedule).await?;
        Ok(())
    }

    async fn restore_capacity(&mut self, schedule: &mut Schedule, count: u32) -> Result<()> {
        schedule.release_seats(count)?;
        self.save_schedule(schedule).await?;
        Ok(())
    }
}

impl<T: UnitOfWork> ScheduleCapacityCounter for T {}
