//! Booking and payment records inside a unit of work.

use async_trait::async_trait;
use common::BookingId;
use domain::{Booking, Payment};
use store::UnitOfWork;

use crate::error::{ReservationError, Result};

#[async_trait]
pub trait BookingLedger: UnitOfWork {
    /// Locks a booking, failing `NotFound` if it doesn't exist.
    async fn load_booking_for_update(&mut self, booking_id: BookingId) -> Result<Booking> {
        self.lock_booking(booking_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("booking", booking_id))
    }

    async fn record_booking(&mut self, booking: &Booking) -> Result<()> {
        self.save_booking(booking).await?;
        Ok(())
    }
}

impl<T: UnitOfWork> BookingLedger for T {}

#[async_trait]
pub trait PaymentLedger: UnitOfWork {
    async fn load_payment_for_update(&mut self, booking_id: BookingId) -> Result<Option<Payment>> {
        Ok(self.lock_payment_for_booking(booking_id).await?)
    }

    async fn record_payment(&mut self, payment: &Payment) -> Result<()> {
        self.save_payment(payment).await?;
        Ok(())
    }
}

impl<T: UnitOfWork> PaymentLedger for T {}
