//! Post-commit notifications (email, SMS and the like).

use std::sync::Arc;

use async_trait::async_trait;
use common::{BookingId, UserId};
use domain::{Booking, Money, Payment};
use tokio::sync::RwLock;

use crate::error::NotificationError;

/// Receives booking outcomes after they are committed.
///
/// Delivery is best effort: the coordinator logs and counts failures but
/// never fails or retries the booking operation because of them.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn booking_confirmed(
        &self,
        booking: &Booking,
        payment: &Payment,
    ) -> Result<(), NotificationError>;

    async fn booking_cancelled(
        &self,
        booking: &Booking,
        payment: Option<&Payment>,
    ) -> Result<(), NotificationError>;
}

/// Emits a tracing event per notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotificationSink;

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn booking_confirmed(
        &self,
        booking: &Booking,
        payment: &Payment,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            booking_reference = %booking.booking_reference,
            user_id = %booking.user_id,
            transaction_id = %payment.transaction_id,
            amount = %payment.amount,
            "Booking confirmation notification"
        );
        Ok(())
    }

    async fn booking_cancelled(
        &self,
        booking: &Booking,
        payment: Option<&Payment>,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            booking_reference = %booking.booking_reference,
            user_id = %booking.user_id,
            refund = %payment.map(|p| p.refund_amount).unwrap_or_else(Money::zero),
            "Booking cancellation notification"
        );
        Ok(())
    }
}

/// A notification recorded by [`InMemoryNotificationSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    BookingConfirmed {
        booking_id: BookingId,
        user_id: UserId,
        booking_reference: String,
        amount: Money,
    },
    BookingCancelled {
        booking_id: BookingId,
        user_id: UserId,
        booking_reference: String,
        refund_amount: Option<Money>,
    },
}

#[derive(Debug, Default)]
struct InMemorySinkState {
    delivered: Vec<Notification>,
    failed_attempts: usize,
    fail: bool,
}

/// In-memory notification sink for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationSink {
    state: Arc<RwLock<InMemorySinkState>>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the sink to reject every delivery.
    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }

    /// Returns the notifications delivered so far.
    pub async fn delivered(&self) -> Vec<Notification> {
        self.state.read().await.delivered.clone()
    }

    /// Returns the number of rejected deliveries.
    pub async fn failed_attempts(&self) -> usize {
        self.state.read().await.failed_attempts
    }

    async fn deliver(&self, notification: Notification) -> Result<(), NotificationError> {
        let mut state = self.state.write().await;
        if state.fail {
            state.failed_attempts += 1;
            return Err(NotificationError("mail server unavailable".to_string()));
        }
        state.delivered.push(notification);
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn booking_confirmed(
        &self,
        booking: &Booking,
        payment: &Payment,
    ) -> Result<(), NotificationError> {
        self.deliver(Notification::BookingConfirmed {
            booking_id: booking.id,
            user_id: booking.user_id,
            booking_reference: booking.booking_reference.clone(),
            amount: payment.amount,
        })
        .await
    }

    async fn booking_cancelled(
        &self,
        booking: &Booking,
        payment: Option<&Payment>,
    ) -> Result<(), NotificationError> {
        self.deliver(Notification::BookingCancelled {
            booking_id: booking.id,
            user_id: booking.user_id,
            booking_reference: booking.booking_reference.clone(),
            refund_amount: payment.map(|p| p.refund_amount),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{ScheduleId, SeatId};
    use domain::{Gender, Passenger, PaymentMethod};

    fn confirmed_booking() -> (Booking, Payment) {
        let mut booking = Booking::new_pending(
            UserId::new(),
            ScheduleId::new(),
            vec![SeatId::new()],
            vec![Passenger::new("Noor", 27, Gender::Female, "S7")],
            Money::from_major(650),
            "BK17000000000000001".into(),
            Utc::now(),
        )
        .unwrap();
        booking.confirm().unwrap();
        let payment = Payment::completed(&booking, PaymentMethod::Wallet, "TXN1".into(), Utc::now());
        (booking, payment)
    }

    #[tokio::test]
    async fn test_records_deliveries() {
        let sink = InMemoryNotificationSink::new();
        let (booking, payment) = confirmed_booking();

        sink.booking_confirmed(&booking, &payment).await.unwrap();
        sink.booking_cancelled(&booking, None).await.unwrap();

        let delivered = sink.delivered().await;
        assert_eq!(delivered.len(), 2);
        assert!(matches!(
            delivered[0],
            Notification::BookingConfirmed { amount, .. } if amount == Money::from_major(650)
        ));
        assert!(matches!(
            delivered[1],
            Notification::BookingCancelled { refund_amount: None, .. }
        ));
    }

    #[tokio::test]
    async fn test_fail_mode() {
        let sink = InMemoryNotificationSink::new();
        sink.set_fail(true).await;
        let (booking, payment) = confirmed_booking();

        assert!(sink.booking_confirmed(&booking, &payment).await.is_err());
        assert!(sink.delivered().await.is_empty());
        assert_eq!(sink.failed_attempts().await, 1);
    }

    #[tokio::test]
    async fn test_logging_sink_never_fails() {
        let (booking, payment) = confirmed_booking();
        let sink = LoggingNotificationSink;
        assert!(sink.booking_confirmed(&booking, &payment).await.is_ok());
        assert!(sink.booking_cancelled(&booking, Some(&payment)).await.is_ok());
    }
}
