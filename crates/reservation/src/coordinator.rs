//! Reservation coordinator: the only entry point for booking and cancelling.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use common::{BookingId, ScheduleId, SeatId, UserId};
use domain::{
    Booking, BookingStatus, Passenger, Payment, PaymentMethod, PaymentStatus, ReferenceKind,
    Schedule, Seat,
};
use store::{BookingQuery, ReservationStore, UnitOfWork};

use crate::capacity::ScheduleCapacityCounter;
use crate::clock::{Clock, SystemClock};
use crate::config::ReservationConfig;
use crate::error::{ErrorKind, NotificationError, ReservationError, Result};
use crate::inventory::SeatInventoryStore;
use crate::ledger::{BookingLedger, PaymentLedger};
use crate::notification::{LoggingNotificationSink, NotificationSink};
use crate::reference::ReferenceGenerator;

/// One page of a user's bookings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingPage {
    pub bookings: Vec<Booking>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl BookingPage {
    pub fn total_pages(&self) -> usize {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit)
        }
    }
}

/// Orchestrates CreateBooking and CancelBooking as single atomic units of
/// work over schedules, seats, bookings and payments.
///
/// Locks are taken in the order booking, schedule, seats, payment. Transient
/// aborts (lock timeouts, serialization conflicts, identifier collisions at
/// commit) re-run the whole operation according to the configured
/// [`RetryPolicy`](crate::RetryPolicy).
pub struct ReservationCoordinator<S, N = LoggingNotificationSink>
where
    S: ReservationStore,
    N: NotificationSink,
{
    store: S,
    notifier: N,
    clock: Arc<dyn Clock>,
    config: ReservationConfig,
}

impl<S, N> ReservationCoordinator<S, N>
where
    S: ReservationStore,
    N: NotificationSink,
{
    /// Creates a coordinator using the system clock and default configuration.
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            store,
            notifier,
            clock: Arc::new(SystemClock),
            config: ReservationConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_config(mut self, config: ReservationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ReservationConfig {
        &self.config
    }

    /// Books `seat_ids` on a schedule for `user_id` and records the payment.
    ///
    /// Either the booking, its payment, the claimed seats and the decremented
    /// seat counter are all committed, or none of them are.
    #[tracing::instrument(skip(self, seat_ids, passengers), fields(seats = seat_ids.len()))]
    pub async fn create_booking(
        &self,
        user_id: UserId,
        schedule_id: ScheduleId,
        seat_ids: Vec<SeatId>,
        passengers: Vec<Passenger>,
        payment_method: PaymentMethod,
    ) -> Result<(Booking, Payment)> {
        let started = Instant::now();
        let result = match validate_selection(&seat_ids, &passengers) {
            Ok(()) => {
                self.with_retry("create_booking", || {
                    self.try_create_booking(
                        user_id,
                        schedule_id,
                        &seat_ids,
                        &passengers,
                        payment_method,
                    )
                })
                .await
            }
            Err(err) => Err(err),
        };
        record_outcome("create_booking", started, &result);

        let (booking, payment) = result?;
        metrics::counter!("reservation_bookings_created_total").increment(1);
        tracing::info!(
            booking_id = %booking.id,
            booking_reference = %booking.booking_reference,
            total_amount = %booking.total_amount,
            "Booking confirmed"
        );

        if let Err(err) = self.notifier.booking_confirmed(&booking, &payment).await {
            notification_failed(booking.id, &err);
        }

        Ok((booking, payment))
    }

    /// Cancels a booking, frees its seats and refunds a paid booking
    /// according to the refund policy.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel_booking(
        &self,
        user_id: UserId,
        booking_id: BookingId,
        reason: Option<String>,
    ) -> Result<Booking> {
        let started = Instant::now();
        let result = self
            .with_retry("cancel_booking", || {
                self.try_cancel_booking(user_id, booking_id, reason.as_deref())
            })
            .await;
        record_outcome("cancel_booking", started, &result);

        let (booking, payment) = result?;
        metrics::counter!("reservation_bookings_cancelled_total").increment(1);
        tracing::info!(
            booking_reference = %booking.booking_reference,
            refund_amount = ?payment.as_ref().map(|p| p.refund_amount.to_string()),
            "Booking cancelled"
        );

        if let Err(err) = self
            .notifier
            .booking_cancelled(&booking, payment.as_ref())
            .await
        {
            notification_failed(booking.id, &err);
        }

        Ok(booking)
    }

    /// Returns a schedule and its seat map, creating the seats on first use.
    #[tracing::instrument(skip(self))]
    pub async fn seat_map(&self, schedule_id: ScheduleId) -> Result<(Schedule, Vec<Seat>)> {
        let seats = self
            .store
            .ensure_seat_map(schedule_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("schedule", schedule_id))?;
        let schedule = self
            .store
            .get_schedule(schedule_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("schedule", schedule_id))?;
        Ok((schedule, seats))
    }

    /// Returns one of the user's bookings.
    #[tracing::instrument(skip(self))]
    pub async fn get_booking(&self, user_id: UserId, booking_id: BookingId) -> Result<Booking> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("booking", booking_id))?;
        ensure_owner(&booking, user_id)?;
        Ok(booking)
    }

    /// Returns one of the user's bookings by its reference.
    #[tracing::instrument(skip(self))]
    pub async fn get_booking_by_reference(
        &self,
        user_id: UserId,
        reference: &str,
    ) -> Result<Booking> {
        let booking = self
            .store
            .get_booking_by_reference(reference)
            .await?
            .ok_or_else(|| ReservationError::not_found("booking", reference))?;
        ensure_owner(&booking, user_id)?;
        Ok(booking)
    }

    /// Lists the user's bookings newest first, optionally by status.
    ///
    /// `page` is 1-based; a zero page or limit is treated as 1.
    #[tracing::instrument(skip(self))]
    pub async fn list_bookings_for_user(
        &self,
        user_id: UserId,
        status: Option<BookingStatus>,
        page: usize,
        limit: usize,
    ) -> Result<BookingPage> {
        let page = page.max(1);
        let limit = limit.max(1);

        let mut query = BookingQuery::for_user(user_id);
        if let Some(status) = status {
            query = query.status(status);
        }

        let total = self.store.count_bookings(query.without_paging()).await?;
        let bookings = self.store.list_bookings(query.page(page, limit)).await?;

        Ok(BookingPage {
            bookings,
            total,
            page,
            limit,
        })
    }

    /// Returns the payment recorded for one of the user's bookings.
    #[tracing::instrument(skip(self))]
    pub async fn get_payment(&self, user_id: UserId, booking_id: BookingId) -> Result<Payment> {
        self.get_booking(user_id, booking_id).await?;
        self.store
            .get_payment_for_booking(booking_id)
            .await?
            .ok_or_else(|| ReservationError::not_found("payment", booking_id))
    }

    async fn try_create_booking(
        &self,
        user_id: UserId,
        schedule_id: ScheduleId,
        seat_ids: &[SeatId],
        passengers: &[Passenger],
        payment_method: PaymentMethod,
    ) -> Result<(Booking, Payment)> {
        let now = self.clock.now();
        let seat_count = u32::try_from(seat_ids.len()).map_err(|_| {
            ReservationError::Validation(format!("too many seats requested: {}", seat_ids.len()))
        })?;
        let mut uow = self.store.begin().await?;

        let mut schedule = uow.load_schedule_for_update(schedule_id).await?;
        schedule.ensure_bookable()?;
        if schedule.available_seats < seat_count {
            return Err(ReservationError::SeatUnavailable(format!(
                "requested {seat_count} seats but only {} are available",
                schedule.available_seats
            )));
        }

        let mut seats = uow.load_seats(schedule_id, seat_ids).await?;
        if let Some(taken) = seats.iter().find(|seat| !seat.is_free()) {
            return Err(ReservationError::SeatUnavailable(format!(
                "seat {} is already booked",
                taken.seat_number
            )));
        }

        let booking_reference = uow
            .unique_reference(ReferenceKind::Booking, now, self.config.reference_attempts)
            .await?;
        let mut booking = Booking::new_pending(
            user_id,
            schedule_id,
            seat_ids.to_vec(),
            assign_seat_numbers(seat_ids, passengers, &seats),
            schedule.price,
            booking_reference,
            now,
        )?;

        uow.claim(&mut seats, booking.id).await?;
        uow.reserve_capacity(&mut schedule, seat_count).await?;

        let transaction_id = uow
            .unique_reference(ReferenceKind::Transaction, now, self.config.reference_attempts)
            .await?;
        let payment = Payment::completed(&booking, payment_method, transaction_id, now);
        booking.confirm()?;

        uow.record_booking(&booking).await?;
        uow.record_payment(&payment).await?;
        uow.commit().await?;

        Ok((booking, payment))
    }

    async fn try_cancel_booking(
        &self,
        user_id: UserId,
        booking_id: BookingId,
        reason: Option<&str>,
    ) -> Result<(Booking, Option<Payment>)> {
        let now = self.clock.now();
        let mut uow = self.store.begin().await?;

        let mut booking = uow.load_booking_for_update(booking_id).await?;
        ensure_owner(&booking, user_id)?;
        if !booking.booking_status.can_cancel() {
            return Err(ReservationError::InvalidState(format!(
                "booking is already {}",
                booking.booking_status
            )));
        }

        let mut schedule = uow.load_schedule_for_update(booking.schedule_id).await?;
        let time_to_departure = schedule.time_to_departure(now);
        if time_to_departure < self.config.cancellation_cutoff {
            return Err(ReservationError::InvalidState(format!(
                "too close to departure to cancel: {} minutes left, cutoff is {} minutes",
                time_to_departure.num_minutes(),
                self.config.cancellation_cutoff.num_minutes()
            )));
        }

        booking.cancel(reason.map(str::to_string), now)?;
        uow.release(booking.schedule_id, &booking.seat_ids, booking.id)
            .await?;
        uow.restore_capacity(&mut schedule, booking.seat_count())
            .await?;

        let mut payment = uow.load_payment_for_update(booking.id).await?;
        if booking.payment_status == PaymentStatus::Paid {
            let Some(charge) = payment.as_mut() else {
                return Err(ReservationError::aborted(format!(
                    "paid booking {booking_id} has no payment record"
                )));
            };
            let refund_amount = self
                .config
                .refund_policy
                .refund(booking.total_amount, time_to_departure);
            charge.refund(refund_amount, now)?;
            booking.mark_refunded()?;
            uow.record_payment(charge).await?;
        }

        uow.record_booking(&booking).await?;
        uow.commit().await?;

        Ok((booking, payment))
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let policy = self.config.retry_policy;
        let mut attempt = 0;
        loop {
            match attempt_fn().await {
                Err(err) if err.is_transient() && policy.should_retry(attempt + 1) => {
                    let delay = policy.delay_for_attempt(attempt);
                    metrics::counter!("reservation_retries_total", "operation" => operation)
                        .increment(1);
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying after transient abort"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

/// Re-checks the structural preconditions of a booking request.
fn validate_selection(seat_ids: &[SeatId], passengers: &[Passenger]) -> Result<()> {
    if seat_ids.is_empty() {
        return Err(ReservationError::Validation(
            "at least one seat must be selected".to_string(),
        ));
    }
    if seat_ids.len() != passengers.len() {
        return Err(ReservationError::Validation(format!(
            "number of seats ({}) must match number of passengers ({})",
            seat_ids.len(),
            passengers.len()
        )));
    }
    let mut seen = HashSet::with_capacity(seat_ids.len());
    if let Some(duplicate) = seat_ids.iter().find(|id| !seen.insert(**id)) {
        return Err(ReservationError::Validation(format!(
            "seat {duplicate} selected more than once"
        )));
    }
    Ok(())
}

/// Copies each claimed seat's number onto the passenger travelling in it.
fn assign_seat_numbers(seat_ids: &[SeatId], passengers: &[Passenger], seats: &[Seat]) -> Vec<Passenger> {
    let numbers: HashMap<SeatId, &str> = seats
        .iter()
        .map(|seat| (seat.id, seat.seat_number.as_str()))
        .collect();

    seat_ids
        .iter()
        .zip(passengers)
        .map(|(seat_id, passenger)| {
            let mut passenger = passenger.clone();
            if let Some(number) = numbers.get(seat_id) {
                passenger.seat_number = (*number).to_string();
            }
            passenger
        })
        .collect()
}

fn ensure_owner(booking: &Booking, user_id: UserId) -> Result<()> {
    if booking.is_owned_by(user_id) {
        Ok(())
    } else {
        Err(ReservationError::Unauthorized(
            "booking belongs to another user".to_string(),
        ))
    }
}

fn record_outcome<T>(operation: &'static str, started: Instant, result: &Result<T>) {
    metrics::histogram!("reservation_operation_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());

    if let Err(err) = result {
        let kind = err.kind();
        metrics::counter!("reservation_failures_total", "kind" => kind.as_str()).increment(1);
        match kind {
            ErrorKind::TransactionAborted => {
                tracing::error!(operation, %kind, error = %err, "Reservation aborted")
            }
            ErrorKind::Unauthorized => {
                tracing::warn!(operation, %kind, error = %err, "Reservation rejected")
            }
            _ => tracing::debug!(operation, %kind, error = %err, "Reservation rejected"),
        }
    }
}

fn notification_failed(booking_id: BookingId, err: &NotificationError) {
    metrics::counter!("reservation_notification_failures_total").increment(1);
    tracing::warn!(%booking_id, error = %err, "Notification delivery failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use domain::{Gender, Money};
    use store::InMemoryReservationStore;

    use crate::clock::FixedClock;
    use crate::notification::InMemoryNotificationSink;

    fn passengers(n: usize) -> Vec<Passenger> {
        (1..=n)
            .map(|i| Passenger::new(format!("Passenger {i}"), 30, Gender::Other, format!("S{i}")))
            .collect()
    }

    async fn setup(
        capacity: u32,
        departs_in: Duration,
    ) -> (
        ReservationCoordinator<InMemoryReservationStore, InMemoryNotificationSink>,
        Schedule,
        Vec<Seat>,
    ) {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let store = InMemoryReservationStore::new();
        let schedule = Schedule::new(capacity, Money::from_major(500), now + departs_in);
        store.insert_schedule(schedule.clone()).await.unwrap();

        let coordinator = ReservationCoordinator::new(store, InMemoryNotificationSink::new())
            .with_clock(FixedClock::new(now));
        let (_, seats) = coordinator.seat_map(schedule.id).await.unwrap();
        (coordinator, schedule, seats)
    }

    #[test]
    fn test_validate_selection() {
        let a = SeatId::new();
        let b = SeatId::new();
        assert!(validate_selection(&[a, b], &passengers(2)).is_ok());
        assert_eq!(
            validate_selection(&[], &[]).unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            validate_selection(&[a], &passengers(2)).unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            validate_selection(&[a, a], &passengers(2)).unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_total_pages() {
        let page = |total, limit| BookingPage {
            bookings: Vec::new(),
            total,
            page: 1,
            limit,
        };
        assert_eq!(page(0, 10).total_pages(), 0);
        assert_eq!(page(10, 10).total_pages(), 1);
        assert_eq!(page(11, 10).total_pages(), 2);
    }

    #[tokio::test]
    async fn test_create_booking_commits_everything() {
        let (coordinator, schedule, seats) = setup(40, Duration::days(2)).await;
        let user = UserId::new();

        let (booking, payment) = coordinator
            .create_booking(
                user,
                schedule.id,
                vec![seats[0].id, seats[1].id],
                passengers(2),
                PaymentMethod::Upi,
            )
            .await
            .unwrap();

        assert_eq!(booking.booking_status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
        assert_eq!(booking.total_amount, Money::from_major(1000));
        assert_eq!(payment.amount, booking.total_amount);
        assert_eq!(payment.booking_id, booking.id);

        let store = coordinator.store();
        assert_eq!(store.get_booking(booking.id).await.unwrap(), Some(booking.clone()));
        assert_eq!(
            store.get_schedule(schedule.id).await.unwrap().unwrap().available_seats,
            38
        );
        let seats = store.list_seats(schedule.id).await.unwrap();
        assert!(seats[0].is_held_by(booking.id) && seats[1].is_held_by(booking.id));
    }

    #[tokio::test]
    async fn test_passenger_seat_numbers_follow_claimed_seats() {
        let (coordinator, schedule, seats) = setup(8, Duration::days(2)).await;

        let (booking, _) = coordinator
            .create_booking(
                UserId::new(),
                schedule.id,
                vec![seats[6].id, seats[4].id],
                passengers(2),
                PaymentMethod::Upi,
            )
            .await
            .unwrap();

        let numbers: Vec<_> = booking
            .passengers
            .iter()
            .map(|p| p.seat_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["S7", "S5"]);
        assert_eq!(booking.passengers[0].name, "Passenger 1");
    }

    #[tokio::test]
    async fn test_overflowing_amounts_are_rejected_or_bounded() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let store = InMemoryReservationStore::new();
        let pricey = Schedule::new(4, Money::from_minor(i64::MAX / 2 + 1), now + Duration::days(2));
        let large = Schedule::new(4, Money::from_minor(i64::MAX / 50), now + Duration::days(2));
        store.insert_schedule(pricey.clone()).await.unwrap();
        store.insert_schedule(large.clone()).await.unwrap();
        let coordinator = ReservationCoordinator::new(store, InMemoryNotificationSink::new())
            .with_clock(FixedClock::new(now));
        let user = UserId::new();

        let (_, seats) = coordinator.seat_map(pricey.id).await.unwrap();
        let err = coordinator
            .create_booking(
                user,
                pricey.id,
                vec![seats[0].id, seats[1].id],
                passengers(2),
                PaymentMethod::Upi,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let unchanged = coordinator.store().get_schedule(pricey.id).await.unwrap().unwrap();
        assert_eq!(unchanged.available_seats, 4);

        let (_, seats) = coordinator.seat_map(large.id).await.unwrap();
        let (booking, _) = coordinator
            .create_booking(user, large.id, vec![seats[0].id], passengers(1), PaymentMethod::Upi)
            .await
            .unwrap();
        coordinator.cancel_booking(user, booking.id, None).await.unwrap();
        let payment = coordinator.get_payment(user, booking.id).await.unwrap();
        assert_eq!(payment.refund_amount, booking.total_amount);
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        let (coordinator, schedule, seats) = setup(4, Duration::days(2)).await;
        let user = UserId::new();
        coordinator
            .create_booking(user, schedule.id, vec![seats[0].id], passengers(1), PaymentMethod::Upi)
            .await
            .unwrap();

        let page = coordinator
            .list_bookings_for_user(user, None, usize::MAX, 10)
            .await
            .unwrap();
        assert!(page.bookings.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!(page.page, usize::MAX);
    }

    #[tokio::test]
    async fn test_create_booking_on_unknown_schedule() {
        let (coordinator, _, seats) = setup(4, Duration::days(2)).await;
        let err = coordinator
            .create_booking(
                UserId::new(),
                ScheduleId::new(),
                vec![seats[0].id],
                passengers(1),
                PaymentMethod::Wallet,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_create_booking_rejects_closed_schedule() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let store = InMemoryReservationStore::new();
        let mut schedule = Schedule::new(4, Money::from_major(500), now + Duration::days(1));
        schedule.status = domain::ScheduleStatus::Cancelled;
        store.insert_schedule(schedule.clone()).await.unwrap();
        let coordinator = ReservationCoordinator::new(store, InMemoryNotificationSink::new())
            .with_clock(FixedClock::new(now));
        let (_, seats) = coordinator.seat_map(schedule.id).await.unwrap();

        let err = coordinator
            .create_booking(
                UserId::new(),
                schedule.id,
                vec![seats[0].id],
                passengers(1),
                PaymentMethod::DebitCard,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_no_trace() {
        let (coordinator, schedule, seats) = setup(4, Duration::days(2)).await;
        coordinator
            .create_booking(
                UserId::new(),
                schedule.id,
                vec![seats[2].id],
                passengers(1),
                PaymentMethod::Upi,
            )
            .await
            .unwrap();

        // Seat 0 is free, seat 2 is taken: nothing may be claimed.
        let err = coordinator
            .create_booking(
                UserId::new(),
                schedule.id,
                vec![seats[0].id, seats[2].id],
                passengers(2),
                PaymentMethod::Upi,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SeatUnavailable);

        let store = coordinator.store();
        assert_eq!(store.booking_count().await, 1);
        assert_eq!(store.payment_count().await, 1);
        assert!(store.list_seats(schedule.id).await.unwrap()[0].is_free());
        assert_eq!(
            store.get_schedule(schedule.id).await.unwrap().unwrap().available_seats,
            3
        );
    }

    #[tokio::test]
    async fn test_cancel_refunds_by_tier() {
        let (coordinator, schedule, seats) = setup(40, Duration::hours(13)).await;
        let user = UserId::new();
        let (booking, _) = coordinator
            .create_booking(
                user,
                schedule.id,
                vec![seats[0].id, seats[1].id],
                passengers(2),
                PaymentMethod::CreditCard,
            )
            .await
            .unwrap();

        let cancelled = coordinator
            .cancel_booking(user, booking.id, None)
            .await
            .unwrap();
        assert_eq!(cancelled.booking_status, BookingStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        assert_eq!(
            cancelled.cancellation_reason.as_deref(),
            Some(domain::booking::DEFAULT_CANCELLATION_REASON)
        );

        let payment = coordinator.get_payment(user, booking.id).await.unwrap();
        assert_eq!(payment.refund_amount, Money::from_major(750));
        assert_eq!(payment.status, domain::ChargeStatus::Refunded);
    }

    #[tokio::test]
    async fn test_cancel_by_other_user_is_unauthorized() {
        let (coordinator, schedule, seats) = setup(4, Duration::days(2)).await;
        let owner = UserId::new();
        let (booking, _) = coordinator
            .create_booking(owner, schedule.id, vec![seats[0].id], passengers(1), PaymentMethod::Upi)
            .await
            .unwrap();

        let err = coordinator
            .cancel_booking(UserId::new(), booking.id, Some("not mine".into()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = coordinator
            .get_booking(UserId::new(), booking.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        let err = coordinator
            .cancel_booking(owner, BookingId::new(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_booking() {
        let (coordinator, schedule, seats) = setup(4, Duration::days(2)).await;
        coordinator.notifier.set_fail(true).await;

        let result = coordinator
            .create_booking(
                UserId::new(),
                schedule.id,
                vec![seats[0].id],
                passengers(1),
                PaymentMethod::NetBanking,
            )
            .await;
        assert!(result.is_ok());
        assert_eq!(coordinator.notifier.failed_attempts().await, 1);
        assert_eq!(coordinator.store().booking_count().await, 1);
    }
}
