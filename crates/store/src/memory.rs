use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use common::{BookingId, PaymentId, ScheduleId, SeatId};
use domain::{Booking, Payment, Schedule, Seat};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    BOOKING_REFERENCE_CONSTRAINT, BookingQuery, PAYMENT_BOOKING_CONSTRAINT, Result,
    SCHEDULE_PKEY_CONSTRAINT, SEAT_NUMBER_CONSTRAINT, StoreError, TRANSACTION_ID_CONSTRAINT,
    store::{DEFAULT_LOCK_TIMEOUT, ReservationStore, UnitOfWork},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Schedule(ScheduleId),
    Seat(SeatId),
    Booking(BookingId),
    // Keyed by booking: a booking has at most one payment.
    Payment(BookingId),
}

impl RowKey {
    fn entity(&self) -> &'static str {
        match self {
            RowKey::Schedule(_) => "schedule",
            RowKey::Seat(_) => "seat",
            RowKey::Booking(_) => "booking",
            RowKey::Payment(_) => "payment",
        }
    }
}

/// Exclusive per-row locks shared by every unit of work of a store.
///
/// An entry lives only while some unit of work holds or waits for it.
#[derive(Default)]
struct RowLocks {
    rows: StdMutex<HashMap<RowKey, Arc<Mutex<()>>>>,
}

impl RowLocks {
    fn table(&self) -> MutexGuard<'_, HashMap<RowKey, Arc<Mutex<()>>>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn acquire(self: &Arc<Self>, key: RowKey, timeout: Duration) -> Result<RowGuard> {
        let row = self.table().entry(key).or_default().clone();

        let locked = tokio::time::timeout(timeout, row.lock_owned()).await;
        match locked {
            Ok(guard) => Ok(RowGuard {
                key,
                guard: Some(guard),
                locks: Arc::clone(self),
            }),
            Err(_) => {
                self.prune(key);
                Err(StoreError::LockTimeout {
                    entity: key.entity(),
                })
            }
        }
    }

    /// Drops the entry for `key` once nobody holds or waits for it.
    fn prune(&self, key: RowKey) {
        let mut rows = self.table();
        if rows
            .get(&key)
            .is_some_and(|row| Arc::strong_count(row) == 1)
        {
            rows.remove(&key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table().len()
    }
}

/// A held row lock. Releasing it prunes the row's entry when unused.
struct RowGuard {
    key: RowKey,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<RowLocks>,
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.prune(self.key);
    }
}

#[derive(Default)]
struct Tables {
    schedules: HashMap<ScheduleId, Schedule>,
    seats: HashMap<SeatId, Seat>,
    seat_layout: HashMap<ScheduleId, Vec<SeatId>>,
    bookings: HashMap<BookingId, Booking>,
    booking_order: Vec<BookingId>,
    booking_refs: HashMap<String, BookingId>,
    payments: HashMap<PaymentId, Payment>,
    payment_by_booking: HashMap<BookingId, PaymentId>,
    transaction_ids: HashMap<String, PaymentId>,
}

impl Tables {
    fn seats_of(&self, schedule_id: ScheduleId) -> Vec<Seat> {
        self.seat_layout
            .get(&schedule_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.seats.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn payment_for_booking(&self, booking_id: BookingId) -> Option<&Payment> {
        self.payment_by_booking
            .get(&booking_id)
            .and_then(|id| self.payments.get(id))
    }

    fn matching_bookings(&self, query: &BookingQuery) -> Vec<&Booking> {
        let mut bookings: Vec<_> = self
            .booking_order
            .iter()
            .rev()
            .filter_map(|id| self.bookings.get(id))
            .filter(|b| {
                if let Some(user_id) = query.user_id
                    && b.user_id != user_id
                {
                    return false;
                }
                if let Some(status) = query.status
                    && b.booking_status != status
                {
                    return false;
                }
                true
            })
            .collect();
        // Stable: insertion order (newest first) breaks timestamp ties.
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings
    }
}

/// In-memory reservation store with real row locking.
///
/// Every row a unit of work locks (or writes) stays exclusively held until
/// the unit of work commits, rolls back or is dropped, so it behaves like
/// the PostgreSQL store under contention. Used by tests and by the API
/// when no database is configured.
#[derive(Clone)]
pub struct InMemoryReservationStore {
    tables: Arc<RwLock<Tables>>,
    locks: Arc<RowLocks>,
    lock_timeout: Duration,
}

impl Default for InMemoryReservationStore {
    fn default() -> Self {
        Self {
            tables: Arc::default(),
            locks: Arc::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl InMemoryReservationStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how long units of work wait for a row lock.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Returns the total number of bookings stored.
    pub async fn booking_count(&self) -> usize {
        self.tables.read().await.bookings.len()
    }

    /// Returns the total number of payments stored.
    pub async fn payment_count(&self) -> usize {
        self.tables.read().await.payments.len()
    }

    /// Returns every stored payment.
    pub async fn all_payments(&self) -> Vec<Payment> {
        self.tables.read().await.payments.values().cloned().collect()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    type UnitOfWork = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<InMemoryUnitOfWork> {
        Ok(InMemoryUnitOfWork {
            tables: Arc::clone(&self.tables),
            locks: Arc::clone(&self.locks),
            lock_timeout: self.lock_timeout,
            held: HashMap::new(),
            schedules: HashMap::new(),
            seats: HashMap::new(),
            bookings: HashMap::new(),
            payments: HashMap::new(),
        })
    }

    async fn insert_schedule(&self, schedule: Schedule) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.schedules.contains_key(&schedule.id) {
            return Err(StoreError::unique(SCHEDULE_PKEY_CONSTRAINT));
        }
        tables.schedules.insert(schedule.id, schedule);
        Ok(())
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>> {
        Ok(self.tables.read().await.schedules.get(&id).cloned())
    }

    async fn ensure_seat_map(&self, schedule_id: ScheduleId) -> Result<Option<Vec<Seat>>> {
        {
            let tables = self.tables.read().await;
            if !tables.schedules.contains_key(&schedule_id) {
                return Ok(None);
            }
            if tables.seat_layout.contains_key(&schedule_id) {
                return Ok(Some(tables.seats_of(schedule_id)));
            }
        }

        let mut tables = self.tables.write().await;
        // Another caller may have created the layout while we waited.
        if !tables.seat_layout.contains_key(&schedule_id) {
            let Some(capacity) = tables.schedules.get(&schedule_id).map(|s| s.capacity) else {
                return Ok(None);
            };
            let seats = Seat::layout(schedule_id, capacity);
            tables
                .seat_layout
                .insert(schedule_id, seats.iter().map(|s| s.id).collect());
            for seat in seats {
                tables.seats.insert(seat.id, seat);
            }
            tracing::debug!(%schedule_id, capacity, "Created seat map");
        }
        Ok(Some(tables.seats_of(schedule_id)))
    }

    async fn list_seats(&self, schedule_id: ScheduleId) -> Result<Vec<Seat>> {
        Ok(self.tables.read().await.seats_of(schedule_id))
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn get_booking_by_reference(&self, reference: &str) -> Result<Option<Booking>> {
        let tables = self.tables.read().await;
        Ok(tables
            .booking_refs
            .get(reference)
            .and_then(|id| tables.bookings.get(id))
            .cloned())
    }

    async fn list_bookings(&self, query: BookingQuery) -> Result<Vec<Booking>> {
        let tables = self.tables.read().await;
        let bookings = tables
            .matching_bookings(&query)
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(bookings)
    }

    async fn count_bookings(&self, query: BookingQuery) -> Result<usize> {
        Ok(self.tables.read().await.matching_bookings(&query).len())
    }

    async fn get_payment_for_booking(&self, booking_id: BookingId) -> Result<Option<Payment>> {
        Ok(self
            .tables
            .read()
            .await
            .payment_for_booking(booking_id)
            .cloned())
    }
}

/// Unit of work over an [`InMemoryReservationStore`].
///
/// Writes are staged locally (and visible to this unit of work's own reads)
/// until commit.
pub struct InMemoryUnitOfWork {
    tables: Arc<RwLock<Tables>>,
    locks: Arc<RowLocks>,
    lock_timeout: Duration,
    held: HashMap<RowKey, RowGuard>,
    schedules: HashMap<ScheduleId, Schedule>,
    seats: HashMap<SeatId, Seat>,
    bookings: HashMap<BookingId, Booking>,
    payments: HashMap<PaymentId, Payment>,
}

impl InMemoryUnitOfWork {
    async fn lock(&mut self, key: RowKey) -> Result<()> {
        if !self.held.contains_key(&key) {
            let guard = self.locks.acquire(key, self.lock_timeout).await?;
            self.held.insert(key, guard);
        }
        Ok(())
    }

    fn staged_payment_for(&self, booking_id: BookingId) -> Option<&Payment> {
        self.payments.values().find(|p| p.booking_id == booking_id)
    }

    fn check_unique(&self, tables: &Tables) -> Result<()> {
        let mut references = HashSet::new();
        for booking in self.bookings.values() {
            let taken = tables
                .booking_refs
                .get(&booking.booking_reference)
                .is_some_and(|owner| *owner != booking.id);
            if taken || !references.insert(booking.booking_reference.as_str()) {
                return Err(StoreError::unique(BOOKING_REFERENCE_CONSTRAINT));
            }
        }

        let mut transaction_ids = HashSet::new();
        let mut paid_bookings = HashSet::new();
        for payment in self.payments.values() {
            let taken = tables
                .transaction_ids
                .get(&payment.transaction_id)
                .is_some_and(|owner| *owner != payment.id);
            if taken || !transaction_ids.insert(payment.transaction_id.as_str()) {
                return Err(StoreError::unique(TRANSACTION_ID_CONSTRAINT));
            }

            let duplicate = tables
                .payment_by_booking
                .get(&payment.booking_id)
                .is_some_and(|owner| *owner != payment.id);
            if duplicate || !paid_bookings.insert(payment.booking_id) {
                return Err(StoreError::unique(PAYMENT_BOOKING_CONSTRAINT));
            }
        }

        for seat in self.seats.values() {
            let clash = tables
                .seats_of(seat.schedule_id)
                .iter()
                .chain(self.seats.values())
                .any(|other| {
                    other.id != seat.id
                        && other.schedule_id == seat.schedule_id
                        && other.seat_number == seat.seat_number
                });
            if clash {
                return Err(StoreError::unique(SEAT_NUMBER_CONSTRAINT));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn lock_schedule(&mut self, id: ScheduleId) -> Result<Option<Schedule>> {
        self.lock(RowKey::Schedule(id)).await?;
        if let Some(staged) = self.schedules.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.tables.read().await.schedules.get(&id).cloned())
    }

    async fn lock_seats(
        &mut self,
        schedule_id: ScheduleId,
        seat_ids: &[SeatId],
    ) -> Result<Vec<Seat>> {
        let mut ids = seat_ids.to_vec();
        ids.sort();
        ids.dedup();

        for id in &ids {
            self.lock(RowKey::Seat(*id)).await?;
        }

        let tables = self.tables.read().await;
        let seats = ids
            .iter()
            .filter_map(|id| self.seats.get(id).or_else(|| tables.seats.get(id)))
            .filter(|seat| seat.schedule_id == schedule_id)
            .cloned()
            .collect();
        Ok(seats)
    }

    async fn lock_booking(&mut self, id: BookingId) -> Result<Option<Booking>> {
        self.lock(RowKey::Booking(id)).await?;
        if let Some(staged) = self.bookings.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn lock_payment_for_booking(
        &mut self,
        booking_id: BookingId,
    ) -> Result<Option<Payment>> {
        self.lock(RowKey::Payment(booking_id)).await?;
        if let Some(staged) = self.staged_payment_for(booking_id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self
            .tables
            .read()
            .await
            .payment_for_booking(booking_id)
            .cloned())
    }

    async fn booking_reference_exists(&mut self, reference: &str) -> Result<bool> {
        if self
            .bookings
            .values()
            .any(|b| b.booking_reference == reference)
        {
            return Ok(true);
        }
        Ok(self.tables.read().await.booking_refs.contains_key(reference))
    }

    async fn transaction_id_exists(&mut self, transaction_id: &str) -> Result<bool> {
        if self
            .payments
            .values()
            .any(|p| p.transaction_id == transaction_id)
        {
            return Ok(true);
        }
        Ok(self
            .tables
            .read()
            .await
            .transaction_ids
            .contains_key(transaction_id))
    }

    async fn save_schedule(&mut self, schedule: &Schedule) -> Result<()> {
        self.lock(RowKey::Schedule(schedule.id)).await?;
        self.schedules.insert(schedule.id, schedule.clone());
        Ok(())
    }

    async fn save_seats(&mut self, seats: &[Seat]) -> Result<()> {
        let mut ids: Vec<_> = seats.iter().map(|s| s.id).collect();
        ids.sort();
        for id in ids {
            self.lock(RowKey::Seat(id)).await?;
        }
        for seat in seats {
            self.seats.insert(seat.id, seat.clone());
        }
        Ok(())
    }

    async fn save_booking(&mut self, booking: &Booking) -> Result<()> {
        self.lock(RowKey::Booking(booking.id)).await?;
        self.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn save_payment(&mut self, payment: &Payment) -> Result<()> {
        self.lock(RowKey::Payment(payment.booking_id)).await?;
        self.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let mut tables = self.tables.write().await;
        self.check_unique(&tables)?;

        for (id, schedule) in self.schedules {
            tables.schedules.insert(id, schedule);
        }

        for (id, seat) in self.seats {
            if !tables.seats.contains_key(&id) {
                tables
                    .seat_layout
                    .entry(seat.schedule_id)
                    .or_default()
                    .push(id);
            }
            tables.seats.insert(id, seat);
        }

        for (id, booking) in self.bookings {
            match tables.bookings.get(&id).map(|b| b.booking_reference.clone()) {
                Some(previous) => {
                    tables.booking_refs.remove(&previous);
                }
                None => tables.booking_order.push(id),
            }
            tables.booking_refs.insert(booking.booking_reference.clone(), id);
            tables.bookings.insert(id, booking);
        }

        for (id, payment) in self.payments {
            if let Some(previous) = tables.payments.get(&id).map(|p| p.transaction_id.clone()) {
                tables.transaction_ids.remove(&previous);
            }
            tables.transaction_ids.insert(payment.transaction_id.clone(), id);
            tables.payment_by_booking.insert(payment.booking_id, id);
            tables.payments.insert(id, payment);
        }

        // Row locks in `self.held` are released as they drop here.
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
