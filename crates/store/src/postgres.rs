use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use common::{BookingId, PaymentId, ScheduleId, SeatId, UserId};
use domain::{Booking, Money, Passenger, Payment, Schedule, Seat};
use sqlx::{
    PgPool, Postgres, Row, Transaction,
    postgres::{PgArguments, PgRow},
    query::Query,
};
use uuid::Uuid;

use crate::{
    BookingQuery, Result, StoreError,
    store::{DEFAULT_LOCK_TIMEOUT, ReservationStore, UnitOfWork},
};

const SCHEDULE_COLUMNS: &str = "id, capacity, available_seats, price_minor, departure_at, status";
const SEAT_COLUMNS: &str = "id, schedule_id, seat_number, seat_type, status, holder_booking_id";
const BOOKING_COLUMNS: &str = "id, user_id, schedule_id, seat_ids, passengers, total_minor, booking_status, payment_status, booking_reference, cancellation_date, cancellation_reason, created_at";
const PAYMENT_COLUMNS: &str = "id, booking_id, user_id, amount_minor, method, transaction_id, status, paid_at, refund_minor, refund_date";

/// Maps a database error, translating lock timeouts, serialization
/// failures, deadlocks and unique violations into their store variants.
fn db_error(entity: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |err| {
        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.code().as_deref() {
                Some("55P03") => return StoreError::LockTimeout { entity },
                Some("40001") | Some("40P01") => {
                    return StoreError::Conflict(db_err.message().to_string());
                }
                Some("23505") => {
                    return StoreError::unique(db_err.constraint().unwrap_or("unknown"));
                }
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

fn parse<T: FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse().map_err(StoreError::Corrupt)
}

fn non_negative(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {column}: {value}")))
}

fn to_integer<T>(value: T, column: &str) -> Result<i32>
where
    T: TryInto<i32> + Copy + std::fmt::Display,
{
    value
        .try_into()
        .map_err(|_| StoreError::OutOfRange(format!("{column} {value} does not fit in INTEGER")))
}

// LIMIT and OFFSET beyond i64::MAX select nothing more than i64::MAX does.
fn to_bigint(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn row_to_schedule(row: PgRow) -> Result<Schedule> {
    Ok(Schedule {
        id: ScheduleId::from_uuid(row.try_get::<Uuid, _>("id")?),
        capacity: non_negative(row.try_get("capacity")?, "capacity")?,
        available_seats: non_negative(row.try_get("available_seats")?, "available_seats")?,
        price: Money::from_minor(row.try_get("price_minor")?),
        departure_at: row.try_get("departure_at")?,
        status: parse(row.try_get::<&str, _>("status")?)?,
    })
}

fn row_to_seat(row: PgRow) -> Result<Seat> {
    Ok(Seat {
        id: SeatId::from_uuid(row.try_get::<Uuid, _>("id")?),
        schedule_id: ScheduleId::from_uuid(row.try_get::<Uuid, _>("schedule_id")?),
        seat_number: row.try_get("seat_number")?,
        seat_type: parse(row.try_get::<&str, _>("seat_type")?)?,
        status: parse(row.try_get::<&str, _>("status")?)?,
        holder_booking_id: row
            .try_get::<Option<Uuid>, _>("holder_booking_id")?
            .map(BookingId::from_uuid),
    })
}

fn row_to_booking(row: PgRow) -> Result<Booking> {
    let passengers_json: serde_json::Value = row.try_get("passengers")?;
    let passengers: Vec<Passenger> = serde_json::from_value(passengers_json)?;

    Ok(Booking {
        id: BookingId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        schedule_id: ScheduleId::from_uuid(row.try_get::<Uuid, _>("schedule_id")?),
        seat_ids: row
            .try_get::<Vec<Uuid>, _>("seat_ids")?
            .into_iter()
            .map(SeatId::from_uuid)
            .collect(),
        passengers,
        total_amount: Money::from_minor(row.try_get("total_minor")?),
        booking_status: parse(row.try_get::<&str, _>("booking_status")?)?,
        payment_status: parse(row.try_get::<&str, _>("payment_status")?)?,
        booking_reference: row.try_get("booking_reference")?,
        cancellation_date: row.try_get("cancellation_date")?,
        cancellation_reason: row.try_get("cancellation_reason")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_payment(row: PgRow) -> Result<Payment> {
    Ok(Payment {
        id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
        booking_id: BookingId::from_uuid(row.try_get::<Uuid, _>("booking_id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        amount: Money::from_minor(row.try_get("amount_minor")?),
        method: parse(row.try_get::<&str, _>("method")?)?,
        transaction_id: row.try_get("transaction_id")?,
        status: parse(row.try_get::<&str, _>("status")?)?,
        paid_at: row.try_get("paid_at")?,
        refund_amount: Money::from_minor(row.try_get("refund_minor")?),
        refund_date: row.try_get("refund_date")?,
    })
}

/// Appends the WHERE clause for a booking query's filters, numbering
/// parameters from `$1`. Returns the number of parameters used.
fn push_booking_filters(sql: &mut String, query: &BookingQuery) -> usize {
    let mut param_count = 0;
    sql.push_str(" WHERE 1=1");
    if query.user_id.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND user_id = ${param_count}"));
    }
    if query.status.is_some() {
        param_count += 1;
        sql.push_str(&format!(" AND booking_status = ${param_count}"));
    }
    param_count
}

fn bind_booking_filters<'q>(
    mut sqlx_query: Query<'q, Postgres, PgArguments>,
    query: &BookingQuery,
) -> Query<'q, Postgres, PgArguments> {
    if let Some(user_id) = query.user_id {
        sqlx_query = sqlx_query.bind(user_id.as_uuid());
    }
    if let Some(status) = query.status {
        sqlx_query = sqlx_query.bind(status.as_str());
    }
    sqlx_query
}

/// PostgreSQL-backed reservation store.
///
/// Units of work are database transactions; `lock_*` reads use
/// `SELECT ... FOR UPDATE` bounded by a per-transaction `lock_timeout`.
#[derive(Clone)]
pub struct PostgresReservationStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresReservationStore {
    /// Creates a new PostgreSQL reservation store.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Sets how long transactions wait for a row lock.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for PostgresReservationStore {
    type UnitOfWork = PostgresUnitOfWork;

    async fn begin(&self) -> Result<PostgresUnitOfWork> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        Ok(PostgresUnitOfWork { tx })
    }

    async fn insert_schedule(&self, schedule: Schedule) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO schedules (id, capacity, available_seats, price_minor, departure_at, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(schedule.id.as_uuid())
        .bind(to_integer(schedule.capacity, "capacity")?)
        .bind(to_integer(schedule.available_seats, "available_seats")?)
        .bind(schedule.price.minor_units())
        .bind(schedule.departure_at)
        .bind(schedule.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error("schedule"))?;

        Ok(())
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>> {
        let row = sqlx::query(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_schedule).transpose()
    }

    async fn ensure_seat_map(&self, schedule_id: ScheduleId) -> Result<Option<Vec<Seat>>> {
        let Some(schedule) = self.get_schedule(schedule_id).await? else {
            return Ok(None);
        };
        let existing = self.list_seats(schedule_id).await?;
        if !existing.is_empty() || schedule.capacity == 0 {
            return Ok(Some(existing));
        }

        // The schedule row lock serializes concurrent first calls.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT id FROM schedules WHERE id = $1 FOR UPDATE")
            .bind(schedule_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_error("schedule"))?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seats WHERE schedule_id = $1")
            .bind(schedule_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;

        if count == 0 {
            for (position, seat) in Seat::layout(schedule_id, schedule.capacity)
                .into_iter()
                .enumerate()
            {
                sqlx::query(
                    r#"
                    INSERT INTO seats (id, schedule_id, seat_number, seat_type, status, holder_booking_id, position)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(seat.id.as_uuid())
                .bind(seat.schedule_id.as_uuid())
                .bind(&seat.seat_number)
                .bind(seat.seat_type.as_str())
                .bind(seat.status.as_str())
                .bind(seat.holder_booking_id.map(|id| id.as_uuid()))
                .bind(to_integer(position + 1, "position")?)
                .execute(&mut *tx)
                .await
                .map_err(db_error("seat"))?;
            }
            tracing::debug!(%schedule_id, capacity = schedule.capacity, "Created seat map");
        }

        tx.commit().await?;
        Ok(Some(self.list_seats(schedule_id).await?))
    }

    async fn list_seats(&self, schedule_id: ScheduleId) -> Result<Vec<Seat>> {
        let rows = sqlx::query(&format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE schedule_id = $1 ORDER BY position ASC"
        ))
        .bind(schedule_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_seat).collect()
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_booking).transpose()
    }

    async fn get_booking_by_reference(&self, reference: &str) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_reference = $1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_booking).transpose()
    }

    async fn list_bookings(&self, query: BookingQuery) -> Result<Vec<Booking>> {
        let mut sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings");
        let mut param_count = push_booking_filters(&mut sql, &query);

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = bind_booking_filters(sqlx::query(&sql), &query);
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(to_bigint(limit));
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(to_bigint(offset));
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_booking).collect()
    }

    async fn count_bookings(&self, query: BookingQuery) -> Result<usize> {
        let mut sql = String::from("SELECT COUNT(*) AS total FROM bookings");
        push_booking_filters(&mut sql, &query);

        let row = bind_booking_filters(sqlx::query(&sql), &query)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.try_get("total")?;
        usize::try_from(total).map_err(|_| StoreError::Corrupt(format!("booking count {total}")))
    }

    async fn get_payment_for_booking(&self, booking_id: BookingId) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = $1"
        ))
        .bind(booking_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_payment).transpose()
    }
}

/// A database transaction over the reservation tables.
///
/// Dropping it without committing rolls the transaction back.
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn lock_schedule(&mut self, id: ScheduleId) -> Result<Option<Schedule>> {
        let row = sqlx::query(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("schedule"))?;

        row.map(row_to_schedule).transpose()
    }

    async fn lock_seats(
        &mut self,
        schedule_id: ScheduleId,
        seat_ids: &[SeatId],
    ) -> Result<Vec<Seat>> {
        let mut ids: Vec<Uuid> = seat_ids.iter().map(|id| id.as_uuid()).collect();
        ids.sort();
        ids.dedup();

        // ORDER BY id makes every transaction take seat locks in the same order.
        let rows = sqlx::query(&format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE schedule_id = $1 AND id = ANY($2) ORDER BY id FOR UPDATE"
        ))
        .bind(schedule_id.as_uuid())
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_error("seat"))?;

        rows.into_iter().map(row_to_seat).collect()
    }

    async fn lock_booking(&mut self, id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("booking"))?;

        row.map(row_to_booking).transpose()
    }

    async fn lock_payment_for_booking(
        &mut self,
        booking_id: BookingId,
    ) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = $1 FOR UPDATE"
        ))
        .bind(booking_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error("payment"))?;

        row.map(row_to_payment).transpose()
    }

    async fn booking_reference_exists(&mut self, reference: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM bookings WHERE booking_reference = $1)",
        )
        .bind(reference)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    async fn transaction_id_exists(&mut self, transaction_id: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM payments WHERE transaction_id = $1)",
        )
        .bind(transaction_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    async fn save_schedule(&mut self, schedule: &Schedule) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE schedules
            SET capacity = $2, available_seats = $3, price_minor = $4, departure_at = $5, status = $6
            WHERE id = $1
            "#,
        )
        .bind(schedule.id.as_uuid())
        .bind(to_integer(schedule.capacity, "capacity")?)
        .bind(to_integer(schedule.available_seats, "available_seats")?)
        .bind(schedule.price.minor_units())
        .bind(schedule.departure_at)
        .bind(schedule.status.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("schedule"))?;

        Ok(())
    }

    async fn save_seats(&mut self, seats: &[Seat]) -> Result<()> {
        for seat in seats {
            sqlx::query(
                r#"
                INSERT INTO seats (id, schedule_id, seat_number, seat_type, status, holder_booking_id, position)
                VALUES ($1, $2, $3, $4, $5, $6,
                    (SELECT COALESCE(MAX(position), 0) + 1 FROM seats WHERE schedule_id = $2))
                ON CONFLICT (id) DO UPDATE SET
                    status = EXCLUDED.status,
                    holder_booking_id = EXCLUDED.holder_booking_id
                "#,
            )
            .bind(seat.id.as_uuid())
            .bind(seat.schedule_id.as_uuid())
            .bind(&seat.seat_number)
            .bind(seat.seat_type.as_str())
            .bind(seat.status.as_str())
            .bind(seat.holder_booking_id.map(|id| id.as_uuid()))
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("seat"))?;
        }

        Ok(())
    }

    async fn save_booking(&mut self, booking: &Booking) -> Result<()> {
        let passengers_json = serde_json::to_value(&booking.passengers)?;
        let seat_ids: Vec<Uuid> = booking.seat_ids.iter().map(|id| id.as_uuid()).collect();

        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_id, schedule_id, seat_ids, passengers, total_minor,
                booking_status, payment_status, booking_reference, cancellation_date,
                cancellation_reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                booking_status = EXCLUDED.booking_status,
                payment_status = EXCLUDED.payment_status,
                booking_reference = EXCLUDED.booking_reference,
                cancellation_date = EXCLUDED.cancellation_date,
                cancellation_reason = EXCLUDED.cancellation_reason
            "#,
        )
        .bind(booking.id.as_uuid())
        .bind(booking.user_id.as_uuid())
        .bind(booking.schedule_id.as_uuid())
        .bind(seat_ids)
        .bind(passengers_json)
        .bind(booking.total_amount.minor_units())
        .bind(booking.booking_status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.booking_reference)
        .bind(booking.cancellation_date)
        .bind(&booking.cancellation_reason)
        .bind(booking.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("booking"))?;

        Ok(())
    }

    async fn save_payment(&mut self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, booking_id, user_id, amount_minor, method, transaction_id,
                status, paid_at, refund_minor, refund_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                refund_minor = EXCLUDED.refund_minor,
                refund_date = EXCLUDED.refund_date
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.booking_id.as_uuid())
        .bind(payment.user_id.as_uuid())
        .bind(payment.amount.minor_units())
        .bind(payment.method.as_str())
        .bind(&payment.transaction_id)
        .bind(payment.status.as_str())
        .bind(payment.paid_at)
        .bind(payment.refund_amount.minor_units())
        .bind(payment.refund_date)
        .execute(&mut *self.tx)
        .await
        .map_err(db_error("payment"))?;

        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(db_error("commit"))
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
