//! Booking, cancellation and payment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{BookingId, ScheduleId, SeatId};
use domain::{Booking, BookingStatus, Gender, Passenger, Payment, PaymentMethod};
use serde::{Deserialize, Serialize};
use store::ReservationStore;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::error::ApiError;

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;
const MAX_NAME_LEN: usize = 100;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub schedule_id: String,
    pub seat_ids: Vec<String>,
    pub passengers: Vec<PassengerRequest>,
    pub payment_method: String,
}

#[derive(Deserialize)]
pub struct PassengerRequest {
    pub name: String,
    pub age: i64,
    pub gender: String,
    /// Informational only; the stored value is the number of the claimed seat.
    #[serde(default)]
    pub seat_number: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// A create request with every field parsed and checked.
#[derive(Debug)]
struct ValidatedBooking {
    schedule_id: ScheduleId,
    seat_ids: Vec<SeatId>,
    passengers: Vec<Passenger>,
    payment_method: PaymentMethod,
}

impl CreateBookingRequest {
    fn validate(self) -> Result<ValidatedBooking, ApiError> {
        let schedule_id = self
            .schedule_id
            .parse()
            .map_err(|e| ApiError::BadRequest(format!("Invalid schedule_id: {e}")))?;

        if self.seat_ids.is_empty() {
            return Err(ApiError::BadRequest(
                "at least one seat must be selected".to_string(),
            ));
        }
        let seat_ids = self
            .seat_ids
            .iter()
            .map(|id| {
                id.parse()
                    .map_err(|e| ApiError::BadRequest(format!("Invalid seat id {id}: {e}")))
            })
            .collect::<Result<Vec<SeatId>, _>>()?;

        if self.passengers.len() != seat_ids.len() {
            return Err(ApiError::BadRequest(format!(
                "number of seats ({}) must match number of passengers ({})",
                seat_ids.len(),
                self.passengers.len()
            )));
        }
        let passengers = self
            .passengers
            .into_iter()
            .map(PassengerRequest::validate)
            .collect::<Result<Vec<_>, _>>()?;

        let payment_method = self
            .payment_method
            .parse()
            .map_err(ApiError::BadRequest)?;

        Ok(ValidatedBooking {
            schedule_id,
            seat_ids,
            passengers,
            payment_method,
        })
    }
}

impl PassengerRequest {
    fn validate(self) -> Result<Passenger, ApiError> {
        let name = self.name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(ApiError::BadRequest(format!(
                "passenger name must be 1 to {MAX_NAME_LEN} characters"
            )));
        }
        let age = u8::try_from(self.age)
            .ok()
            .filter(|age| (1..=120).contains(age))
            .ok_or_else(|| {
                ApiError::BadRequest(format!("passenger age {} is out of range 1-120", self.age))
            })?;
        let gender: Gender = self.gender.parse().map_err(ApiError::BadRequest)?;
        let seat_number = self.seat_number.as_deref().map(str::trim).unwrap_or_default();

        Ok(Passenger::new(name, age, gender, seat_number))
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub booking_reference: String,
    pub user_id: String,
    pub schedule_id: String,
    pub seat_ids: Vec<String>,
    pub passengers: Vec<PassengerResponse>,
    pub total_amount_minor: i64,
    pub booking_status: String,
    pub payment_status: String,
    pub cancellation_date: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct PassengerResponse {
    pub name: String,
    pub age: u8,
    pub gender: String,
    pub seat_number: String,
}

impl From<&Booking> for BookingResponse {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id.to_string(),
            booking_reference: booking.booking_reference.clone(),
            user_id: booking.user_id.to_string(),
            schedule_id: booking.schedule_id.to_string(),
            seat_ids: booking.seat_ids.iter().map(ToString::to_string).collect(),
            passengers: booking
                .passengers
                .iter()
                .map(|p| PassengerResponse {
                    name: p.name.clone(),
                    age: p.age,
                    gender: p.gender.to_string(),
                    seat_number: p.seat_number.clone(),
                })
                .collect(),
            total_amount_minor: booking.total_amount.minor_units(),
            booking_status: booking.booking_status.to_string(),
            payment_status: booking.payment_status.to_string(),
            cancellation_date: booking.cancellation_date,
            cancellation_reason: booking.cancellation_reason.clone(),
            created_at: booking.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub booking_id: String,
    pub amount_minor: i64,
    pub method: String,
    pub transaction_id: String,
    pub status: String,
    pub paid_at: DateTime<Utc>,
    pub refund_amount_minor: i64,
    pub refund_date: Option<DateTime<Utc>>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            booking_id: payment.booking_id.to_string(),
            amount_minor: payment.amount.minor_units(),
            method: payment.method.to_string(),
            transaction_id: payment.transaction_id.clone(),
            status: payment.status.to_string(),
            paid_at: payment.paid_at,
            refund_amount_minor: payment.refund_amount.minor_units(),
            refund_date: payment.refund_date,
        }
    }
}

#[derive(Serialize)]
pub struct BookingCreatedResponse {
    pub booking: BookingResponse,
    pub payment: PaymentResponse,
}

#[derive(Serialize)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingResponse>,
    pub pagination: PaginationResponse,
}

#[derive(Serialize)]
pub struct PaginationResponse {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

// -- Handlers --

/// POST /bookings — book seats and pay for them in one step.
#[tracing::instrument(skip(state, user, payload), fields(user_id = %user.0))]
pub async fn create<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthenticatedUser,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingCreatedResponse>), ApiError> {
    let Json(req) = payload?;
    let req = req.validate()?;

    let (booking, payment) = state
        .coordinator
        .create_booking(
            user.0,
            req.schedule_id,
            req.seat_ids,
            req.passengers,
            req.payment_method,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingCreatedResponse {
            booking: BookingResponse::from(&booking),
            payment: PaymentResponse::from(&payment),
        }),
    ))
}

/// GET /bookings — the caller's bookings, newest first.
#[tracing::instrument(skip(state, user, query), fields(user_id = %user.0))]
pub async fn list<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthenticatedUser,
    query: Result<Query<ListBookingsQuery>, QueryRejection>,
) -> Result<Json<BookingListResponse>, ApiError> {
    let Query(query) = query?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<BookingStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let result = state
        .coordinator
        .list_bookings_for_user(user.0, status, page, limit)
        .await?;

    Ok(Json(BookingListResponse {
        bookings: result.bookings.iter().map(BookingResponse::from).collect(),
        pagination: PaginationResponse {
            page: result.page,
            limit: result.limit,
            total: result.total,
            total_pages: result.total_pages(),
        },
    }))
}

/// GET /bookings/{id} — one of the caller's bookings.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0))]
pub async fn get<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let booking = state.coordinator.get_booking(user.0, booking_id).await?;
    Ok(Json(BookingResponse::from(&booking)))
}

/// GET /bookings/reference/{reference} — look a booking up by its reference.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0))]
pub async fn get_by_reference<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthenticatedUser,
    Path(reference): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = state
        .coordinator
        .get_booking_by_reference(user.0, &reference)
        .await?;
    Ok(Json(BookingResponse::from(&booking)))
}

/// GET /bookings/{id}/payment — the payment record of a booking.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0))]
pub async fn payment<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let payment = state.coordinator.get_payment(user.0, booking_id).await?;
    Ok(Json(PaymentResponse::from(&payment)))
}

/// PUT /bookings/{id}/cancel — cancel a booking; the body `{"reason": ...}` is optional.
#[tracing::instrument(skip(state, user, body), fields(user_id = %user.0))]
pub async fn cancel<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let req: CancelBookingRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CancelBookingRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?
    };
    let reason = req
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    let booking = state
        .coordinator
        .cancel_booking(user.0, booking_id, reason)
        .await?;
    Ok(Json(BookingResponse::from(&booking)))
}

fn parse_booking_id(id: &str) -> Result<BookingId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid booking id: {e}")))
}
