//! Schedule seeding and seat map endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::ScheduleId;
use domain::{Money, Schedule, Seat};
use serde::{Deserialize, Serialize};
use store::ReservationStore;

use crate::AppState;
use crate::error::ApiError;

const MAX_CAPACITY: u32 = 100;
const MAX_PRICE_MINOR: i64 = 10_000_000;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateScheduleRequest {
    pub capacity: u32,
    pub price_minor: i64,
    pub departure_at: DateTime<Utc>,
}

impl CreateScheduleRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if !(1..=MAX_CAPACITY).contains(&self.capacity) {
            return Err(ApiError::BadRequest(format!(
                "capacity must be between 1 and {MAX_CAPACITY}"
            )));
        }
        if !(0..=MAX_PRICE_MINOR).contains(&self.price_minor) {
            return Err(ApiError::BadRequest(format!(
                "price_minor must be between 0 and {MAX_PRICE_MINOR}"
            )));
        }
        Ok(())
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct ScheduleResponse {
    pub id: String,
    pub capacity: u32,
    pub available_seats: u32,
    pub price_minor: i64,
    pub departure_at: DateTime<Utc>,
    pub status: String,
}

impl From<&Schedule> for ScheduleResponse {
    fn from(schedule: &Schedule) -> Self {
        Self {
            id: schedule.id.to_string(),
            capacity: schedule.capacity,
            available_seats: schedule.available_seats,
            price_minor: schedule.price.minor_units(),
            departure_at: schedule.departure_at,
            status: schedule.status.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct SeatResponse {
    pub id: String,
    pub seat_number: String,
    pub seat_type: String,
    pub status: String,
}

impl From<&Seat> for SeatResponse {
    fn from(seat: &Seat) -> Self {
        Self {
            id: seat.id.to_string(),
            seat_number: seat.seat_number.clone(),
            seat_type: seat.seat_type.as_str().to_string(),
            status: seat.status.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct SeatMapResponse {
    pub schedule: ScheduleResponse,
    pub seats: Vec<SeatResponse>,
}

// -- Handlers --

/// POST /schedules — seed a bookable schedule.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CreateScheduleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ScheduleResponse>), ApiError> {
    let Json(req) = payload?;
    req.validate()?;

    let schedule = Schedule::new(req.capacity, Money::from_minor(req.price_minor), req.departure_at);
    state
        .coordinator
        .store()
        .insert_schedule(schedule.clone())
        .await?;
    tracing::info!(schedule_id = %schedule.id, capacity = schedule.capacity, "schedule created");

    Ok((StatusCode::CREATED, Json(ScheduleResponse::from(&schedule))))
}

/// GET /schedules/{id}/seats — the schedule and its seat map.
#[tracing::instrument(skip(state))]
pub async fn seats<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<SeatMapResponse>, ApiError> {
    let schedule_id = parse_schedule_id(&id)?;
    let (schedule, seats) = state.coordinator.seat_map(schedule_id).await?;

    Ok(Json(SeatMapResponse {
        schedule: ScheduleResponse::from(&schedule),
        seats: seats.iter().map(SeatResponse::from).collect(),
    }))
}

fn parse_schedule_id(id: &str) -> Result<ScheduleId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid schedule id: {e}")))
}
