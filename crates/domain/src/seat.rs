//! Seats and seat layouts.

use common::{BookingId, ScheduleId, SeatId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Whether a seat is held by a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    #[default]
    Free,
    Booked,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Free => "free",
            SeatStatus::Booked => "booked",
        }
    }
}

impl std::fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SeatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SeatStatus::Free),
            "booked" => Ok(SeatStatus::Booked),
            other => Err(format!("unknown seat status: {other}")),
        }
    }
}

/// Position of the seat in the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeatType {
    Window,
    Aisle,
    #[default]
    Middle,
}

impl SeatType {
    /// Seat type for the 1-based seat position in the layout.
    pub fn for_position(position: u32) -> Self {
        match position % 3 {
            1 => SeatType::Window,
            0 => SeatType::Aisle,
            _ => SeatType::Middle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeatType::Window => "window",
            SeatType::Aisle => "aisle",
            SeatType::Middle => "middle",
        }
    }
}

impl std::str::FromStr for SeatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "window" => Ok(SeatType::Window),
            "aisle" => Ok(SeatType::Aisle),
            "middle" => Ok(SeatType::Middle),
            other => Err(format!("unknown seat type: {other}")),
        }
    }
}

/// One bookable position on a schedule.
///
/// A seat is `Booked` exactly when `holder_booking_id` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: SeatId,
    pub schedule_id: ScheduleId,
    pub seat_number: String,
    pub seat_type: SeatType,
    pub status: SeatStatus,
    pub holder_booking_id: Option<BookingId>,
}

impl Seat {
    /// Creates a free seat.
    pub fn new(schedule_id: ScheduleId, seat_number: impl Into<String>, seat_type: SeatType) -> Self {
        Self {
            id: SeatId::new(),
            schedule_id,
            seat_number: seat_number.into(),
            seat_type,
            status: SeatStatus::Free,
            holder_booking_id: None,
        }
    }

    /// Builds the seat map for a schedule: `S1..S{capacity}`, all free.
    pub fn layout(schedule_id: ScheduleId, capacity: u32) -> Vec<Seat> {
        (1..=capacity)
            .map(|n| Seat::new(schedule_id, format!("S{n}"), SeatType::for_position(n)))
            .collect()
    }

    pub fn is_free(&self) -> bool {
        self.status == SeatStatus::Free
    }

    /// Returns true if the seat is held by the given booking.
    pub fn is_held_by(&self, booking_id: BookingId) -> bool {
        self.status == SeatStatus::Booked && self.holder_booking_id == Some(booking_id)
    }

    fn claim(&mut self, booking_id: BookingId) {
        self.status = SeatStatus::Booked;
        self.holder_booking_id = Some(booking_id);
    }

    fn release(&mut self) {
        self.status = SeatStatus::Free;
        self.holder_booking_id = None;
    }
}

/// Marks every seat as booked by `booking_id`.
///
/// All seats are checked before any is touched, so on error the slice is
/// left exactly as it was.
pub fn claim_all(seats: &mut [Seat], booking_id: BookingId) -> Result<(), DomainError> {
    if let Some(taken) = seats.iter().find(|s| !s.is_free()) {
        return Err(DomainError::SeatNotFree {
            seat_number: taken.seat_number.clone(),
        });
    }
    seats.iter_mut().for_each(|s| s.claim(booking_id));
    Ok(())
}

/// Frees every seat held by `booking_id`.
///
/// Fails without mutation if any seat is held by someone else or is free.
pub fn release_all(seats: &mut [Seat], booking_id: BookingId) -> Result<(), DomainError> {
    if let Some(foreign) = seats.iter().find(|s| !s.is_held_by(booking_id)) {
        return Err(DomainError::SeatNotHeld {
            seat_number: foreign.seat_number.clone(),
            booking_id,
        });
    }
    seats.iter_mut().for_each(Seat::release);
    Ok(())
}
