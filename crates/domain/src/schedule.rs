//! Schedules and their aggregate seat counter.

use chrono::{DateTime, Duration, Utc};
use common::ScheduleId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// Lifecycle of a departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    /// Open for booking.
    #[default]
    Scheduled,
    /// The bus has left.
    Running,
    /// The trip is over.
    Completed,
    /// The departure was called off.
    Cancelled,
}

impl ScheduleStatus {
    /// Returns true if new bookings may be taken.
    pub fn accepts_bookings(&self) -> bool {
        matches!(self, ScheduleStatus::Scheduled)
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Scheduled => "scheduled",
            ScheduleStatus::Running => "running",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ScheduleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(ScheduleStatus::Scheduled),
            "running" => Ok(ScheduleStatus::Running),
            "completed" => Ok(ScheduleStatus::Completed),
            "cancelled" => Ok(ScheduleStatus::Cancelled),
            other => Err(format!("unknown schedule status: {other}")),
        }
    }
}

/// One bus departure.
///
/// `available_seats` is the aggregate counter kept in step with the seat
/// rows: `available_seats + booked seats == capacity` after every commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub capacity: u32,
    pub available_seats: u32,
    pub price: Money,
    pub departure_at: DateTime<Utc>,
    pub status: ScheduleStatus,
}

impl Schedule {
    /// Creates a schedule with every seat available.
    pub fn new(capacity: u32, price: Money, departure_at: DateTime<Utc>) -> Self {
        Self {
            id: ScheduleId::new(),
            capacity,
            available_seats: capacity,
            price,
            departure_at,
            status: ScheduleStatus::Scheduled,
        }
    }

    /// Time left until departure; negative once the bus has left.
    pub fn time_to_departure(&self, now: DateTime<Utc>) -> Duration {
        self.departure_at - now
    }

    /// Number of seats currently held by bookings according to the counter.
    pub fn booked_seats(&self) -> u32 {
        self.capacity - self.available_seats
    }

    /// Fails unless the schedule is open for booking.
    pub fn ensure_bookable(&self) -> Result<(), DomainError> {
        if self.status.accepts_bookings() {
            Ok(())
        } else {
            Err(DomainError::ScheduleNotBookable {
                status: self.status,
            })
        }
    }

    /// Takes `count` seats off the available counter.
    pub fn reserve_seats(&mut self, count: u32) -> Result<(), DomainError> {
        if self.available_seats < count {
            return Err(DomainError::InsufficientSeats {
                requested: count,
                available: self.available_seats,
            });
        }
        self.available_seats -= count;
        Ok(())
    }

    /// Returns `count` seats to the available counter.
    pub fn release_seats(&mut self, count: u32) -> Result<(), DomainError> {
        if self.available_seats + count > self.capacity {
            return Err(DomainError::CapacityExceeded {
                capacity: self.capacity,
                available: self.available_seats,
                released: count,
            });
        }
        self.available_seats += count;
        Ok(())
    }
}
