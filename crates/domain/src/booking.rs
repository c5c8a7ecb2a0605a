//! Bookings and their state machine.

use chrono::{DateTime, Utc};
use common::{BookingId, ScheduleId, SeatId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// Default reason recorded when the customer gives none.
pub const DEFAULT_CANCELLATION_REASON: &str = "User requested cancellation";

/// The state of a booking in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──► Confirmed ──► Completed
///    │            │
///    └────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Returns true while the booking holds its seats.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// Returns true if the booking can be cancelled in this state.
    pub fn can_cancel(&self) -> bool {
        self.is_active()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

/// Payment progress as seen from the booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(format!("unknown gender: {other}")),
        }
    }
}

/// A traveller occupying one of the booked seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passenger {
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    pub seat_number: String,
}

impl Passenger {
    pub fn new(name: impl Into<String>, age: u8, gender: Gender, seat_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age,
            gender,
            seat_number: seat_number.into(),
        }
    }
}

/// A customer's reservation of one or more seats on one schedule.
///
/// `seat_ids` and `passengers` always have the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub schedule_id: ScheduleId,
    pub seat_ids: Vec<SeatId>,
    pub passengers: Vec<Passenger>,
    pub total_amount: Money,
    pub booking_status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub booking_reference: String,
    pub cancellation_date: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a pending, unpaid booking priced at `unit_price` per seat.
    pub fn new_pending(
        user_id: UserId,
        schedule_id: ScheduleId,
        seat_ids: Vec<SeatId>,
        passengers: Vec<Passenger>,
        unit_price: Money,
        booking_reference: String,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if seat_ids.is_empty() {
            return Err(DomainError::EmptyBooking);
        }
        if seat_ids.len() != passengers.len() {
            return Err(DomainError::PassengerCountMismatch {
                seats: seat_ids.len(),
                passengers: passengers.len(),
            });
        }
        let seat_count = u32::try_from(seat_ids.len()).map_err(|_| DomainError::TooManySeats {
            requested: seat_ids.len(),
        })?;
        let total_amount = unit_price.multiply(seat_count)?;

        Ok(Self {
            id: BookingId::new(),
            user_id,
            schedule_id,
            seat_ids,
            passengers,
            total_amount,
            booking_status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            booking_reference,
            cancellation_date: None,
            cancellation_reason: None,
            created_at: now,
        })
    }

    /// Number of seats held by the booking.
    pub fn seat_count(&self) -> u32 {
        // Bounded by schedule capacity, which is a u32.
        u32::try_from(self.seat_ids.len()).unwrap_or(u32::MAX)
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Records a successful payment: `Pending/Pending` to `Confirmed/Paid`.
    pub fn confirm(&mut self) -> Result<(), DomainError> {
        if self.booking_status != BookingStatus::Pending
            || self.payment_status != PaymentStatus::Pending
        {
            return Err(self.invalid("confirm"));
        }
        self.booking_status = BookingStatus::Confirmed;
        self.payment_status = PaymentStatus::Paid;
        Ok(())
    }

    /// Cancels an active booking.
    pub fn cancel(&mut self, reason: Option<String>, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.booking_status.can_cancel() {
            return Err(self.invalid("cancel"));
        }
        self.booking_status = BookingStatus::Cancelled;
        self.cancellation_date = Some(now);
        self.cancellation_reason = Some(
            reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CANCELLATION_REASON.to_string()),
        );
        Ok(())
    }

    /// Moves a paid booking to `Refunded`.
    pub fn mark_refunded(&mut self) -> Result<(), DomainError> {
        if self.payment_status != PaymentStatus::Paid {
            return Err(DomainError::InvalidStateTransition {
                entity: "booking payment",
                current: self.payment_status.to_string(),
                action: "refund",
            });
        }
        self.payment_status = PaymentStatus::Refunded;
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> DomainError {
        DomainError::InvalidStateTransition {
            entity: "booking",
            current: self.booking_status.to_string(),
            action,
        }
    }
}
