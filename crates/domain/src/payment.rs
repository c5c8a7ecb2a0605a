//! Payment records.

use chrono::{DateTime, Utc};
use common::{BookingId, PaymentId, UserId};
use serde::{Deserialize, Serialize};

use crate::booking::Booking;
use crate::error::DomainError;
use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Upi,
    NetBanking,
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::NetBanking => "net_banking",
            PaymentMethod::Wallet => "wallet",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "debit_card" => Ok(PaymentMethod::DebitCard),
            "upi" => Ok(PaymentMethod::Upi),
            "net_banking" => Ok(PaymentMethod::NetBanking),
            "wallet" => Ok(PaymentMethod::Wallet),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// Status of the charge itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl ChargeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Pending => "pending",
            ChargeStatus::Completed => "completed",
            ChargeStatus::Failed => "failed",
            ChargeStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChargeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ChargeStatus::Pending),
            "completed" => Ok(ChargeStatus::Completed),
            "failed" => Ok(ChargeStatus::Failed),
            "refunded" => Ok(ChargeStatus::Refunded),
            other => Err(format!("unknown charge status: {other}")),
        }
    }
}

/// The monetary record attached 1:1 to a booking.
///
/// `refund_amount` never exceeds `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub transaction_id: String,
    pub status: ChargeStatus,
    pub paid_at: DateTime<Utc>,
    pub refund_amount: Money,
    pub refund_date: Option<DateTime<Utc>>,
}

impl Payment {
    /// Records a completed charge for the booking's full amount.
    pub fn completed(
        booking: &Booking,
        method: PaymentMethod,
        transaction_id: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            booking_id: booking.id,
            user_id: booking.user_id,
            amount: booking.total_amount,
            method,
            transaction_id,
            status: ChargeStatus::Completed,
            paid_at: now,
            refund_amount: Money::zero(),
            refund_date: None,
        }
    }

    /// Refunds part or all of a completed charge.
    pub fn refund(&mut self, refund_amount: Money, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != ChargeStatus::Completed {
            return Err(DomainError::InvalidStateTransition {
                entity: "payment",
                current: self.status.to_string(),
                action: "refund",
            });
        }
        if refund_amount > self.amount {
            return Err(DomainError::RefundExceedsAmount {
                refund: refund_amount,
                amount: self.amount,
            });
        }
        self.status = ChargeStatus::Refunded;
        self.refund_amount = refund_amount;
        self.refund_date = Some(now);
        Ok(())
    }
}
