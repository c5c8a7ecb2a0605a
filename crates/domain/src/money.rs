//! Monetary amounts.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Money amount represented in minor units (paise) to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    minor: i64,
}

impl Money {
    /// Creates a new amount from minor units (e.g. 50_000 = 500.00).
    pub fn from_minor(minor: i64) -> Self {
        Self { minor }
    }

    /// Creates a new amount from a whole major-unit value.
    pub fn from_major(major: i64) -> Self {
        Self { minor: major * 100 }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { minor: 0 }
    }

    /// Returns the amount in minor units.
    pub fn minor_units(&self) -> i64 {
        self.minor
    }

    /// Returns the whole major-unit portion.
    pub fn major(&self) -> i64 {
        self.minor / 100
    }

    /// Returns the minor-unit remainder after `major()`.
    pub fn minor_part(&self) -> i64 {
        self.minor.abs() % 100
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.minor == 0
    }

    /// Multiplies by a quantity, failing if the result does not fit.
    pub fn multiply(&self, quantity: u32) -> Result<Money, DomainError> {
        self.minor
            .checked_mul(i64::from(quantity))
            .map(Money::from_minor)
            .ok_or(DomainError::AmountOverflow {
                amount: *self,
                quantity,
            })
    }

    /// Returns `percent`% of this amount, rounded toward zero to the minor
    /// unit. Percentages above 100 are capped.
    pub fn percent(&self, percent: u8) -> Money {
        let share = i128::from(self.minor) * i128::from(percent.min(100)) / 100;
        // |share| <= |self.minor|, so it always fits back into an i64.
        Money {
            minor: share as i64,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.minor < 0 {
            write!(f, "-{}.{:02}", self.major().abs(), self.minor_part())
        } else {
            write!(f, "{}.{:02}", self.major(), self.minor_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            minor: self.minor + rhs.minor,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            minor: self.minor - rhs.minor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_major_scales_to_minor_units() {
        assert_eq!(Money::from_major(500).minor_units(), 50_000);
    }

    #[test]
    fn multiply_by_seat_count() {
        assert_eq!(Money::from_major(500).multiply(2), Ok(Money::from_major(1000)));
    }

    #[test]
    fn multiply_overflow_is_an_error() {
        let price = Money::from_minor(i64::MAX / 2 + 1);
        assert!(matches!(
            price.multiply(2),
            Err(DomainError::AmountOverflow { quantity: 2, .. })
        ));
    }

    #[test]
    fn percent_of_large_amounts_does_not_overflow() {
        let total = Money::from_minor(i64::MAX / 50 * 2);
        assert_eq!(total.percent(100), total);
        assert_eq!(total.percent(50), Money::from_minor(i64::MAX / 50));
        assert_eq!(Money::from_minor(i64::MAX).percent(255), Money::from_minor(i64::MAX));
    }

    #[test]
    fn percent_rounds_down() {
        assert_eq!(Money::from_major(1000).percent(75), Money::from_major(750));
        assert_eq!(Money::from_minor(333).percent(50), Money::from_minor(166));
        assert_eq!(Money::from_minor(333).percent(0), Money::zero());
    }

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Money::from_minor(123_456).to_string(), "1234.56");
        assert_eq!(Money::from_minor(-5).to_string(), "-0.05");
    }

    #[test]
    fn serializes_as_minor_units() {
        let json = serde_json::to_string(&Money::from_major(5)).unwrap();
        assert_eq!(json, "500");
    }
}
