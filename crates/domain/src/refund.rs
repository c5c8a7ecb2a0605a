//! Cancellation refund schedule.

use chrono::Duration;

use crate::money::Money;

/// One bracket of the refund schedule: cancelling at least
/// `min_time_to_departure` ahead returns `percent` of the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundTier {
    pub min_time_to_departure: Duration,
    pub percent: u8,
}

impl RefundTier {
    pub const fn new(min_time_to_departure: Duration, percent: u8) -> Self {
        Self {
            min_time_to_departure,
            percent,
        }
    }
}

/// Maps time remaining before departure to the refunded share of the total.
///
/// The standard schedule is:
///
/// | time to departure | refund |
/// |---|---|
/// | ≥ 24h | 100% |
/// | ≥ 12h | 75% |
/// | ≥ 6h | 50% |
/// | ≥ 2h | 25% |
/// | < 2h | 0% |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundPolicy {
    // Sorted by `min_time_to_departure`, longest first.
    tiers: Vec<RefundTier>,
}

impl RefundPolicy {
    /// The standard four-tier schedule.
    pub fn tiered() -> Self {
        Self::with_tiers(vec![
            RefundTier::new(Duration::hours(24), 100),
            RefundTier::new(Duration::hours(12), 75),
            RefundTier::new(Duration::hours(6), 50),
            RefundTier::new(Duration::hours(2), 25),
        ])
    }

    /// Builds a policy from arbitrary tiers. Percentages above 100 are capped.
    pub fn with_tiers(mut tiers: Vec<RefundTier>) -> Self {
        for tier in &mut tiers {
            tier.percent = tier.percent.min(100);
        }
        tiers.sort_by(|a, b| b.min_time_to_departure.cmp(&a.min_time_to_departure));
        Self { tiers }
    }

    /// Refund percentage for a cancellation `time_to_departure` ahead.
    pub fn percent_for(&self, time_to_departure: Duration) -> u8 {
        self.tiers
            .iter()
            .find(|tier| time_to_departure >= tier.min_time_to_departure)
            .map(|tier| tier.percent)
            .unwrap_or(0)
    }

    /// Amount returned on `total_amount` when cancelling `time_to_departure` ahead.
    pub fn refund(&self, total_amount: Money, time_to_departure: Duration) -> Money {
        total_amount.percent(self.percent_for(time_to_departure))
    }
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self::tiered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refund(total: i64, minutes: i64) -> Money {
        RefundPolicy::tiered().refund(Money::from_major(total), Duration::minutes(minutes))
    }

    #[test]
    fn full_refund_a_day_or_more_ahead() {
        assert_eq!(refund(1000, 30 * 60), Money::from_major(1000));
        assert_eq!(refund(1000, 24 * 60), Money::from_major(1000));
    }

    #[test]
    fn three_quarters_from_twelve_hours() {
        assert_eq!(refund(1000, 13 * 60), Money::from_major(750));
        assert_eq!(refund(1000, 12 * 60), Money::from_major(750));
    }

    #[test]
    fn half_from_six_hours() {
        assert_eq!(refund(1000, 7 * 60), Money::from_major(500));
        assert_eq!(refund(1000, 10 * 60), Money::from_major(500));
    }

    #[test]
    fn quarter_from_two_hours() {
        assert_eq!(refund(1000, 150), Money::from_major(250));
        assert_eq!(refund(1000, 120), Money::from_major(250));
    }

    #[test]
    fn nothing_inside_two_hours() {
        assert_eq!(refund(1000, 119), Money::zero());
        assert_eq!(refund(1000, -60), Money::zero());
    }

    #[test]
    fn refund_never_exceeds_total() {
        let policy = RefundPolicy::tiered();
        let total = Money::from_minor(999);
        for hours in 0..48 {
            assert!(policy.refund(total, Duration::hours(hours)) <= total);
        }
    }

    // A flat rule (>= 24h: 100%, otherwise 50%) also exists in the wild for
    // this product. Only the tiered schedule is applied; the two agree at 24h
    // and beyond and in the 6h..12h band.
    #[test]
    fn flat_half_rule_is_not_applied() {
        assert_eq!(refund(1000, 13 * 60), Money::from_major(750));
        assert_ne!(refund(1000, 13 * 60), Money::from_major(500));
        assert_eq!(refund(1000, 3 * 60), Money::from_major(250));
        assert_ne!(refund(1000, 3 * 60), Money::from_major(500));
    }

    #[test]
    fn custom_tiers_are_sorted() {
        let policy = RefundPolicy::with_tiers(vec![
            RefundTier::new(Duration::hours(1), 10),
            RefundTier::new(Duration::hours(48), 150),
        ]);
        assert_eq!(policy.percent_for(Duration::hours(72)), 100);
        assert_eq!(policy.percent_for(Duration::hours(5)), 10);
        assert_eq!(policy.percent_for(Duration::minutes(30)), 0);
    }
}
