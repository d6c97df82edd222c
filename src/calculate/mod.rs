//! Metric calculation engine.
//!
//! Turns raw records from both stores into report figures:
//! - Revision resolution (one canonical record per id)
//! - Cross-store reconciliation of deposits, withdrawals and registrations
//! - Period aggregation and leaderboards
//! - Period-over-period deltas

pub mod aggregate;
pub mod dedup;
pub mod delta;
pub mod leaderboard;
pub mod reconcile;

pub use aggregate::Aggregator;
pub use leaderboard::LeaderboardBuilder;
pub use reconcile::ReconciliationSetBuilder;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How per-record net results are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetResultPolicy {
    /// Values at or below zero are reported as zero.
    #[default]
    ClampNonPositive,
    Signed,
}

impl NetResultPolicy {
    pub fn apply(&self, net_result: Decimal) -> Decimal {
        match self {
            NetResultPolicy::ClampNonPositive if net_result <= Decimal::ZERO => Decimal::ZERO,
            _ => net_result,
        }
    }
}

/// Return to player in percent, rounded to 2 places.
pub fn calculate_rtp(total_wins: Decimal, total_bets: Decimal) -> Decimal {
    if total_bets.is_zero() {
        Decimal::ZERO
    } else {
        (total_wins / total_bets * Decimal::ONE_HUNDRED).round_dp(2)
    }
}

/// Mean of `count` values summing to `total`, rounded to 8 places.
pub fn calculate_average(total: Decimal, count: u64) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        (total / Decimal::from(count)).round_dp(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_clamp_policy() {
        let policy = NetResultPolicy::default();
        assert_eq!(policy.apply(dec!(-3.50)), Decimal::ZERO);
        assert_eq!(policy.apply(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(policy.apply(dec!(2.25)), dec!(2.25));
    }

    #[test]
    fn test_signed_policy() {
        assert_eq!(NetResultPolicy::Signed.apply(dec!(-3.50)), dec!(-3.50));
    }

    #[test]
    fn test_calculate_rtp() {
        assert_eq!(calculate_rtp(dec!(96), dec!(100)), dec!(96));
        assert_eq!(calculate_rtp(dec!(1), dec!(3)), dec!(33.33));
        assert_eq!(calculate_rtp(dec!(5), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_calculate_average() {
        assert_eq!(calculate_average(dec!(10), 4), dec!(2.5));
        assert_eq!(calculate_average(dec!(10), 0), Decimal::ZERO);
    }
}
