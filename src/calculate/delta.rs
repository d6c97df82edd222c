//! Period-over-period percentage changes.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{ReportComparison, ReportMetrics};

/// Format the change from `baseline` to `current` as a percentage string.
///
/// A zero baseline yields `"0%"` when `current` is also zero and `"100%"`
/// otherwise. Everything else is rounded half away from zero to two places.
pub fn percentage_change(current: Decimal, baseline: Decimal) -> String {
    if baseline.is_zero() {
        return if current.is_zero() {
            "0%".to_string()
        } else {
            "100%".to_string()
        };
    }

    let mut change = ((current - baseline) / baseline * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if change.is_zero() {
        change = Decimal::ZERO;
    }
    change.rescale(2);
    format!("{}%", change)
}

fn count_change(current: u64, baseline: u64) -> String {
    percentage_change(Decimal::from(current), Decimal::from(baseline))
}

/// Per-metric changes from `baseline` to `current`.
pub fn compare(current: &ReportMetrics, baseline: &ReportMetrics) -> ReportComparison {
    ReportComparison {
        total_transactions: count_change(current.total_transactions, baseline.total_transactions),
        total_deposits: percentage_change(current.total_deposits, baseline.total_deposits),
        total_withdrawals: percentage_change(current.total_withdrawals, baseline.total_withdrawals),
        total_bets: percentage_change(current.total_bets, baseline.total_bets),
        total_wins: percentage_change(current.total_wins, baseline.total_wins),
        ggr: percentage_change(current.ggr, baseline.ggr),
        ngr: percentage_change(current.ngr, baseline.ngr),
        active_users: count_change(current.active_users, baseline.active_users),
        active_games: count_change(current.active_games, baseline.active_games),
        new_users: count_change(current.new_users, baseline.new_users),
        unique_depositors: count_change(current.unique_depositors, baseline.unique_depositors),
        unique_withdrawers: count_change(current.unique_withdrawers, baseline.unique_withdrawers),
        deposit_count: count_change(current.deposit_count, baseline.deposit_count),
        withdrawal_count: count_change(current.withdrawal_count, baseline.withdrawal_count),
        bet_count: count_change(current.bet_count, baseline.bet_count),
        win_count: count_change(current.win_count, baseline.win_count),
        cashback_earned: percentage_change(current.cashback_earned, baseline.cashback_earned),
        cashback_claimed: percentage_change(current.cashback_claimed, baseline.cashback_claimed),
    }
}
