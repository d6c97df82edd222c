//! Period aggregates and the flat metric view reported to callers.

use std::collections::BTreeSet;
use std::ops::AddAssign;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TimeWindow;

/// Optional restriction of a report to a set of entity ids.
pub type EntityAllowlist = BTreeSet<String>;

/// Sum and count of the records of one class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTotals {
    pub amount: Decimal,
    pub count: u64,
}

impl ClassTotals {
    pub fn new(amount: Decimal, count: u64) -> Self {
        Self { amount, count }
    }
}

impl AddAssign for ClassTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.amount += rhs.amount;
        self.count += rhs.count;
    }
}

/// Additive gaming and cashback totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamingTotals {
    pub total_transactions: u64,
    pub total_bets: Decimal,
    pub total_wins: Decimal,
    pub bet_count: u64,
    pub win_count: u64,
    pub cashback_earned: Decimal,
    pub cashback_claimed: Decimal,
    /// Sum of per-record net results after the clamping policy
    pub net_result: Decimal,
}

impl AddAssign for GamingTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.total_transactions += rhs.total_transactions;
        self.total_bets += rhs.total_bets;
        self.total_wins += rhs.total_wins;
        self.bet_count += rhs.bet_count;
        self.win_count += rhs.win_count;
        self.cashback_earned += rhs.cashback_earned;
        self.cashback_claimed += rhs.cashback_claimed;
        self.net_result += rhs.net_result;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamingAggregate {
    pub totals: GamingTotals,
    pub active_users: BTreeSet<String>,
    pub active_games: BTreeSet<String>,
}

/// Reconciled totals of one flow class plus the entities behind them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowAggregate {
    pub totals: ClassTotals,
    pub entities: BTreeSet<String>,
}

/// Everything computed for one window. Unique-entity fields are sets so
/// that multi-day rollups union them instead of summing counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodAggregate {
    pub window: TimeWindow,
    pub gaming: GamingAggregate,
    pub deposits: FlowAggregate,
    pub withdrawals: FlowAggregate,
    pub registrations: FlowAggregate,
}

impl PeriodAggregate {
    pub fn new(
        window: TimeWindow,
        gaming: GamingAggregate,
        deposits: FlowAggregate,
        withdrawals: FlowAggregate,
        registrations: FlowAggregate,
    ) -> Self {
        Self {
            window,
            gaming,
            deposits,
            withdrawals,
            registrations,
        }
    }

    pub fn empty(window: TimeWindow) -> Self {
        Self::new(
            window,
            GamingAggregate::default(),
            FlowAggregate::default(),
            FlowAggregate::default(),
            FlowAggregate::default(),
        )
    }

    /// Combine per-day aggregates into one aggregate over `window`.
    pub fn rollup<'a>(window: TimeWindow, parts: impl IntoIterator<Item = &'a PeriodAggregate>) -> Self {
        let mut out = Self::empty(window);
        for part in parts {
            out.gaming.totals += part.gaming.totals;
            out.gaming
                .active_users
                .extend(part.gaming.active_users.iter().cloned());
            out.gaming
                .active_games
                .extend(part.gaming.active_games.iter().cloned());
            merge_flow(&mut out.deposits, &part.deposits);
            merge_flow(&mut out.withdrawals, &part.withdrawals);
            merge_flow(&mut out.registrations, &part.registrations);
        }
        out
    }

    /// Gross gaming revenue: bets minus wins.
    pub fn ggr(&self) -> Decimal {
        self.gaming.totals.total_bets - self.gaming.totals.total_wins
    }

    /// Net gaming revenue: GGR minus claimed cashback.
    pub fn ngr(&self) -> Decimal {
        self.ggr() - self.gaming.totals.cashback_claimed
    }

    pub fn active_users(&self) -> u64 {
        self.gaming.active_users.len() as u64
    }

    pub fn active_games(&self) -> u64 {
        self.gaming.active_games.len() as u64
    }

    pub fn unique_depositors(&self) -> u64 {
        self.deposits.entities.len() as u64
    }

    pub fn unique_withdrawers(&self) -> u64 {
        self.withdrawals.entities.len() as u64
    }

    pub fn new_users(&self) -> u64 {
        self.registrations.totals.count
    }

    pub fn metrics(&self) -> ReportMetrics {
        ReportMetrics::from(self)
    }
}

fn merge_flow(into: &mut FlowAggregate, from: &FlowAggregate) {
    into.totals += from.totals;
    into.entities.extend(from.entities.iter().cloned());
}

/// Flat metric view of a [`PeriodAggregate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetrics {
    pub total_transactions: u64,
    pub total_deposits: Decimal,
    pub total_withdrawals: Decimal,
    pub total_bets: Decimal,
    pub total_wins: Decimal,
    pub ggr: Decimal,
    pub ngr: Decimal,
    pub net_result: Decimal,
    pub active_users: u64,
    pub active_games: u64,
    pub new_users: u64,
    pub unique_depositors: u64,
    pub unique_withdrawers: u64,
    pub deposit_count: u64,
    pub withdrawal_count: u64,
    pub bet_count: u64,
    pub win_count: u64,
    pub cashback_earned: Decimal,
    pub cashback_claimed: Decimal,
}

impl From<&PeriodAggregate> for ReportMetrics {
    fn from(agg: &PeriodAggregate) -> Self {
        let g = &agg.gaming.totals;
        Self {
            total_transactions: g.total_transactions,
            total_deposits: agg.deposits.totals.amount,
            total_withdrawals: agg.withdrawals.totals.amount,
            total_bets: g.total_bets,
            total_wins: g.total_wins,
            ggr: agg.ggr(),
            ngr: agg.ngr(),
            net_result: g.net_result,
            active_users: agg.active_users(),
            active_games: agg.active_games(),
            new_users: agg.new_users(),
            unique_depositors: agg.unique_depositors(),
            unique_withdrawers: agg.unique_withdrawers(),
            deposit_count: agg.deposits.totals.count,
            withdrawal_count: agg.withdrawals.totals.count,
            bet_count: g.bet_count,
            win_count: g.win_count,
            cashback_earned: g.cashback_earned,
            cashback_claimed: g.cashback_claimed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> TimeWindow {
        TimeWindow::day(NaiveDate::from_ymd_opt(2025, 3, d).unwrap())
    }

    fn with_depositor(d: u32, user: &str, amount: Decimal) -> PeriodAggregate {
        let mut agg = PeriodAggregate::empty(day(d));
        agg.deposits.totals = ClassTotals::new(amount, 1);
        agg.deposits.entities.insert(user.to_string());
        agg.gaming.active_users.insert(user.to_string());
        agg
    }

    #[test]
    fn test_ggr_ngr_identities() {
        let mut agg = PeriodAggregate::empty(day(1));
        agg.gaming.totals.total_bets = dec!(100);
        agg.gaming.totals.total_wins = dec!(60);
        agg.gaming.totals.cashback_claimed = dec!(5);

        assert_eq!(agg.ggr(), dec!(40));
        assert_eq!(agg.ngr(), dec!(35));

        let m = agg.metrics();
        assert_eq!(m.ggr, m.total_bets - m.total_wins);
        assert_eq!(m.ngr, m.ggr - m.cashback_claimed);
    }

    #[test]
    fn test_rollup_unions_unique_entities() {
        let parts = vec![
            with_depositor(3, "u1", dec!(10)),
            with_depositor(4, "u1", dec!(15)),
            with_depositor(5, "u1", dec!(20)),
        ];
        let week = TimeWindow::week(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        let total = PeriodAggregate::rollup(week, &parts);

        assert_eq!(total.unique_depositors(), 1);
        assert_eq!(total.active_users(), 1);
        assert_eq!(total.deposits.totals, ClassTotals::new(dec!(45), 3));
        let naive: u64 = parts.iter().map(|p| p.unique_depositors()).sum();
        assert_eq!(naive, 3);
    }
}
