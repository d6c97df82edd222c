//! Report shapes returned by the engine.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{GameMetrics, LeaderboardEntry, PeriodAggregate, PlayerMetrics, ReportMetrics};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub metrics: ReportMetrics,
    pub top_games: Vec<LeaderboardEntry<GameMetrics>>,
    pub top_players: Vec<LeaderboardEntry<PlayerMetrics>>,
}

/// Percentage change per metric, formatted as e.g. `"12.50%"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportComparison {
    pub total_transactions: String,
    pub total_deposits: String,
    pub total_withdrawals: String,
    pub total_bets: String,
    pub total_wins: String,
    pub ggr: String,
    pub ngr: String,
    pub active_users: String,
    pub active_games: String,
    pub new_users: String,
    pub unique_depositors: String,
    pub unique_withdrawers: String,
    pub deposit_count: String,
    pub withdrawal_count: String,
    pub bet_count: String,
    pub win_count: String,
    pub cashback_earned: String,
    pub cashback_claimed: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedDailyReport {
    #[serde(flatten)]
    pub daily: DailyReport,
    pub previous_day: ReportMetrics,
    pub previous_day_change: ReportComparison,
    pub mtd: ReportMetrics,
    pub splm: ReportMetrics,
    pub mtd_vs_splm_change: ReportComparison,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    #[serde(flatten)]
    pub metrics: ReportMetrics,
    pub daily_breakdown: Vec<DataTableRow>,
    pub mtd: ReportMetrics,
    pub splm: ReportMetrics,
    pub mtd_vs_splm_change: ReportComparison,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    #[serde(flatten)]
    pub metrics: ReportMetrics,
    /// Net revenue divided by the days in the month
    pub avg_daily_revenue: Decimal,
    pub top_games: Vec<LeaderboardEntry<GameMetrics>>,
    pub top_players: Vec<LeaderboardEntry<PlayerMetrics>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTableRow {
    pub date: Option<NaiveDate>,
    pub new_users: u64,
    pub unique_depositors: u64,
    pub unique_withdrawers: u64,
    pub active_users: u64,
    pub deposit_count: u64,
    pub deposit_amount: Decimal,
    pub withdrawal_count: u64,
    pub withdrawal_amount: Decimal,
    pub bet_count: u64,
    pub bet_amount: Decimal,
    pub win_amount: Decimal,
    pub ggr: Decimal,
    pub cashback_earned: Decimal,
    pub cashback_claimed: Decimal,
}

impl DataTableRow {
    pub fn for_day(date: NaiveDate, agg: &PeriodAggregate) -> Self {
        let mut row = Self::from(agg);
        row.date = Some(date);
        row
    }
}

impl From<&PeriodAggregate> for DataTableRow {
    fn from(agg: &PeriodAggregate) -> Self {
        let g = &agg.gaming.totals;
        Self {
            date: None,
            new_users: agg.new_users(),
            unique_depositors: agg.unique_depositors(),
            unique_withdrawers: agg.unique_withdrawers(),
            active_users: agg.active_users(),
            deposit_count: agg.deposits.totals.count,
            deposit_amount: agg.deposits.totals.amount,
            withdrawal_count: agg.withdrawals.totals.count,
            withdrawal_amount: agg.withdrawals.totals.amount,
            bet_count: g.bet_count,
            bet_amount: g.total_bets,
            win_amount: g.total_wins,
            ggr: agg.ggr(),
            cashback_earned: g.cashback_earned,
            cashback_claimed: g.cashback_claimed,
        }
    }
}

/// Column sums of a data table. Unique-entity counts cannot be summed
/// across days, so they are absent here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTableTotals {
    pub new_users: u64,
    pub deposit_count: u64,
    pub deposit_amount: Decimal,
    pub withdrawal_count: u64,
    pub withdrawal_amount: Decimal,
    pub bet_count: u64,
    pub bet_amount: Decimal,
    pub win_amount: Decimal,
    pub ggr: Decimal,
    pub cashback_earned: Decimal,
    pub cashback_claimed: Decimal,
}

impl DataTableTotals {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a DataTableRow>) -> Self {
        rows.into_iter().fold(Self::default(), |mut acc, row| {
            acc.new_users += row.new_users;
            acc.deposit_count += row.deposit_count;
            acc.deposit_amount += row.deposit_amount;
            acc.withdrawal_count += row.withdrawal_count;
            acc.withdrawal_amount += row.withdrawal_amount;
            acc.bet_count += row.bet_count;
            acc.bet_amount += row.bet_amount;
            acc.win_amount += row.win_amount;
            acc.ggr += row.ggr;
            acc.cashback_earned += row.cashback_earned;
            acc.cashback_claimed += row.cashback_claimed;
            acc
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub rows: Vec<DataTableRow>,
    pub totals: DataTableTotals,
}
