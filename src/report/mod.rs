//! Report composition.
//!
//! The engine validates inputs, fans store queries out concurrently and
//! assembles the report shapes. Gaming figures for the requested period are
//! essential: if they cannot be loaded the report fails. Deposits,
//! withdrawals, registrations and leaderboards are supplementary, as are the
//! comparison periods (previous day, month-to-date, same period last month)
//! and individual days of a multi-day report: a failure is logged and the
//! figures are reported as zero or empty.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::calculate::{delta, Aggregator, LeaderboardBuilder, NetResultPolicy};
use crate::models::{
    ActivityRecord, DailyReport, DataTable, DataTableRow, DataTableTotals, EnhancedDailyReport,
    EntityAllowlist, Leaderboard, LeaderboardKind, MonthlyReport, PeriodAggregate, RecordClass,
    RecordStatus, RecordType, TimeWindow, WeeklyReport, WindowError,
};
use crate::storage::{AnalyticalStore, RecordFilter, StoreError, TransactionalStore};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid window: {0}")]
    InvalidWindow(#[from] WindowError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Tunables for report composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSettings {
    pub daily_leaderboard_size: usize,
    pub monthly_leaderboard_size: usize,
    /// Upper bound on days aggregated concurrently by weekly and table reports
    pub max_concurrent_days: usize,
    pub net_result_policy: NetResultPolicy,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            daily_leaderboard_size: 5,
            monthly_leaderboard_size: 10,
            max_concurrent_days: 8,
            net_result_policy: NetResultPolicy::default(),
        }
    }
}

/// Filters for an entity's transaction listing.
#[derive(Debug, Clone)]
pub struct TransactionQuery {
    pub window: TimeWindow,
    pub record_type: Option<RecordType>,
    pub status: Option<RecordStatus>,
    pub game_id: Option<String>,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPage {
    pub transactions: Vec<ActivityRecord>,
    pub total: usize,
}

fn or_degraded<T: Default>(
    result: Result<T, StoreError>,
    metric: &'static str,
    window: &TimeWindow,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(
                metric,
                from = %window.from(),
                to = %window.to(),
                error = %e,
                "Supplementary metric unavailable; reporting zero"
            );
            T::default()
        }
    }
}

fn or_empty_period(
    result: Result<PeriodAggregate, ReportError>,
    period: &'static str,
    window: &TimeWindow,
) -> PeriodAggregate {
    match result {
        Ok(agg) => agg,
        Err(e) => {
            warn!(
                period,
                from = %window.from(),
                to = %window.to(),
                error = %e,
                "Period unavailable; reporting zero"
            );
            PeriodAggregate::empty(*window)
        }
    }
}

#[derive(Clone)]
pub struct ReportEngine {
    analytical: Arc<dyn AnalyticalStore>,
    aggregator: Aggregator,
    leaderboards: LeaderboardBuilder,
    settings: ReportSettings,
}

impl ReportEngine {
    pub fn new(
        analytical: Arc<dyn AnalyticalStore>,
        transactional: Arc<dyn TransactionalStore>,
        settings: ReportSettings,
    ) -> Self {
        Self {
            aggregator: Aggregator::new(
                analytical.clone(),
                transactional,
                settings.net_result_policy,
            ),
            leaderboards: LeaderboardBuilder::new(analytical.clone()),
            analytical,
            settings,
        }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Aggregate one window.
    pub async fn period(
        &self,
        window: &TimeWindow,
        allowlist: Option<&EntityAllowlist>,
    ) -> Result<PeriodAggregate, ReportError> {
        let (gaming, deposits, withdrawals, registrations) = tokio::join!(
            self.aggregator.gaming(window, allowlist),
            self.aggregator.flow(window, RecordClass::Deposit, allowlist),
            self.aggregator.flow(window, RecordClass::Withdrawal, allowlist),
            self.aggregator.registrations(window, allowlist),
        );

        Ok(PeriodAggregate::new(
            *window,
            gaming?,
            or_degraded(deposits, "deposits", window),
            or_degraded(withdrawals, "withdrawals", window),
            or_degraded(registrations, "new_users", window),
        ))
    }

    /// Aggregate each day of `days` in order, a bounded number at a time.
    ///
    /// A day that fails is reported as zero. If every day fails the first
    /// error is returned.
    async fn per_day(
        &self,
        days: &[NaiveDate],
        allowlist: Option<&EntityAllowlist>,
    ) -> Result<Vec<PeriodAggregate>, ReportError> {
        let windows: Vec<TimeWindow> = days.iter().map(|d| TimeWindow::day(*d)).collect();
        let futures: Vec<_> = windows.iter().map(|w| self.period(w, allowlist)).collect();
        let results: Vec<Result<PeriodAggregate, ReportError>> =
            stream::iter(futures)
                .buffered(self.settings.max_concurrent_days.max(1))
                .collect()
                .await;

        if results.iter().all(Result::is_err) {
            if let Some(Err(e)) = results.into_iter().next() {
                return Err(e);
            }
            return Ok(Vec::new());
        }

        Ok(results
            .into_iter()
            .zip(windows.iter())
            .map(|(result, window)| or_empty_period(result, "day", window))
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn daily(&self, date: NaiveDate) -> Result<DailyReport, ReportError> {
        let window = TimeWindow::day(date);
        let limit = self.settings.daily_leaderboard_size;

        let (period, games, players) = tokio::join!(
            self.period(&window, None),
            self.leaderboards.top_games(&window, limit, None),
            self.leaderboards.top_players(&window, limit, None),
        );

        let report = DailyReport {
            date,
            metrics: period?.metrics(),
            top_games: or_degraded(games, "top_games", &window),
            top_players: or_degraded(players, "top_players", &window),
        };
        info!(%date, active_users = report.metrics.active_users, "Daily report ready");
        Ok(report)
    }

    /// Daily report plus previous-day, month-to-date and same-period-last-month
    /// comparisons. All four sub-queries run concurrently; only the report
    /// day itself is essential.
    #[instrument(skip(self))]
    pub async fn enhanced_daily(&self, date: NaiveDate) -> Result<EnhancedDailyReport, ReportError> {
        let previous_window = TimeWindow::day(date - Duration::days(1));
        let mtd_window = TimeWindow::month_to_date(date);
        let splm_window = TimeWindow::same_period_last_month(date);

        let (daily, previous, mtd, splm) = tokio::join!(
            self.daily(date),
            self.period(&previous_window, None),
            self.period(&mtd_window, None),
            self.period(&splm_window, None),
        );

        let daily = daily?;
        let previous = or_empty_period(previous, "previous_day", &previous_window).metrics();
        let mtd = or_empty_period(mtd, "mtd", &mtd_window).metrics();
        let splm = or_empty_period(splm, "splm", &splm_window).metrics();

        Ok(EnhancedDailyReport {
            previous_day_change: delta::compare(&daily.metrics, &previous),
            mtd_vs_splm_change: delta::compare(&mtd, &splm),
            daily,
            previous_day: previous,
            mtd,
            splm,
        })
    }

    /// Seven days from `week_start`. Unique counts are recomputed over the
    /// whole week rather than summed per day.
    #[instrument(skip(self, allowlist))]
    pub async fn weekly(
        &self,
        week_start: NaiveDate,
        allowlist: Option<&EntityAllowlist>,
    ) -> Result<WeeklyReport, ReportError> {
        let window = TimeWindow::week(week_start);
        let week_end = window.last_day();
        let days = window.days();
        let mtd_window = TimeWindow::month_to_date(week_end);
        let splm_window = TimeWindow::same_period_last_month(week_end);

        let (per_day, mtd, splm) = tokio::join!(
            self.per_day(&days, allowlist),
            self.period(&mtd_window, allowlist),
            self.period(&splm_window, allowlist),
        );

        let per_day = per_day?;
        let total = PeriodAggregate::rollup(window, &per_day);
        let daily_breakdown = days
            .iter()
            .zip(per_day.iter())
            .map(|(day, agg)| DataTableRow::for_day(*day, agg))
            .collect();
        let mtd = or_empty_period(mtd, "mtd", &mtd_window).metrics();
        let splm = or_empty_period(splm, "splm", &splm_window).metrics();

        Ok(WeeklyReport {
            week_start,
            week_end,
            metrics: total.metrics(),
            daily_breakdown,
            mtd_vs_splm_change: delta::compare(&mtd, &splm),
            mtd,
            splm,
        })
    }

    #[instrument(skip(self))]
    pub async fn monthly(&self, year: i32, month: u32) -> Result<MonthlyReport, ReportError> {
        let window = TimeWindow::month(year, month)?;
        let limit = self.settings.monthly_leaderboard_size;

        let (period, games, players) = tokio::join!(
            self.period(&window, None),
            self.leaderboards.top_games(&window, limit, None),
            self.leaderboards.top_players(&window, limit, None),
        );

        let metrics = period?.metrics();
        Ok(MonthlyReport {
            year,
            month,
            avg_daily_revenue: crate::calculate::calculate_average(
                metrics.ngr,
                u64::from(window.day_count()),
            ),
            metrics,
            top_games: or_degraded(games, "top_games", &window),
            top_players: or_degraded(players, "top_players", &window),
        })
    }

    /// One row per day from `from` through `to` inclusive, plus column sums.
    #[instrument(skip(self, allowlist))]
    pub async fn data_table(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        allowlist: Option<&EntityAllowlist>,
    ) -> Result<DataTable, ReportError> {
        let window = TimeWindow::days_between(from, to)?;
        let days = window.days();
        let per_day = self.per_day(&days, allowlist).await?;

        let rows: Vec<DataTableRow> = days
            .iter()
            .zip(per_day.iter())
            .map(|(day, agg)| DataTableRow::for_day(*day, agg))
            .collect();
        let totals = DataTableTotals::from_rows(&rows);

        Ok(DataTable { rows, totals })
    }

    pub async fn top_entities(
        &self,
        kind: LeaderboardKind,
        window: &TimeWindow,
        limit: usize,
    ) -> Result<Leaderboard, ReportError> {
        if limit == 0 {
            return Err(ReportError::InvalidRequest(
                "limit must be greater than 0".to_string(),
            ));
        }

        Ok(match kind {
            LeaderboardKind::Games => {
                Leaderboard::Games(self.leaderboards.top_games(window, limit, None).await?)
            }
            LeaderboardKind::Players => {
                Leaderboard::Players(self.leaderboards.top_players(window, limit, None).await?)
            }
        })
    }

    /// One entity's resolved records, newest first, with net results
    /// reported under the configured policy.
    pub async fn entity_transactions(
        &self,
        entity_id: &str,
        query: &TransactionQuery,
    ) -> Result<TransactionPage, ReportError> {
        if entity_id.trim().is_empty() {
            return Err(ReportError::InvalidRequest(
                "entity id must not be empty".to_string(),
            ));
        }

        let mut filter = RecordFilter::new().entity(entity_id);
        if let Some(record_type) = query.record_type {
            filter = filter.record_type(record_type);
        }
        if let Some(status) = query.status {
            filter = filter.status(status);
        }
        if let Some(game_id) = &query.game_id {
            filter = filter.game(game_id.clone());
        }

        let rows = self.analytical.query_records(&query.window, &filter).await?;
        let mut records = filter.select(&query.window, rows);
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let policy = self.settings.net_result_policy;
        let total = records.len();
        let transactions = records
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|mut r| {
                r.net_result = r.net_result.map(|n| policy.apply(n));
                r
            })
            .collect();

        Ok(TransactionPage {
            transactions,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportMetrics;
    use crate::storage::{MemoryAnalyticalStore, MemoryTransactionalStore, StoreCall};
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tokio_test::assert_ok;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn ts(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, m, d, h, 0, 0).unwrap()
    }

    fn bet(id: &str, entity: &str, amount: Decimal, at: DateTime<Utc>) -> ActivityRecord {
        ActivityRecord::new(id, entity, RecordType::Bet, amount, at).with_game("g1", "Dice")
    }

    fn deposit(id: &str, entity: &str, amount: Decimal, at: DateTime<Utc>) -> ActivityRecord {
        ActivityRecord::new(id, entity, RecordType::Deposit, amount, at)
            .with_correlation_key(format!("hash-{}", id))
    }

    fn engine(analytical: MemoryAnalyticalStore, transactional: MemoryTransactionalStore) -> ReportEngine {
        ReportEngine::new(
            Arc::new(analytical),
            Arc::new(transactional),
            ReportSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_daily_report_combines_stores() {
        let analytical = MemoryAnalyticalStore::new(vec![
            bet("b1", "u1", dec!(100), ts(3, 10, 1)),
            ActivityRecord::new("w1", "u1", RecordType::Win, dec!(30), ts(3, 10, 2)).with_game("g1", "Dice"),
            ActivityRecord::new("c1", "u1", RecordType::CashbackClaim, dec!(5), ts(3, 10, 3)),
            deposit("d1", "u1", dec!(200), ts(3, 10, 1)),
        ]);
        let transactional = MemoryTransactionalStore::new(vec![
            deposit("d1", "u1", dec!(200), ts(3, 10, 1)),
            deposit("d2", "u2", dec!(50), ts(3, 10, 4)),
        ]);

        let report = assert_ok!(engine(analytical, transactional).daily(date(3, 10)).await);
        let m = &report.metrics;
        assert_eq!(m.total_deposits, dec!(250));
        assert_eq!(m.deposit_count, 2);
        assert_eq!(m.unique_depositors, 2);
        assert_eq!(m.ggr, dec!(70));
        assert_eq!(m.ngr, dec!(65));
        assert_eq!(report.top_games.len(), 1);
        assert_eq!(report.top_players[0].entity_id, "u1");
    }

    #[tokio::test]
    async fn test_supplementary_failure_degrades_to_zero() {
        let analytical = MemoryAnalyticalStore::new(vec![bet("b1", "u1", dec!(10), ts(3, 10, 1))]);
        let transactional = MemoryTransactionalStore::default().failing(StoreCall::Aggregate, None);

        let report = engine(analytical, transactional).daily(date(3, 10)).await.unwrap();
        assert_eq!(report.metrics.total_bets, dec!(10));
        assert_eq!(report.metrics.total_deposits, Decimal::ZERO);
        assert_eq!(report.metrics.new_users, 0);
    }

    #[tokio::test]
    async fn test_gaming_failure_fails_report() {
        let analytical =
            MemoryAnalyticalStore::default().failing(StoreCall::Records, Some(RecordClass::Gaming));
        let result = engine(analytical, MemoryTransactionalStore::default())
            .daily(date(3, 10))
            .await;
        assert!(matches!(result, Err(ReportError::Store(_))));
    }

    #[tokio::test]
    async fn test_leaderboard_failure_degrades_to_empty() {
        let analytical = MemoryAnalyticalStore::new(vec![deposit("d1", "u1", dec!(5), ts(3, 10, 1))])
            .failing(StoreCall::Records, Some(RecordClass::Withdrawal));
        let report = engine(analytical, MemoryTransactionalStore::default())
            .daily(date(3, 10))
            .await
            .unwrap();
        assert!(report.top_players.is_empty());
        assert_eq!(report.metrics.total_withdrawals, Decimal::ZERO);
        assert_eq!(report.metrics.total_deposits, dec!(5));
    }

    #[tokio::test]
    async fn test_weekly_unique_counts_are_unioned() {
        let analytical = MemoryAnalyticalStore::new(vec![
            deposit("d1", "u1", dec!(10), ts(3, 3, 9)),
            deposit("d2", "u1", dec!(10), ts(3, 4, 9)),
            deposit("d3", "u1", dec!(10), ts(3, 5, 9)),
        ]);
        let report = engine(analytical, MemoryTransactionalStore::default())
            .weekly(date(3, 3), None)
            .await
            .unwrap();

        assert_eq!(report.week_end, date(3, 9));
        assert_eq!(report.metrics.unique_depositors, 1);
        assert_eq!(report.metrics.deposit_count, 3);
        let naive: u64 = report.daily_breakdown.iter().map(|r| r.unique_depositors).sum();
        assert_eq!(naive, 3);
        assert_eq!(report.daily_breakdown.len(), 7);
        assert_eq!(report.mtd.total_deposits, dec!(30));
        assert_eq!(report.mtd_vs_splm_change.total_deposits, "100%");
    }

    #[tokio::test]
    async fn test_weekly_allowlist_applies_to_every_sub_query() {
        let analytical = MemoryAnalyticalStore::new(vec![
            deposit("d1", "u1", dec!(10), ts(3, 3, 9)),
            deposit("d2", "u2", dec!(99), ts(3, 4, 9)),
            deposit("d3", "u2", dec!(99), ts(3, 1, 9)),
        ]);
        let allow: EntityAllowlist = ["u1".to_string()].into_iter().collect();
        let report = engine(analytical, MemoryTransactionalStore::default())
            .weekly(date(3, 3), Some(&allow))
            .await
            .unwrap();
        assert_eq!(report.metrics.total_deposits, dec!(10));
        assert_eq!(report.mtd.total_deposits, dec!(10));
    }

    #[tokio::test]
    async fn test_enhanced_daily_comparisons() {
        let analytical = MemoryAnalyticalStore::new(vec![
            deposit("d1", "u1", dec!(150), ts(3, 10, 9)),
            deposit("d0", "u1", dec!(100), ts(3, 9, 9)),
            deposit("d9", "u1", dec!(500), ts(2, 5, 9)),
        ]);
        let report = engine(analytical, MemoryTransactionalStore::default())
            .enhanced_daily(date(3, 10))
            .await
            .unwrap();

        assert_eq!(report.previous_day.total_deposits, dec!(100));
        assert_eq!(report.previous_day_change.total_deposits, "50.00%");
        assert_eq!(report.mtd.total_deposits, dec!(250));
        assert_eq!(report.splm.total_deposits, dec!(500));
        assert_eq!(report.mtd_vs_splm_change.total_deposits, "-50.00%");
        assert_eq!(report.previous_day_change.total_bets, "0%");
    }

    #[tokio::test]
    async fn test_enhanced_daily_comparison_failures_degrade() {
        let gaming = Some(RecordClass::Gaming);
        let analytical = MemoryAnalyticalStore::new(vec![
            deposit("d1", "u1", dec!(150), ts(3, 10, 9)),
            deposit("d0", "u1", dec!(100), ts(3, 9, 9)),
        ])
        .failing_within(StoreCall::Records, gaming, TimeWindow::day(date(3, 9)))
        .failing_within(StoreCall::Records, gaming, TimeWindow::month_to_date(date(3, 10)));

        let report = assert_ok!(
            engine(analytical, MemoryTransactionalStore::default())
                .enhanced_daily(date(3, 10))
                .await
        );

        assert_eq!(report.daily.metrics.total_deposits, dec!(150));
        assert_eq!(report.previous_day, ReportMetrics::default());
        assert_eq!(report.previous_day_change.total_deposits, "100%");
        assert_eq!(report.mtd, ReportMetrics::default());
        assert_eq!(report.mtd_vs_splm_change.total_deposits, "0%");
    }

    #[tokio::test]
    async fn test_enhanced_daily_fails_when_report_day_fails() {
        let analytical = MemoryAnalyticalStore::default().failing_within(
            StoreCall::Records,
            Some(RecordClass::Gaming),
            TimeWindow::day(date(3, 10)),
        );
        let result = engine(analytical, MemoryTransactionalStore::default())
            .enhanced_daily(date(3, 10))
            .await;
        assert!(matches!(result, Err(ReportError::Store(_))));
    }

    #[tokio::test]
    async fn test_weekly_failed_day_and_mtd_degrade() {
        let gaming = Some(RecordClass::Gaming);
        let analytical = MemoryAnalyticalStore::new(vec![
            deposit("d1", "u1", dec!(10), ts(3, 3, 9)),
            deposit("d2", "u2", dec!(20), ts(3, 5, 9)),
        ])
        .failing_within(StoreCall::Records, gaming, TimeWindow::day(date(3, 5)))
        .failing_within(StoreCall::Records, gaming, TimeWindow::month_to_date(date(3, 9)));

        let report = assert_ok!(
            engine(analytical, MemoryTransactionalStore::default())
                .weekly(date(3, 3), None)
                .await
        );

        assert_eq!(report.daily_breakdown.len(), 7);
        assert_eq!(report.daily_breakdown[2].deposit_count, 0);
        assert_eq!(report.metrics.total_deposits, dec!(10));
        assert_eq!(report.metrics.unique_depositors, 1);
        assert_eq!(report.mtd, ReportMetrics::default());
    }

    #[tokio::test]
    async fn test_weekly_fails_when_every_day_fails() {
        let analytical =
            MemoryAnalyticalStore::default().failing(StoreCall::Records, Some(RecordClass::Gaming));
        let result = engine(analytical, MemoryTransactionalStore::default())
            .weekly(date(3, 3), None)
            .await;
        assert!(matches!(result, Err(ReportError::Store(_))));
    }

    #[tokio::test]
    async fn test_monthly_average_daily_revenue() {
        let analytical = MemoryAnalyticalStore::new(vec![
            bet("b1", "u1", dec!(300), ts(4, 2, 1)),
            bet("b2", "u2", dec!(300), ts(4, 20, 1)),
        ]);
        let report = engine(analytical, MemoryTransactionalStore::default())
            .monthly(2025, 4)
            .await
            .unwrap();
        assert_eq!(report.metrics.ngr, dec!(600));
        assert_eq!(report.avg_daily_revenue, dec!(20));
        assert_eq!(report.top_players.len(), 2);
    }

    #[tokio::test]
    async fn test_validation_precedes_store_access() {
        let failing = || {
            engine(
                MemoryAnalyticalStore::default().failing(StoreCall::Records, None),
                MemoryTransactionalStore::default(),
            )
        };

        let table = failing().data_table(date(3, 10), date(3, 9), None).await;
        assert!(matches!(table, Err(ReportError::InvalidWindow(_))));

        let monthly = failing().monthly(2025, 0).await;
        assert!(matches!(monthly, Err(ReportError::InvalidWindow(_))));

        let top = failing()
            .top_entities(LeaderboardKind::Games, &TimeWindow::day(date(3, 10)), 0)
            .await;
        assert!(matches!(top, Err(ReportError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_data_table_totals_and_failure() {
        let analytical = MemoryAnalyticalStore::new(vec![
            deposit("d1", "u1", dec!(10), ts(3, 1, 9)),
            deposit("d2", "u1", dec!(15), ts(3, 2, 9)),
        ]);
        let table = engine(analytical, MemoryTransactionalStore::default())
            .data_table(date(3, 1), date(3, 3), None)
            .await
            .unwrap();

        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[2].deposit_count, 0);
        assert_eq!(table.totals.deposit_amount, dec!(25));
        assert_eq!(table.totals.deposit_count, 2);

        let broken = engine(
            MemoryAnalyticalStore::default().failing(StoreCall::Records, Some(RecordClass::Gaming)),
            MemoryTransactionalStore::default(),
        );
        assert!(broken.data_table(date(3, 1), date(3, 3), None).await.is_err());
    }

    #[tokio::test]
    async fn test_data_table_zeroes_a_failed_day() {
        let analytical = MemoryAnalyticalStore::new(vec![
            deposit("d1", "u1", dec!(10), ts(3, 1, 9)),
            deposit("d2", "u1", dec!(15), ts(3, 2, 9)),
        ])
        .failing_within(
            StoreCall::Records,
            Some(RecordClass::Gaming),
            TimeWindow::day(date(3, 2)),
        );
        let table = assert_ok!(
            engine(analytical, MemoryTransactionalStore::default())
                .data_table(date(3, 1), date(3, 3), None)
                .await
        );

        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1].date, Some(date(3, 2)));
        assert_eq!(table.rows[1].deposit_count, 0);
        assert_eq!(table.totals.deposit_amount, dec!(10));
    }

    #[tokio::test]
    async fn test_entity_transactions_paginates_and_clamps() {
        let records = vec![
            bet("b1", "u1", dec!(3.50), ts(3, 10, 1)).with_net_result(dec!(-3.50)),
            bet("b2", "u1", dec!(1), ts(3, 10, 2)).with_net_result(dec!(4)),
            bet("b3", "u1", dec!(1), ts(3, 10, 3)),
            bet("b4", "u2", dec!(1), ts(3, 10, 3)),
        ];
        let engine = engine(MemoryAnalyticalStore::new(records), MemoryTransactionalStore::default());
        let query = TransactionQuery {
            window: TimeWindow::day(date(3, 10)),
            record_type: None,
            status: None,
            game_id: None,
            offset: 1,
            limit: 5,
        };

        let page = engine.entity_transactions("u1", &query).await.unwrap();
        assert_eq!(page.total, 3);
        let ids: Vec<&str> = page.transactions.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b2", "b1"]);
        assert_eq!(page.transactions[1].net_result, Some(Decimal::ZERO));

        assert!(matches!(
            engine.entity_transactions(" ", &query).await,
            Err(ReportError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_top_entities_kinds() {
        let analytical = MemoryAnalyticalStore::new(vec![
            bet("b1", "u1", dec!(5), ts(3, 10, 1)),
            deposit("d1", "u2", dec!(50), ts(3, 10, 1)),
        ]);
        let engine = engine(analytical, MemoryTransactionalStore::default());
        let window = TimeWindow::day(date(3, 10));

        let games = engine.top_entities(LeaderboardKind::Games, &window, 3).await.unwrap();
        assert_eq!(games.kind(), LeaderboardKind::Games);
        assert_eq!(games.len(), 1);

        match engine.top_entities(LeaderboardKind::Players, &window, 3).await.unwrap() {
            Leaderboard::Players(entries) => {
                assert_eq!(entries[0].entity_id, "u1");
                assert_eq!(entries[1].entity_id, "u2");
                assert_eq!(entries[1].metrics.total_deposits, dec!(50));
            }
            other => panic!("unexpected leaderboard {:?}", other.kind()),
        }
    }
}
