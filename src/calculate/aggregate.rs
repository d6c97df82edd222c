//! Period aggregation across both stores.
//!
//! Gaming and cashback figures come from the analytical store alone. Flow
//! classes (deposits, withdrawals, registrations) are reconciled: the
//! analytical totals plus transactional records whose key the analytical
//! store has not seen yet.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use super::dedup;
use super::reconcile::ReconciliationSetBuilder;
use super::NetResultPolicy;
use crate::models::{
    ActivityRecord, EntityAllowlist, FlowAggregate, GamingAggregate, RecordClass, RecordType,
    TimeWindow,
};
use crate::storage::{totals_of, AnalyticalStore, RecordFilter, StoreError, TransactionalStore};

#[derive(Clone)]
pub struct Aggregator {
    analytical: Arc<dyn AnalyticalStore>,
    transactional: Arc<dyn TransactionalStore>,
    reconciler: ReconciliationSetBuilder,
    policy: NetResultPolicy,
}

impl Aggregator {
    pub fn new(
        analytical: Arc<dyn AnalyticalStore>,
        transactional: Arc<dyn TransactionalStore>,
        policy: NetResultPolicy,
    ) -> Self {
        Self {
            reconciler: ReconciliationSetBuilder::new(analytical.clone()),
            analytical,
            transactional,
            policy,
        }
    }

    pub fn policy(&self) -> NetResultPolicy {
        self.policy
    }

    /// Gaming and cashback totals plus active users and games.
    pub async fn gaming(
        &self,
        window: &TimeWindow,
        allowlist: Option<&EntityAllowlist>,
    ) -> Result<GamingAggregate, StoreError> {
        let filter = RecordFilter::new()
            .classes([RecordClass::Gaming, RecordClass::Cashback])
            .entities(allowlist);
        let rows = self.analytical.query_records(window, &filter).await?;
        let resolved = dedup::resolve_all(rows);
        debug!(records = resolved.len(), from = %window.from(), "Aggregating gaming activity");
        Ok(summarize_gaming(&resolved, self.policy))
    }

    /// Reconciled deposits or withdrawals with their unique entities.
    pub async fn flow(
        &self,
        window: &TimeWindow,
        class: RecordClass,
        allowlist: Option<&EntityAllowlist>,
    ) -> Result<FlowAggregate, StoreError> {
        let exclude = self.reconciler.build(window, class).await;
        let filter = RecordFilter::new()
            .class(class)
            .completed()
            .entities(allowlist);
        let unreconciled = filter.clone().excluding(&exclude);

        let (analytical_rows, transactional_totals, transactional_entities) = tokio::try_join!(
            self.analytical.query_records(window, &filter),
            self.transactional.query_aggregate(window, &filter, &exclude),
            self.transactional
                .query_distinct_entity_ids(window, &unreconciled),
        )?;

        let analytical = filter.select(window, analytical_rows);
        let mut totals = totals_of(&analytical);
        totals += transactional_totals;

        let mut entities: BTreeSet<String> = analytical.into_iter().map(|r| r.entity_id).collect();
        entities.extend(transactional_entities);

        debug!(
            %class,
            amount = %totals.amount,
            count = totals.count,
            reconciled_keys = exclude.len(),
            "Reconciled flow"
        );
        Ok(FlowAggregate { totals, entities })
    }

    /// Reconciled registration count. Each registered entity counts once.
    pub async fn registrations(
        &self,
        window: &TimeWindow,
        allowlist: Option<&EntityAllowlist>,
    ) -> Result<FlowAggregate, StoreError> {
        let class = RecordClass::Registration;
        let exclude = self.reconciler.build(window, class).await;
        let filter = RecordFilter::new()
            .class(class)
            .completed()
            .entities(allowlist);

        let (analytical, transactional) = tokio::try_join!(
            self.analytical.query_aggregate(window, &filter),
            self.transactional.query_aggregate(window, &filter, &exclude),
        )?;

        let mut totals = analytical;
        totals += transactional;
        Ok(FlowAggregate {
            totals,
            entities: BTreeSet::new(),
        })
    }
}

/// Fold resolved gaming and cashback records into totals.
pub fn summarize_gaming(records: &[ActivityRecord], policy: NetResultPolicy) -> GamingAggregate {
    let mut agg = GamingAggregate::default();

    for record in records.iter().filter(|r| r.is_countable()) {
        if !matches!(record.class(), RecordClass::Gaming | RecordClass::Cashback) {
            continue;
        }

        let totals = &mut agg.totals;
        totals.total_transactions += 1;

        if let Some(stake) = record.stake() {
            totals.total_bets += stake;
            totals.bet_count += 1;
        }
        if let Some(payout) = record.payout() {
            totals.total_wins += payout;
            totals.win_count += 1;
        }
        match record.record_type {
            RecordType::CashbackEarn => totals.cashback_earned += record.amount,
            RecordType::CashbackClaim => totals.cashback_claimed += record.amount,
            _ => {}
        }
        if let Some(net) = record.net_result {
            totals.net_result += policy.apply(net);
        }

        if !record.entity_id.is_empty() {
            agg.active_users.insert(record.entity_id.clone());
        }
        if let Some(game) = record.game() {
            agg.active_games.insert(game.to_string());
        }
    }

    agg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassTotals, RecordStatus};
    use crate::storage::{MemoryAnalyticalStore, MemoryTransactionalStore, StoreCall};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, 0, 0).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::day(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
    }

    fn deposit(id: &str, entity: &str, amount: Decimal, key: &str) -> ActivityRecord {
        ActivityRecord::new(id, entity, RecordType::Deposit, amount, ts(2)).with_correlation_key(key)
    }

    fn aggregator(analytical: MemoryAnalyticalStore, transactional: MemoryTransactionalStore) -> Aggregator {
        Aggregator::new(
            Arc::new(analytical),
            Arc::new(transactional),
            NetResultPolicy::default(),
        )
    }

    #[test]
    fn test_summarize_round_records() {
        let records = vec![
            ActivityRecord::new("b1", "u1", RecordType::Bet, dec!(-10), ts(1)).with_game("g1", "Dice"),
            ActivityRecord::new("w1", "u1", RecordType::Win, dec!(4), ts(1)).with_game("g1", "Dice"),
            // single-row round with a payout counts as both a bet and a win
            ActivityRecord::new("b2", "u2", RecordType::Bet, dec!(5), ts(1))
                .with_game("g2", "Crash")
                .with_round(dec!(5), dec!(12))
                .with_status(RecordStatus::Pending),
            // pending without a settled payout is not counted
            ActivityRecord::new("b3", "u3", RecordType::Bet, dec!(7), ts(1))
                .with_status(RecordStatus::Pending),
            ActivityRecord::new("c1", "u1", RecordType::CashbackEarn, dec!(1.5), ts(1)),
            ActivityRecord::new("c2", "u4", RecordType::CashbackClaim, dec!(0.5), ts(1)),
        ];

        let agg = summarize_gaming(&records, NetResultPolicy::default());
        let t = agg.totals;
        assert_eq!(t.total_bets, dec!(15));
        assert_eq!(t.bet_count, 2);
        assert_eq!(t.total_wins, dec!(16));
        assert_eq!(t.win_count, 2);
        assert_eq!(t.cashback_earned, dec!(1.5));
        assert_eq!(t.cashback_claimed, dec!(0.5));
        assert_eq!(t.total_transactions, 5);
        assert_eq!(agg.active_users.len(), 3);
        assert_eq!(agg.active_games.len(), 2);
    }

    #[test]
    fn test_net_result_clamped() {
        let records = vec![
            ActivityRecord::new("b1", "u1", RecordType::Bet, dec!(3.50), ts(1)).with_net_result(dec!(-3.50)),
            ActivityRecord::new("b2", "u1", RecordType::Bet, dec!(1), ts(1)).with_net_result(dec!(2)),
        ];
        let clamped = summarize_gaming(&records, NetResultPolicy::ClampNonPositive);
        assert_eq!(clamped.totals.net_result, dec!(2));

        let signed = summarize_gaming(&records, NetResultPolicy::Signed);
        assert_eq!(signed.totals.net_result, dec!(-1.50));
    }

    #[tokio::test]
    async fn test_flow_reconciles_exactly() {
        let analytical = MemoryAnalyticalStore::new(vec![
            deposit("a1", "u1", dec!(100), "h1"),
            deposit("a2", "u2", dec!(50), "h2"),
        ]);
        let transactional = MemoryTransactionalStore::new(vec![
            deposit("p1", "u1", dec!(100), "h1"),
            deposit("p2", "u2", dec!(50), "h2"),
            deposit("p3", "u3", dec!(25), "h3"),
        ]);

        let flow = aggregator(analytical, transactional)
            .flow(&window(), RecordClass::Deposit, None)
            .await
            .unwrap();

        assert_eq!(flow.totals, ClassTotals::new(dec!(175), 3));
        assert_eq!(flow.entities.len(), 3);
    }

    #[tokio::test]
    async fn test_flow_double_counts_on_key_lookup_failure() {
        let analytical = MemoryAnalyticalStore::new(vec![deposit("a1", "u1", dec!(100), "h1")])
            .failing(StoreCall::CorrelationKeys, None);
        let transactional = MemoryTransactionalStore::new(vec![deposit("p1", "u1", dec!(100), "h1")]);

        let flow = aggregator(analytical, transactional)
            .flow(&window(), RecordClass::Deposit, None)
            .await
            .unwrap();

        assert_eq!(flow.totals, ClassTotals::new(dec!(200), 2));
        assert_eq!(flow.entities.len(), 1);
    }

    #[tokio::test]
    async fn test_flow_respects_allowlist() {
        let analytical = MemoryAnalyticalStore::new(vec![
            deposit("a1", "u1", dec!(10), "h1"),
            deposit("a2", "u2", dec!(20), "h2"),
        ]);
        let allow: EntityAllowlist = ["u2".to_string()].into_iter().collect();

        let flow = aggregator(analytical, MemoryTransactionalStore::default())
            .flow(&window(), RecordClass::Deposit, Some(&allow))
            .await
            .unwrap();
        assert_eq!(flow.totals, ClassTotals::new(dec!(20), 1));
    }

    #[tokio::test]
    async fn test_registrations_union_by_entity() {
        let signup = |id: &str, entity: &str| {
            ActivityRecord::new(id, entity, RecordType::Registration, Decimal::ZERO, ts(1))
        };
        let analytical = MemoryAnalyticalStore::new(vec![signup("r1", "u1"), signup("r2", "u2")]);
        let transactional =
            MemoryTransactionalStore::new(vec![signup("p1", "u2"), signup("p2", "u3")]);

        let regs = aggregator(analytical, transactional)
            .registrations(&window(), None)
            .await
            .unwrap();
        assert_eq!(regs.totals.count, 3);
    }

    #[tokio::test]
    async fn test_gaming_failure_propagates() {
        let analytical = MemoryAnalyticalStore::default().failing(StoreCall::Records, Some(RecordClass::Gaming));
        let result = aggregator(analytical, MemoryTransactionalStore::default())
            .gaming(&window(), None)
            .await;
        assert!(matches!(result, Err(StoreError::Unreachable { .. })));
    }
}
