//! Game and player rankings.
//!
//! Games rank by net revenue, players by bet volume, both descending. Ties
//! are broken by entity id ascending so equal inputs always produce the
//! same order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rust_decimal::Decimal;

use super::{calculate_average, calculate_rtp, dedup};
use crate::models::{
    ActivityRecord, EntityAllowlist, GameMetrics, LeaderboardEntry, PlayerMetrics, RecordClass,
    RecordType, TimeWindow,
};
use crate::storage::{AnalyticalStore, RecordFilter, StoreError};

#[derive(Clone)]
pub struct LeaderboardBuilder {
    analytical: Arc<dyn AnalyticalStore>,
}

impl LeaderboardBuilder {
    pub fn new(analytical: Arc<dyn AnalyticalStore>) -> Self {
        Self { analytical }
    }

    pub async fn top_games(
        &self,
        window: &TimeWindow,
        limit: usize,
        allowlist: Option<&EntityAllowlist>,
    ) -> Result<Vec<LeaderboardEntry<GameMetrics>>, StoreError> {
        let filter = RecordFilter::new()
            .class(RecordClass::Gaming)
            .entities(allowlist);
        let rows = self.analytical.query_records(window, &filter).await?;
        Ok(rank_games(&dedup::resolve_all(rows), limit))
    }

    pub async fn top_players(
        &self,
        window: &TimeWindow,
        limit: usize,
        allowlist: Option<&EntityAllowlist>,
    ) -> Result<Vec<LeaderboardEntry<PlayerMetrics>>, StoreError> {
        let filter = RecordFilter::new()
            .classes([
                RecordClass::Gaming,
                RecordClass::Deposit,
                RecordClass::Withdrawal,
            ])
            .entities(allowlist);
        let rows = self.analytical.query_records(window, &filter).await?;
        Ok(rank_players(&dedup::resolve_all(rows), limit))
    }
}

/// Order by `key` descending then entity id ascending, keep `limit`, and
/// assign ranks from 1.
fn rank_by<M>(
    rows: BTreeMap<String, M>,
    key: impl Fn(&M) -> Decimal,
    limit: usize,
) -> Vec<LeaderboardEntry<M>> {
    let mut rows: Vec<(String, M)> = rows.into_iter().collect();
    rows.sort_by(|(a_id, a), (b_id, b)| key(b).cmp(&key(a)).then_with(|| a_id.cmp(b_id)));
    rows.into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (entity_id, metrics))| LeaderboardEntry {
            rank: i as u32 + 1,
            entity_id,
            metrics,
        })
        .collect()
}

#[derive(Default)]
struct GameAccumulator {
    metrics: GameMetrics,
    players: BTreeSet<String>,
    sessions: BTreeSet<String>,
}

/// Rank games over resolved records.
pub fn rank_games(records: &[ActivityRecord], limit: usize) -> Vec<LeaderboardEntry<GameMetrics>> {
    let mut games: BTreeMap<String, GameAccumulator> = BTreeMap::new();

    for record in records.iter().filter(|r| r.is_countable()) {
        let Some(game_id) = record.game() else {
            continue;
        };
        let (stake, payout) = (record.stake(), record.payout());
        if stake.is_none() && payout.is_none() {
            continue;
        }

        let acc = games.entry(game_id.to_string()).or_default();
        if acc.metrics.game_name.is_empty() {
            if let Some(name) = &record.game_name {
                acc.metrics.game_name = name.clone();
            }
        }
        if acc.metrics.provider.is_empty() {
            if let Some(provider) = &record.provider {
                acc.metrics.provider = provider.clone();
            }
        }
        if let Some(stake) = stake {
            acc.metrics.total_bets += stake;
            acc.metrics.bet_count += 1;
        }
        if let Some(payout) = payout {
            acc.metrics.total_wins += payout;
        }
        acc.players.insert(record.entity_id.clone());
        if let Some(session) = &record.session_id {
            acc.sessions.insert(session.clone());
        }
    }

    let rows = games
        .into_iter()
        .map(|(id, acc)| {
            let mut m = acc.metrics;
            m.net_revenue = m.total_bets - m.total_wins;
            m.player_count = acc.players.len() as u64;
            m.session_count = acc.sessions.len() as u64;
            m.avg_bet_amount = calculate_average(m.total_bets, m.bet_count);
            m.rtp = calculate_rtp(m.total_wins, m.total_bets);
            (id, m)
        })
        .collect();

    rank_by(rows, |m| m.net_revenue, limit)
}

#[derive(Default)]
struct PlayerAccumulator {
    metrics: PlayerMetrics,
    games: BTreeSet<String>,
    sessions: BTreeSet<String>,
}

/// Rank players over resolved records.
pub fn rank_players(
    records: &[ActivityRecord],
    limit: usize,
) -> Vec<LeaderboardEntry<PlayerMetrics>> {
    let mut players: BTreeMap<String, PlayerAccumulator> = BTreeMap::new();

    for record in records.iter().filter(|r| r.is_countable()) {
        if record.entity_id.is_empty() {
            continue;
        }
        let flow = matches!(
            record.record_type,
            RecordType::Deposit | RecordType::Withdrawal
        );
        if flow && !record.is_completed() {
            continue;
        }
        let (stake, payout) = (record.stake(), record.payout());
        if !flow && stake.is_none() && payout.is_none() {
            continue;
        }

        let acc = players.entry(record.entity_id.clone()).or_default();
        let m = &mut acc.metrics;
        match record.record_type {
            RecordType::Deposit => m.total_deposits += record.amount,
            RecordType::Withdrawal => m.total_withdrawals += record.amount,
            _ => {}
        }
        if let Some(stake) = stake {
            m.total_bets += stake;
            m.bet_count += 1;
        }
        if let Some(payout) = payout {
            m.total_wins += payout;
        }
        m.transaction_count += 1;
        m.last_activity = m.last_activity.max(Some(record.created_at));

        if let Some(game) = record.game() {
            acc.games.insert(game.to_string());
        }
        if let Some(session) = &record.session_id {
            acc.sessions.insert(session.clone());
        }
    }

    let rows = players
        .into_iter()
        .map(|(id, acc)| {
            let mut m = acc.metrics;
            m.net_loss = m.total_bets - m.total_wins;
            m.unique_games_played = acc.games.len() as u64;
            m.session_count = acc.sessions.len() as u64;
            m.avg_bet_amount = calculate_average(m.total_bets, m.bet_count);
            (id, m)
        })
        .collect();

    rank_by(rows, |m| m.total_bets, limit)
}
