//! Ranked game and player entries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardKind {
    Games,
    Players,
}

impl fmt::Display for LeaderboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaderboardKind::Games => write!(f, "games"),
            LeaderboardKind::Players => write!(f, "players"),
        }
    }
}

impl FromStr for LeaderboardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "games" => Ok(LeaderboardKind::Games),
            "players" => Ok(LeaderboardKind::Players),
            other => Err(format!("unknown leaderboard kind: {}", other)),
        }
    }
}

/// One ranked row. `rank` starts at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry<M> {
    pub rank: u32,
    pub entity_id: String,
    #[serde(flatten)]
    pub metrics: M,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    pub game_name: String,
    pub provider: String,
    pub total_bets: Decimal,
    pub total_wins: Decimal,
    pub net_revenue: Decimal,
    pub bet_count: u64,
    pub player_count: u64,
    pub session_count: u64,
    pub avg_bet_amount: Decimal,
    /// Return to player, percent
    pub rtp: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerMetrics {
    pub total_deposits: Decimal,
    pub total_withdrawals: Decimal,
    pub total_bets: Decimal,
    pub total_wins: Decimal,
    /// Bets minus wins
    pub net_loss: Decimal,
    pub bet_count: u64,
    pub transaction_count: u64,
    pub unique_games_played: u64,
    pub session_count: u64,
    pub avg_bet_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entries", rename_all = "lowercase")]
pub enum Leaderboard {
    Games(Vec<LeaderboardEntry<GameMetrics>>),
    Players(Vec<LeaderboardEntry<PlayerMetrics>>),
}

impl Leaderboard {
    pub fn kind(&self) -> LeaderboardKind {
        match self {
            Leaderboard::Games(_) => LeaderboardKind::Games,
            Leaderboard::Players(_) => LeaderboardKind::Players,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Leaderboard::Games(e) => e.len(),
            Leaderboard::Players(e) => e.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
