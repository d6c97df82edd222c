//! Raw activity records as observed in either store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of activity a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Deposit,
    Withdrawal,
    Bet,
    Win,
    Bonus,
    CashbackEarn,
    CashbackClaim,
    TipSent,
    TipReceived,
    Registration,
    Refund,
}

impl RecordType {
    pub const ALL: [RecordType; 11] = [
        RecordType::Deposit,
        RecordType::Withdrawal,
        RecordType::Bet,
        RecordType::Win,
        RecordType::Bonus,
        RecordType::CashbackEarn,
        RecordType::CashbackClaim,
        RecordType::TipSent,
        RecordType::TipReceived,
        RecordType::Registration,
        RecordType::Refund,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Deposit => "deposit",
            RecordType::Withdrawal => "withdrawal",
            RecordType::Bet => "bet",
            RecordType::Win => "win",
            RecordType::Bonus => "bonus",
            RecordType::CashbackEarn => "cashback_earn",
            RecordType::CashbackClaim => "cashback_claim",
            RecordType::TipSent => "tip_sent",
            RecordType::TipReceived => "tip_received",
            RecordType::Registration => "registration",
            RecordType::Refund => "refund",
        }
    }

    /// Reporting class this type belongs to.
    pub fn class(&self) -> RecordClass {
        match self {
            RecordType::Bet | RecordType::Win => RecordClass::Gaming,
            RecordType::CashbackEarn | RecordType::CashbackClaim => RecordClass::Cashback,
            RecordType::Deposit => RecordClass::Deposit,
            RecordType::Withdrawal => RecordClass::Withdrawal,
            RecordType::Registration => RecordClass::Registration,
            RecordType::Bonus
            | RecordType::TipSent
            | RecordType::TipReceived
            | RecordType::Refund => RecordClass::Other,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown record type: {}", s))
    }
}

/// Lifecycle status of a record revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Completed => "completed",
            RecordStatus::Failed => "failed",
            RecordStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RecordStatus::Pending),
            "completed" => Ok(RecordStatus::Completed),
            "failed" => Ok(RecordStatus::Failed),
            "cancelled" => Ok(RecordStatus::Cancelled),
            other => Err(format!("unknown record status: {}", other)),
        }
    }
}

/// Reporting class. Deposits, withdrawals and registrations are the classes
/// reconciled across stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordClass {
    Gaming,
    Cashback,
    Deposit,
    Withdrawal,
    Registration,
    Other,
}

impl RecordClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordClass::Gaming => "gaming",
            RecordClass::Cashback => "cashback",
            RecordClass::Deposit => "deposit",
            RecordClass::Withdrawal => "withdrawal",
            RecordClass::Registration => "registration",
            RecordClass::Other => "other",
        }
    }

    pub fn is_reconciled(&self) -> bool {
        matches!(
            self,
            RecordClass::Deposit | RecordClass::Withdrawal | RecordClass::Registration
        )
    }

    /// Key matching the same logical event across both stores.
    ///
    /// Registrations carry no external key, so the registered entity stands in.
    pub fn reconciliation_key<'a>(&self, record: &'a ActivityRecord) -> Option<&'a str> {
        match self {
            RecordClass::Registration if record.correlation_key.is_empty() => {
                Some(record.entity_id.as_str()).filter(|k| !k.is_empty())
            }
            _ => Some(record.correlation_key.as_str()).filter(|k| !k.is_empty()),
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One observed revision of an activity event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Natural key shared by every revision of the same event
    pub id: String,

    /// User/account the event belongs to
    pub entity_id: String,

    pub record_type: RecordType,

    pub amount: Decimal,

    #[serde(default = "default_currency")]
    pub currency: String,

    pub status: RecordStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_id: Option<String>,

    /// Stake of a single-row round
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bet_amount: Option<Decimal>,

    /// Payout of a single-row round
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_amount: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_result: Option<Decimal>,

    #[serde(default)]
    pub balance_before: Decimal,

    #[serde(default)]
    pub balance_after: Decimal,

    /// External idempotency key (e.g. a chain tx hash), empty if none
    #[serde(default)]
    pub correlation_key: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl ActivityRecord {
    /// Create a completed record with `updated_at == created_at`.
    pub fn new(
        id: impl Into<String>,
        entity_id: impl Into<String>,
        record_type: RecordType,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            entity_id: entity_id.into(),
            record_type,
            amount,
            currency: default_currency(),
            status: RecordStatus::Completed,
            game_id: None,
            game_name: None,
            provider: None,
            session_id: None,
            round_id: None,
            bet_amount: None,
            win_amount: None,
            net_result: None,
            balance_before: Decimal::ZERO,
            balance_after: Decimal::ZERO,
            correlation_key: String::new(),
            created_at,
            updated_at: created_at,
        }
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn with_game(mut self, game_id: impl Into<String>, game_name: impl Into<String>) -> Self {
        self.game_id = Some(game_id.into());
        self.game_name = Some(game_name.into());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_round(mut self, bet_amount: Decimal, win_amount: Decimal) -> Self {
        self.bet_amount = Some(bet_amount);
        self.win_amount = Some(win_amount);
        self
    }

    pub fn with_net_result(mut self, net_result: Decimal) -> Self {
        self.net_result = Some(net_result);
        self
    }

    pub fn with_correlation_key(mut self, key: impl Into<String>) -> Self {
        self.correlation_key = key.into();
        self
    }

    pub fn class(&self) -> RecordClass {
        self.record_type.class()
    }

    pub fn is_completed(&self) -> bool {
        self.status == RecordStatus::Completed
    }

    /// Whether a resolved revision counts towards activity metrics.
    ///
    /// Completed always counts; a pending round counts once both its stake
    /// and payout are known.
    pub fn is_countable(&self) -> bool {
        match self.status {
            RecordStatus::Completed => true,
            RecordStatus::Pending => self.bet_amount.is_some() && self.win_amount.is_some(),
            RecordStatus::Failed | RecordStatus::Cancelled => false,
        }
    }

    /// Stake contributed to bet totals, if this is a bet.
    pub fn stake(&self) -> Option<Decimal> {
        match self.record_type {
            RecordType::Bet => Some(self.bet_amount.unwrap_or_else(|| self.amount.abs())),
            _ => None,
        }
    }

    /// Payout contributed to win totals.
    ///
    /// Single-row rounds carry their payout on the bet record.
    pub fn payout(&self) -> Option<Decimal> {
        match self.record_type {
            RecordType::Win => Some(self.win_amount.unwrap_or(self.amount)),
            RecordType::Bet => self.win_amount.filter(|w| *w > Decimal::ZERO),
            _ => None,
        }
    }

    pub fn game(&self) -> Option<&str> {
        self.game_id.as_deref().filter(|g| !g.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, 0, 0).unwrap()
    }

    #[test]
    fn test_record_type_round_trip_names() {
        for t in RecordType::ALL {
            assert_eq!(t.as_str().parse::<RecordType>().unwrap(), t);
        }
        assert!("jackpot".parse::<RecordType>().is_err());
    }

    #[test]
    fn test_record_type_serde_matches_as_str() {
        let json = serde_json::to_string(&RecordType::CashbackClaim).unwrap();
        assert_eq!(json, "\"cashback_claim\"");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("completed".parse::<RecordStatus>(), Ok(RecordStatus::Completed));
        assert!("verified".parse::<RecordStatus>().is_err());
    }

    #[test]
    fn test_class_mapping() {
        assert_eq!(RecordType::Bet.class(), RecordClass::Gaming);
        assert_eq!(RecordType::CashbackEarn.class(), RecordClass::Cashback);
        assert_eq!(RecordType::Registration.class(), RecordClass::Registration);
        assert_eq!(RecordType::TipSent.class(), RecordClass::Other);
        assert!(RecordClass::Deposit.is_reconciled());
        assert!(!RecordClass::Gaming.is_reconciled());
    }

    #[test]
    fn test_reconciliation_key() {
        let deposit = ActivityRecord::new("d1", "u1", RecordType::Deposit, dec!(10), at(1))
            .with_correlation_key("0xabc");
        assert_eq!(RecordClass::Deposit.reconciliation_key(&deposit), Some("0xabc"));

        let keyless = ActivityRecord::new("d2", "u1", RecordType::Deposit, dec!(10), at(1));
        assert_eq!(RecordClass::Deposit.reconciliation_key(&keyless), None);

        let signup = ActivityRecord::new("r1", "u9", RecordType::Registration, dec!(0), at(1));
        assert_eq!(RecordClass::Registration.reconciliation_key(&signup), Some("u9"));
    }

    #[test]
    fn test_stake_and_payout() {
        let bet = ActivityRecord::new("b1", "u1", RecordType::Bet, dec!(-5), at(1));
        assert_eq!(bet.stake(), Some(dec!(5)));
        assert_eq!(bet.payout(), None);

        let round = ActivityRecord::new("b2", "u1", RecordType::Bet, dec!(2), at(1))
            .with_round(dec!(2), dec!(7));
        assert_eq!(round.stake(), Some(dec!(2)));
        assert_eq!(round.payout(), Some(dec!(7)));

        let lost_round = ActivityRecord::new("b3", "u1", RecordType::Bet, dec!(2), at(1))
            .with_round(dec!(2), dec!(0));
        assert_eq!(lost_round.payout(), None);

        let win = ActivityRecord::new("w1", "u1", RecordType::Win, dec!(3), at(1));
        assert_eq!(win.payout(), Some(dec!(3)));
    }

    #[test]
    fn test_countable() {
        let base = ActivityRecord::new("b1", "u1", RecordType::Bet, dec!(1), at(1));
        assert!(base.is_countable());
        assert!(!base.clone().with_status(RecordStatus::Pending).is_countable());
        assert!(base
            .clone()
            .with_status(RecordStatus::Pending)
            .with_round(dec!(1), dec!(0))
            .is_countable());
        assert!(!base.with_status(RecordStatus::Failed).is_countable());
    }

    #[test]
    fn test_record_deserialize_defaults() {
        let json = r#"{
            "id": "t1",
            "entity_id": "u1",
            "record_type": "deposit",
            "amount": "25.50",
            "status": "completed",
            "created_at": "2025-03-10T01:00:00Z",
            "updated_at": "2025-03-10T01:00:00Z"
        }"#;
        let record: ActivityRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.amount, dec!(25.50));
        assert_eq!(record.currency, "USD");
        assert!(record.correlation_key.is_empty());
        assert!(record.game().is_none());
    }
}
