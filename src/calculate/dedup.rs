//! Revision resolution.
//!
//! Both stores may hold several revisions of one logical record. Exactly one
//! revision per id is kept, chosen by a total order so the outcome never
//! depends on input order:
//!
//! 1. a completed revision outranks any other status
//! 2. then the most recent `updated_at`
//! 3. then the most recent `created_at`
//! 4. then a field-by-field comparison of the remaining content

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::{ActivityRecord, RecordStatus};

/// Compare two revisions; `Greater` means `a` wins.
pub fn precedence(a: &ActivityRecord, b: &ActivityRecord) -> Ordering {
    a.is_completed()
        .cmp(&b.is_completed())
        .then_with(|| a.updated_at.cmp(&b.updated_at))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| content_order(a, b))
}

fn status_rank(status: RecordStatus) -> u8 {
    match status {
        RecordStatus::Completed => 3,
        RecordStatus::Pending => 2,
        RecordStatus::Failed => 1,
        RecordStatus::Cancelled => 0,
    }
}

fn content_order(a: &ActivityRecord, b: &ActivityRecord) -> Ordering {
    status_rank(a.status)
        .cmp(&status_rank(b.status))
        .then_with(|| a.amount.cmp(&b.amount))
        .then_with(|| a.entity_id.cmp(&b.entity_id))
        .then_with(|| a.record_type.cmp(&b.record_type))
        .then_with(|| a.correlation_key.cmp(&b.correlation_key))
        .then_with(|| a.bet_amount.cmp(&b.bet_amount))
        .then_with(|| a.win_amount.cmp(&b.win_amount))
        .then_with(|| a.net_result.cmp(&b.net_result))
        .then_with(|| a.game_id.cmp(&b.game_id))
        .then_with(|| a.session_id.cmp(&b.session_id))
        .then_with(|| a.currency.cmp(&b.currency))
}

/// Pick the canonical revision of one group.
pub fn resolve(group: impl IntoIterator<Item = ActivityRecord>) -> Option<ActivityRecord> {
    group.into_iter().max_by(precedence)
}

/// Collapse every id to its canonical revision. Output is ordered by id.
pub fn resolve_all(records: impl IntoIterator<Item = ActivityRecord>) -> Vec<ActivityRecord> {
    let mut winners: BTreeMap<String, ActivityRecord> = BTreeMap::new();
    for record in records {
        match winners.get(&record.id) {
            Some(current) if precedence(&record, current) != Ordering::Greater => {}
            _ => {
                winners.insert(record.id.clone(), record);
            }
        }
    }
    winners.into_values().collect()
}
