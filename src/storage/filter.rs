//! Typed record filters shared by every store backend.
//!
//! A filter has two halves. Row predicates (class, type, entity, game,
//! reconciliation exclusion) apply to raw revisions. Status predicates apply
//! only after revisions are resolved, so a stale pending copy can never hide
//! or stand in for the completed one.

use std::collections::BTreeSet;

use crate::calculate::dedup;
use crate::models::{
    ActivityRecord, RecordClass, RecordStatus, RecordType, ReconciliationSet, TimeWindow,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    classes: Option<BTreeSet<RecordClass>>,
    types: Option<BTreeSet<RecordType>>,
    statuses: Option<BTreeSet<RecordStatus>>,
    entities: Option<BTreeSet<String>>,
    game_id: Option<String>,
    exclude: Option<ReconciliationSet>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(mut self, class: RecordClass) -> Self {
        self.classes.get_or_insert_with(BTreeSet::new).insert(class);
        self
    }

    pub fn classes(mut self, classes: impl IntoIterator<Item = RecordClass>) -> Self {
        self.classes
            .get_or_insert_with(BTreeSet::new)
            .extend(classes);
        self
    }

    pub fn record_type(mut self, record_type: RecordType) -> Self {
        self.types
            .get_or_insert_with(BTreeSet::new)
            .insert(record_type);
        self
    }

    pub fn status(mut self, status: RecordStatus) -> Self {
        self.statuses.get_or_insert_with(BTreeSet::new).insert(status);
        self
    }

    pub fn completed(self) -> Self {
        self.status(RecordStatus::Completed)
    }

    pub fn entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entities
            .get_or_insert_with(BTreeSet::new)
            .insert(entity_id.into());
        self
    }

    /// Restrict to an allowlist of entities. `None` leaves the filter open.
    pub fn entities(mut self, allowlist: Option<&BTreeSet<String>>) -> Self {
        if let Some(ids) = allowlist {
            self.entities
                .get_or_insert_with(BTreeSet::new)
                .extend(ids.iter().cloned());
        }
        self
    }

    pub fn game(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = Some(game_id.into());
        self
    }

    /// Drop records already covered by `set`.
    pub fn excluding(mut self, set: &ReconciliationSet) -> Self {
        if !set.is_empty() {
            self.exclude = Some(set.clone());
        }
        self
    }

    pub fn class_set(&self) -> Option<&BTreeSet<RecordClass>> {
        self.classes.as_ref()
    }

    pub fn includes_class(&self, class: RecordClass) -> bool {
        self.classes.as_ref().map_or(true, |c| c.contains(&class))
            && self
                .types
                .as_ref()
                .map_or(true, |t| t.iter().any(|rt| rt.class() == class))
    }

    /// Row-level predicates, evaluated on raw revisions.
    pub fn matches_row(&self, window: &TimeWindow, record: &ActivityRecord) -> bool {
        if !window.contains(record.created_at) {
            return false;
        }
        if let Some(classes) = &self.classes {
            if !classes.contains(&record.class()) {
                return false;
            }
        }
        if let Some(types) = &self.types {
            if !types.contains(&record.record_type) {
                return false;
            }
        }
        if let Some(entities) = &self.entities {
            if !entities.contains(&record.entity_id) {
                return false;
            }
        }
        if let Some(game_id) = &self.game_id {
            if record.game() != Some(game_id.as_str()) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.covers(record) {
                return false;
            }
        }
        true
    }

    /// Status predicate, evaluated on the resolved revision.
    pub fn accepts_status(&self, record: &ActivityRecord) -> bool {
        self.statuses
            .as_ref()
            .map_or(true, |s| s.contains(&record.status))
    }

    /// Full selection: row predicates, revision resolution, status predicate.
    pub fn select(
        &self,
        window: &TimeWindow,
        rows: impl IntoIterator<Item = ActivityRecord>,
    ) -> Vec<ActivityRecord> {
        let candidates = rows.into_iter().filter(|r| self.matches_row(window, r));
        dedup::resolve_all(candidates)
            .into_iter()
            .filter(|r| self.accepts_status(r))
            .collect()
    }
}
