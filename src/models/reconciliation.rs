//! Keys already accounted for by the analytical store.

use std::collections::HashSet;

use super::{ActivityRecord, RecordClass};

/// Correlation keys of one reconciled class, observed in the analytical
/// store for a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationSet {
    class: RecordClass,
    keys: HashSet<String>,
}

impl ReconciliationSet {
    pub fn new(class: RecordClass, keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            class,
            keys: keys.into_iter().filter(|k| !k.is_empty()).collect(),
        }
    }

    /// An empty set excludes nothing.
    pub fn empty(class: RecordClass) -> Self {
        Self {
            class,
            keys: HashSet::new(),
        }
    }

    pub fn class(&self) -> RecordClass {
        self.class
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether `record` is already covered by the analytical store.
    pub fn covers(&self, record: &ActivityRecord) -> bool {
        record.class() == self.class
            && self
                .class
                .reconciliation_key(record)
                .map(|k| self.keys.contains(k))
                .unwrap_or(false)
    }
}
