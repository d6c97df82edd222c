//! In-memory stores with failure injection.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;

use super::{
    correlation_keys_of, totals_of, AnalyticalStore, RecordFilter, StoreError, TransactionalStore,
};
use crate::models::{ActivityRecord, ClassTotals, RecordClass, ReconciliationSet, TimeWindow};

/// Store operation a failure can be injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCall {
    Aggregate,
    Records,
    CorrelationKeys,
    EntityIds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FailRule {
    call: StoreCall,
    class: Option<RecordClass>,
    window: Option<TimeWindow>,
}

impl FailRule {
    fn covers(&self, window: &TimeWindow) -> bool {
        self.window
            .map_or(true, |w| w.from() == window.from() && w.to() == window.to())
    }
}

#[derive(Debug, Clone, Default)]
struct FailRules(Vec<FailRule>);

impl FailRules {
    fn check(
        &self,
        store: &'static str,
        call: StoreCall,
        window: &TimeWindow,
        hits: impl Fn(RecordClass) -> bool,
    ) -> Result<(), StoreError> {
        let tripped = self.0.iter().any(|rule| {
            rule.call == call && rule.class.map_or(true, &hits) && rule.covers(window)
        });
        if tripped {
            Err(StoreError::Unreachable {
                store,
                reason: format!("injected failure on {:?}", call),
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryAnalyticalStore {
    records: Vec<ActivityRecord>,
    failures: FailRules,
}

impl MemoryAnalyticalStore {
    pub fn new(records: Vec<ActivityRecord>) -> Self {
        Self {
            records,
            failures: FailRules::default(),
        }
    }

    /// Fail every `call`, or only those touching `class`.
    pub fn failing(mut self, call: StoreCall, class: Option<RecordClass>) -> Self {
        self.failures.0.push(FailRule { call, class, window: None });
        self
    }

    /// Like [`failing`](Self::failing), but only for queries over exactly `window`.
    pub fn failing_within(
        mut self,
        call: StoreCall,
        class: Option<RecordClass>,
        window: TimeWindow,
    ) -> Self {
        self.failures.0.push(FailRule {
            call,
            class,
            window: Some(window),
        });
        self
    }
}

#[async_trait]
impl AnalyticalStore for MemoryAnalyticalStore {
    async fn query_aggregate(
        &self,
        window: &TimeWindow,
        filter: &RecordFilter,
    ) -> Result<ClassTotals, StoreError> {
        self.failures
            .check("analytical", StoreCall::Aggregate, window, |c| filter.includes_class(c))?;
        Ok(totals_of(&filter.select(window, self.records.iter().cloned())))
    }

    async fn query_records(
        &self,
        window: &TimeWindow,
        filter: &RecordFilter,
    ) -> Result<Vec<ActivityRecord>, StoreError> {
        self.failures
            .check("analytical", StoreCall::Records, window, |c| filter.includes_class(c))?;
        Ok(self
            .records
            .iter()
            .filter(|r| filter.matches_row(window, r))
            .cloned()
            .collect())
    }

    async fn query_distinct_correlation_keys(
        &self,
        window: &TimeWindow,
        class: RecordClass,
    ) -> Result<HashSet<String>, StoreError> {
        self.failures
            .check("analytical", StoreCall::CorrelationKeys, window, |c| c == class)?;
        let selected = RecordFilter::new()
            .class(class)
            .select(window, self.records.iter().cloned());
        Ok(correlation_keys_of(&selected, class))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTransactionalStore {
    records: Vec<ActivityRecord>,
    failures: FailRules,
}

impl MemoryTransactionalStore {
    pub fn new(records: Vec<ActivityRecord>) -> Self {
        Self {
            records,
            failures: FailRules::default(),
        }
    }

    pub fn failing(mut self, call: StoreCall, class: Option<RecordClass>) -> Self {
        self.failures.0.push(FailRule { call, class, window: None });
        self
    }
}

#[async_trait]
impl TransactionalStore for MemoryTransactionalStore {
    async fn query_aggregate(
        &self,
        window: &TimeWindow,
        filter: &RecordFilter,
        exclude: &ReconciliationSet,
    ) -> Result<ClassTotals, StoreError> {
        self.failures
            .check("transactional", StoreCall::Aggregate, window, |c| filter.includes_class(c))?;
        let filter = filter.clone().excluding(exclude);
        Ok(totals_of(&filter.select(window, self.records.iter().cloned())))
    }

    async fn query_distinct_entity_ids(
        &self,
        window: &TimeWindow,
        filter: &RecordFilter,
    ) -> Result<BTreeSet<String>, StoreError> {
        self.failures
            .check("transactional", StoreCall::EntityIds, window, |c| filter.includes_class(c))?;
        Ok(filter
            .select(window, self.records.iter().cloned())
            .into_iter()
            .map(|r| r.entity_id)
            .collect())
    }
}
