//! Store access for the reporting engine.
//!
//! Two stores hold overlapping activity data:
//! - The analytical store: day-partitioned Parquet tables, fast to scan
//! - The transactional store: day-partitioned JSONL, authoritative but
//!   possibly ahead of the analytical copy
//!
//! Both are reached through the traits below so the engine can run against
//! the file-backed stores or the in-memory ones used in tests.

pub mod filter;
pub mod jsonl;
pub mod memory;
pub mod parquet;

pub use filter::RecordFilter;
pub use jsonl::JsonlTransactionalStore;
pub use memory::{MemoryAnalyticalStore, MemoryTransactionalStore, StoreCall};
pub use self::parquet::ParquetAnalyticalStore;

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ActivityRecord, ClassTotals, RecordClass, ReconciliationSet, TimeWindow};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Schema mismatch: {0}")]
    Schema(String),

    #[error("{store} store unreachable: {reason}")]
    Unreachable { store: &'static str, reason: String },

    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn parquet_dir(&self) -> PathBuf {
        self.data_dir.join("parquet")
    }

    pub fn transactional_dir(&self) -> PathBuf {
        self.data_dir.join("transactional")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

/// Fast, possibly lagging store.
///
/// Every query resolves revisions before it aggregates or filters by status.
#[async_trait]
pub trait AnalyticalStore: Send + Sync {
    /// Totals over the canonical records matching `filter`.
    async fn query_aggregate(
        &self,
        window: &TimeWindow,
        filter: &RecordFilter,
    ) -> Result<ClassTotals, StoreError>;

    /// Raw revisions matching the row-level predicates of `filter`.
    /// Status predicates are left to the caller.
    async fn query_records(
        &self,
        window: &TimeWindow,
        filter: &RecordFilter,
    ) -> Result<Vec<ActivityRecord>, StoreError>;

    /// Reconciliation keys of completed `class` records in the window.
    async fn query_distinct_correlation_keys(
        &self,
        window: &TimeWindow,
        class: RecordClass,
    ) -> Result<HashSet<String>, StoreError>;
}

/// Authoritative store, reconciled against the analytical store.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    /// Totals over canonical records matching `filter` that are not already
    /// covered by `exclude`.
    async fn query_aggregate(
        &self,
        window: &TimeWindow,
        filter: &RecordFilter,
        exclude: &ReconciliationSet,
    ) -> Result<ClassTotals, StoreError>;

    /// Entities behind the canonical records matching `filter`.
    async fn query_distinct_entity_ids(
        &self,
        window: &TimeWindow,
        filter: &RecordFilter,
    ) -> Result<BTreeSet<String>, StoreError>;
}

/// Totals of an already-selected record set.
pub fn totals_of(records: &[ActivityRecord]) -> ClassTotals {
    records.iter().fold(ClassTotals::default(), |mut acc, r| {
        acc.amount += r.amount;
        acc.count += 1;
        acc
    })
}

/// Reconciliation keys of completed canonical `class` records.
pub fn correlation_keys_of(records: &[ActivityRecord], class: RecordClass) -> HashSet<String> {
    records
        .iter()
        .filter(|r| r.class() == class && r.is_completed())
        .filter_map(|r| class.reconciliation_key(r))
        .map(str::to_string)
        .collect()
}
