//! JSONL (JSON Lines) transactional store.
//!
//! One directory per UTC day, one file per table:
//! `transactional/<YYYY-MM-DD>/{transactions,registrations}.jsonl`.
//! Each line is one record revision; revisions are appended, never rewritten.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::{totals_of, RecordFilter, StorageConfig, StoreError, TransactionalStore};
use crate::models::{ActivityRecord, ClassTotals, RecordClass, ReconciliationSet, TimeWindow};

/// Tables of the transactional store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionalTable {
    Transactions,
    Registrations,
}

impl TransactionalTable {
    pub const ALL: [TransactionalTable; 2] = [
        TransactionalTable::Transactions,
        TransactionalTable::Registrations,
    ];

    /// Get the filename for this table.
    pub fn filename(&self) -> &'static str {
        match self {
            TransactionalTable::Transactions => "transactions.jsonl",
            TransactionalTable::Registrations => "registrations.jsonl",
        }
    }

    pub fn for_class(class: RecordClass) -> Self {
        match class {
            RecordClass::Registration => TransactionalTable::Registrations,
            _ => TransactionalTable::Transactions,
        }
    }

    fn holds(&self, filter: &RecordFilter) -> bool {
        match self {
            TransactionalTable::Registrations => filter.includes_class(RecordClass::Registration),
            TransactionalTable::Transactions => [
                RecordClass::Gaming,
                RecordClass::Cashback,
                RecordClass::Deposit,
                RecordClass::Withdrawal,
                RecordClass::Other,
            ]
            .into_iter()
            .any(|c| filter.includes_class(c)),
        }
    }
}

/// Get the path for a day's table file.
pub fn partition_path(config: &StorageConfig, table: TransactionalTable, day: NaiveDate) -> PathBuf {
    config
        .transactional_dir()
        .join(day.format("%Y-%m-%d").to_string())
        .join(table.filename())
}

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a writer for a table partition.
    pub fn for_partition(config: &StorageConfig, table: TransactionalTable, day: NaiveDate) -> Self {
        Self::new(partition_path(config, table, day))
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append multiple entities to the file.
    pub fn append_batch(&self, entities: &[T]) -> Result<usize, StoreError> {
        if entities.is_empty() {
            return Ok(0);
        }

        self.ensure_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = BufWriter::new(file);
        for entity in entities {
            let json = serde_json::to_string(entity)?;
            writeln!(writer, "{}", json)?;
        }

        writer.flush()?;
        info!("Appended {} entities to {:?}", entities.len(), self.path);

        Ok(entities.len())
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn for_partition(config: &StorageConfig, table: TransactionalTable, day: NaiveDate) -> Self {
        Self::new(partition_path(config, table, day))
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all entities from the file. Malformed lines are logged and skipped.
    pub fn read_all(&self) -> Result<Vec<T>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entities = Vec::new();

        // Split on raw bytes so a line that is not UTF-8 is skipped like any
        // other malformed line instead of failing the whole file.
        for (idx, line) in reader.split(b'\n').enumerate() {
            let line = line?;

            if line.trim_ascii().is_empty() {
                continue;
            }

            match serde_json::from_slice(&line) {
                Ok(entity) => entities.push(entity),
                Err(e) => {
                    warn!(
                        "Failed to parse line {} in {:?}: {}",
                        idx + 1,
                        self.path,
                        e
                    );
                }
            }
        }

        debug!("Read {} entities from {:?}", entities.len(), self.path);
        Ok(entities)
    }
}

/// Transactional store backed by day-partitioned JSONL files.
#[derive(Debug, Clone)]
pub struct JsonlTransactionalStore {
    config: StorageConfig,
}

impl JsonlTransactionalStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Append records to the partition of their `created_at` day.
    pub fn append(&self, records: &[ActivityRecord]) -> Result<usize, StoreError> {
        let mut written = 0;
        for table in TransactionalTable::ALL {
            let mut by_day: std::collections::BTreeMap<NaiveDate, Vec<ActivityRecord>> =
                Default::default();
            for record in records
                .iter()
                .filter(|r| TransactionalTable::for_class(r.class()) == table)
            {
                by_day
                    .entry(record.created_at.date_naive())
                    .or_default()
                    .push(record.clone());
            }
            for (day, batch) in by_day {
                written += JsonlWriter::for_partition(&self.config, table, day).append_batch(&batch)?;
            }
        }
        Ok(written)
    }

    /// Load every revision of the window's partitions, off the async runtime.
    async fn load(
        &self,
        window: &TimeWindow,
        filter: &RecordFilter,
    ) -> Result<Vec<ActivityRecord>, StoreError> {
        let config = self.config.clone();
        let days = window.days();
        let tables: Vec<TransactionalTable> = TransactionalTable::ALL
            .into_iter()
            .filter(|t| t.holds(filter))
            .collect();

        let rows = tokio::task::spawn_blocking(move || -> Result<Vec<ActivityRecord>, StoreError> {
            let mut rows = Vec::new();
            for day in days {
                for table in &tables {
                    let reader: JsonlReader<ActivityRecord> =
                        JsonlReader::for_partition(&config, *table, day);
                    rows.extend(reader.read_all()?);
                }
            }
            Ok(rows)
        })
        .await??;

        debug!(
            rows = rows.len(),
            from = %window.from(),
            to = %window.to(),
            "Loaded transactional rows"
        );
        Ok(rows)
    }
}

#[async_trait]
impl TransactionalStore for JsonlTransactionalStore {
    async fn query_aggregate(
        &self,
        window: &TimeWindow,
        filter: &RecordFilter,
        exclude: &ReconciliationSet,
    ) -> Result<ClassTotals, StoreError> {
        let rows = self.load(window, filter).await?;
        let filter = filter.clone().excluding(exclude);
        Ok(totals_of(&filter.select(window, rows)))
    }

    async fn query_distinct_entity_ids(
        &self,
        window: &TimeWindow,
        filter: &RecordFilter,
    ) -> Result<BTreeSet<String>, StoreError> {
        let rows = self.load(window, filter).await?;
        Ok(filter
            .select(window, rows)
            .into_iter()
            .map(|r| r.entity_id)
            .collect())
    }
}
