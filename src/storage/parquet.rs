//! Parquet analytical store.
//!
//! One directory per UTC day, one file per table:
//! `parquet/<YYYY-MM-DD>/<table>.parquet`. Every table shares the activity
//! schema. Money columns are `Decimal128(38, 8)`.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Decimal128Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::{
    correlation_keys_of, totals_of, AnalyticalStore, RecordFilter, StorageConfig, StoreError,
};
use crate::models::{ActivityRecord, ClassTotals, RecordClass, TimeWindow};

pub const AMOUNT_PRECISION: u8 = 38;
pub const AMOUNT_SCALE: u32 = 8;

/// Parquet table types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TableType {
    Transactions,
    Cashback,
    Deposits,
    Withdrawals,
    Registrations,
}

impl TableType {
    pub const ALL: [TableType; 5] = [
        TableType::Transactions,
        TableType::Cashback,
        TableType::Deposits,
        TableType::Withdrawals,
        TableType::Registrations,
    ];

    /// Get the filename for this table.
    pub fn filename(&self) -> &'static str {
        match self {
            TableType::Transactions => "transactions.parquet",
            TableType::Cashback => "cashback.parquet",
            TableType::Deposits => "deposits.parquet",
            TableType::Withdrawals => "withdrawals.parquet",
            TableType::Registrations => "registrations.parquet",
        }
    }

    pub fn for_class(class: RecordClass) -> Self {
        match class {
            RecordClass::Gaming | RecordClass::Other => TableType::Transactions,
            RecordClass::Cashback => TableType::Cashback,
            RecordClass::Deposit => TableType::Deposits,
            RecordClass::Withdrawal => TableType::Withdrawals,
            RecordClass::Registration => TableType::Registrations,
        }
    }

    fn classes(&self) -> &'static [RecordClass] {
        match self {
            TableType::Transactions => &[RecordClass::Gaming, RecordClass::Other],
            TableType::Cashback => &[RecordClass::Cashback],
            TableType::Deposits => &[RecordClass::Deposit],
            TableType::Withdrawals => &[RecordClass::Withdrawal],
            TableType::Registrations => &[RecordClass::Registration],
        }
    }

    /// Tables that can hold rows matching `filter`.
    pub fn for_filter(filter: &RecordFilter) -> Vec<TableType> {
        TableType::ALL
            .into_iter()
            .filter(|t| t.classes().iter().any(|c| filter.includes_class(*c)))
            .collect()
    }
}

/// Schema definitions for Parquet tables.
pub mod schemas {
    use super::*;

    fn money(name: &str, nullable: bool) -> Field {
        Field::new(
            name,
            DataType::Decimal128(AMOUNT_PRECISION, AMOUNT_SCALE as i8),
            nullable,
        )
    }

    fn timestamp(name: &str) -> Field {
        Field::new(
            name,
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        )
    }

    /// Schema shared by every activity table.
    pub fn activity_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("entity_id", DataType::Utf8, false),
            Field::new("record_type", DataType::Utf8, false),
            money("amount", false),
            Field::new("currency", DataType::Utf8, false),
            Field::new("status", DataType::Utf8, false),
            Field::new("game_id", DataType::Utf8, true),
            Field::new("game_name", DataType::Utf8, true),
            Field::new("provider", DataType::Utf8, true),
            Field::new("session_id", DataType::Utf8, true),
            Field::new("round_id", DataType::Utf8, true),
            money("bet_amount", true),
            money("win_amount", true),
            money("net_result", true),
            money("balance_before", false),
            money("balance_after", false),
            Field::new("correlation_key", DataType::Utf8, false),
            timestamp("created_at"),
            timestamp("updated_at"),
        ])
    }
}

fn to_scaled(value: Decimal) -> i128 {
    let mut v = value;
    v.rescale(AMOUNT_SCALE);
    v.mantissa()
}

fn table_path(config: &StorageConfig, table: TableType, day: NaiveDate) -> PathBuf {
    config
        .parquet_dir()
        .join(day.format("%Y-%m-%d").to_string())
        .join(table.filename())
}

/// Parquet file writer.
pub struct ParquetWriter {
    config: StorageConfig,
}

impl ParquetWriter {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Replace one table partition with `records`.
    pub fn write_partition(
        &self,
        table: TableType,
        day: NaiveDate,
        records: &[ActivityRecord],
    ) -> Result<(), StoreError> {
        let path = table_path(&self.config, table, day);
        self.ensure_dir(&path)?;

        let schema = Arc::new(schemas::activity_schema());
        let batch = to_batch(&schema, records)?;
        self.write_batch(&path, &schema, &batch)?;

        info!("Wrote {} records to {:?}", records.len(), path);
        Ok(())
    }

    /// Write records grouped by table and `created_at` day. Each touched
    /// partition is replaced.
    pub fn write_records(&self, records: &[ActivityRecord]) -> Result<usize, StoreError> {
        let mut partitions: BTreeMap<(TableType, NaiveDate), Vec<ActivityRecord>> = BTreeMap::new();
        for record in records {
            partitions
                .entry((TableType::for_class(record.class()), record.created_at.date_naive()))
                .or_default()
                .push(record.clone());
        }
        for ((table, day), batch) in &partitions {
            self.write_partition(*table, *day, batch)?;
        }
        Ok(partitions.len())
    }

    fn write_batch(
        &self,
        path: &Path,
        schema: &Arc<Schema>,
        batch: &RecordBatch,
    ) -> Result<(), StoreError> {
        let file = File::create(path)?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        writer.write(batch)?;
        writer.close()?;

        Ok(())
    }
}

fn decimal_array(values: Vec<Option<i128>>) -> Result<ArrayRef, StoreError> {
    let array = Decimal128Array::from(values)
        .with_precision_and_scale(AMOUNT_PRECISION, AMOUNT_SCALE as i8)?;
    Ok(Arc::new(array) as ArrayRef)
}

fn to_batch(schema: &Arc<Schema>, records: &[ActivityRecord]) -> Result<RecordBatch, StoreError> {
    let strings = |f: fn(&ActivityRecord) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(records.iter().map(f).collect::<Vec<_>>())) as ArrayRef
    };
    let optional = |f: fn(&ActivityRecord) -> Option<&str>| -> ArrayRef {
        Arc::new(StringArray::from(records.iter().map(f).collect::<Vec<_>>())) as ArrayRef
    };
    let money = |f: fn(&ActivityRecord) -> Option<Decimal>| {
        decimal_array(records.iter().map(|r| f(r).map(to_scaled)).collect())
    };
    let millis = |f: fn(&ActivityRecord) -> DateTime<Utc>| -> ArrayRef {
        Arc::new(TimestampMillisecondArray::from(
            records
                .iter()
                .map(|r| f(r).timestamp_millis())
                .collect::<Vec<_>>(),
        )) as ArrayRef
    };

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            strings(|r| r.id.as_str()),
            strings(|r| r.entity_id.as_str()),
            strings(|r| r.record_type.as_str()),
            money(|r| Some(r.amount))?,
            strings(|r| r.currency.as_str()),
            strings(|r| r.status.as_str()),
            optional(|r| r.game_id.as_deref()),
            optional(|r| r.game_name.as_deref()),
            optional(|r| r.provider.as_deref()),
            optional(|r| r.session_id.as_deref()),
            optional(|r| r.round_id.as_deref()),
            money(|r| r.bet_amount)?,
            money(|r| r.win_amount)?,
            money(|r| r.net_result)?,
            money(|r| Some(r.balance_before))?,
            money(|r| Some(r.balance_after))?,
            strings(|r| r.correlation_key.as_str()),
            millis(|r| r.created_at),
            millis(|r| r.updated_at),
        ],
    )?;
    Ok(batch)
}

// ── Row decoding ────────────────────────────────────────────────

struct Columns<'a> {
    id: &'a StringArray,
    entity_id: &'a StringArray,
    record_type: &'a StringArray,
    amount: &'a Decimal128Array,
    currency: &'a StringArray,
    status: &'a StringArray,
    game_id: &'a StringArray,
    game_name: &'a StringArray,
    provider: &'a StringArray,
    session_id: &'a StringArray,
    round_id: &'a StringArray,
    bet_amount: &'a Decimal128Array,
    win_amount: &'a Decimal128Array,
    net_result: &'a Decimal128Array,
    balance_before: &'a Decimal128Array,
    balance_after: &'a Decimal128Array,
    correlation_key: &'a StringArray,
    created_at: &'a TimestampMillisecondArray,
    updated_at: &'a TimestampMillisecondArray,
}

fn column<'a, A: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a A, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<A>())
        .ok_or_else(|| StoreError::Schema(format!("missing or mistyped column '{}'", name)))
}

impl<'a> Columns<'a> {
    fn from_batch(batch: &'a RecordBatch) -> Result<Self, StoreError> {
        Ok(Self {
            id: column(batch, "id")?,
            entity_id: column(batch, "entity_id")?,
            record_type: column(batch, "record_type")?,
            amount: column(batch, "amount")?,
            currency: column(batch, "currency")?,
            status: column(batch, "status")?,
            game_id: column(batch, "game_id")?,
            game_name: column(batch, "game_name")?,
            provider: column(batch, "provider")?,
            session_id: column(batch, "session_id")?,
            round_id: column(batch, "round_id")?,
            bet_amount: column(batch, "bet_amount")?,
            win_amount: column(batch, "win_amount")?,
            net_result: column(batch, "net_result")?,
            balance_before: column(batch, "balance_before")?,
            balance_after: column(batch, "balance_after")?,
            correlation_key: column(batch, "correlation_key")?,
            created_at: column(batch, "created_at")?,
            updated_at: column(batch, "updated_at")?,
        })
    }

    fn row(&self, i: usize) -> Result<ActivityRecord, String> {
        let required = |arr: &StringArray, name: &str| -> Result<String, String> {
            if arr.is_null(i) {
                Err(format!("null {}", name))
            } else {
                Ok(arr.value(i).to_string())
            }
        };
        let optional = |arr: &StringArray| -> Option<String> {
            Some(arr)
                .filter(|a| !a.is_null(i))
                .map(|a| a.value(i).to_string())
                .filter(|s| !s.is_empty())
        };
        let money = |arr: &Decimal128Array| -> Result<Option<Decimal>, String> {
            if arr.is_null(i) {
                return Ok(None);
            }
            let scale = u32::try_from(arr.scale()).map_err(|_| "negative decimal scale".to_string())?;
            Decimal::try_from_i128_with_scale(arr.value(i), scale)
                .map(Some)
                .map_err(|e| e.to_string())
        };
        let timestamp = |arr: &TimestampMillisecondArray, name: &str| -> Result<DateTime<Utc>, String> {
            if arr.is_null(i) {
                return Err(format!("null {}", name));
            }
            Utc.timestamp_millis_opt(arr.value(i))
                .single()
                .ok_or_else(|| format!("out-of-range {}", name))
        };

        let id = required(self.id, "id")?;
        if id.is_empty() {
            return Err("empty id".to_string());
        }

        Ok(ActivityRecord {
            id,
            entity_id: required(self.entity_id, "entity_id")?,
            record_type: required(self.record_type, "record_type")?.parse()?,
            amount: money(self.amount)?.ok_or("null amount")?,
            currency: required(self.currency, "currency")?,
            status: required(self.status, "status")?.parse()?,
            game_id: optional(self.game_id),
            game_name: optional(self.game_name),
            provider: optional(self.provider),
            session_id: optional(self.session_id),
            round_id: optional(self.round_id),
            bet_amount: money(self.bet_amount)?,
            win_amount: money(self.win_amount)?,
            net_result: money(self.net_result)?,
            balance_before: money(self.balance_before)?.unwrap_or_default(),
            balance_after: money(self.balance_after)?.unwrap_or_default(),
            correlation_key: optional(self.correlation_key).unwrap_or_default(),
            created_at: timestamp(self.created_at, "created_at")?,
            updated_at: timestamp(self.updated_at, "updated_at")?,
        })
    }
}

/// Parquet file reader.
#[derive(Debug, Clone)]
pub struct ParquetReader {
    config: StorageConfig,
}

impl ParquetReader {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn exists(&self, table: TableType, day: NaiveDate) -> bool {
        table_path(&self.config, table, day).exists()
    }

    /// Read all record batches from a Parquet file.
    pub fn read_batches(
        &self,
        table: TableType,
        day: NaiveDate,
    ) -> Result<Vec<RecordBatch>, StoreError> {
        let path = table_path(&self.config, table, day);

        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let batches = reader.collect::<Result<Vec<_>, _>>()?;

        debug!("Read {} batches from {:?}", batches.len(), path);
        Ok(batches)
    }

    /// Decode a partition. Rows that fail to decode are logged and skipped.
    pub fn read_records(
        &self,
        table: TableType,
        day: NaiveDate,
    ) -> Result<Vec<ActivityRecord>, StoreError> {
        let mut records = Vec::new();
        for batch in self.read_batches(table, day)? {
            let columns = Columns::from_batch(&batch)?;
            for i in 0..batch.num_rows() {
                match columns.row(i) {
                    Ok(record) => records.push(record),
                    Err(reason) => {
                        warn!(table = table.filename(), %day, row = i, %reason, "Skipping malformed row")
                    }
                }
            }
        }
        Ok(records)
    }
}

/// Analytical store backed by day-partitioned Parquet tables.
#[derive(Debug, Clone)]
pub struct ParquetAnalyticalStore {
    reader: ParquetReader,
}

impl ParquetAnalyticalStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            reader: ParquetReader::new(config),
        }
    }

    async fn load(
        &self,
        window: &TimeWindow,
        filter: &RecordFilter,
    ) -> Result<Vec<ActivityRecord>, StoreError> {
        let reader = self.reader.clone();
        let days = window.days();
        let tables = TableType::for_filter(filter);

        let rows = tokio::task::spawn_blocking(move || -> Result<Vec<ActivityRecord>, StoreError> {
            let mut rows = Vec::new();
            for day in days {
                for table in &tables {
                    rows.extend(reader.read_records(*table, day)?);
                }
            }
            Ok(rows)
        })
        .await??;

        debug!(
            rows = rows.len(),
            from = %window.from(),
            to = %window.to(),
            "Loaded analytical rows"
        );
        Ok(rows)
    }
}

#[async_trait]
impl AnalyticalStore for ParquetAnalyticalStore {
    async fn query_aggregate(
        &self,
        window: &TimeWindow,
        filter: &RecordFilter,
    ) -> Result<ClassTotals, StoreError> {
        let rows = self.load(window, filter).await?;
        Ok(totals_of(&filter.select(window, rows)))
    }

    async fn query_records(
        &self,
        window: &TimeWindow,
        filter: &RecordFilter,
    ) -> Result<Vec<ActivityRecord>, StoreError> {
        let rows = self.load(window, filter).await?;
        Ok(rows
            .into_iter()
            .filter(|r| filter.matches_row(window, r))
            .collect())
    }

    async fn query_distinct_correlation_keys(
        &self,
        window: &TimeWindow,
        class: RecordClass,
    ) -> Result<HashSet<String>, StoreError> {
        let filter = RecordFilter::new().class(class);
        let rows = self.load(window, &filter).await?;
        Ok(correlation_keys_of(&filter.select(window, rows), class))
    }
}
