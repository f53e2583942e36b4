//! Warehouse partitions and transaction records
//!
//! A partition is one warehouse's transaction log: one CSV record per line,
//! `name, unit_price, quantity, kind`. Malformed rows are logged and
//! skipped (zero-effect) rather than crashing the worker that owns them.

use crate::error::{Result, TallyError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Direction of a transaction record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Input,
    Output,
}

impl RecordKind {
    /// Kinds match on prefix, so `input_2024` still counts as an input.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.starts_with("input") {
            Some(RecordKind::Input)
        } else if raw.starts_with("output") {
            Some(RecordKind::Output)
        } else {
            None
        }
    }
}

/// One immutable transaction row belonging to exactly one partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub product: String,
    pub unit_price: f64,
    pub quantity: f64,
    pub kind: RecordKind,
}

/// Identity of one warehouse partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionHandle {
    /// Display name, derived from the file stem
    pub name: String,
    pub path: PathBuf,
}

/// Discover warehouse partitions: every `*.csv` file in the stores
/// directory, sorted by name for deterministic run order.
pub fn discover_partitions(dir: &Path) -> Result<Vec<PartitionHandle>> {
    let mut partitions = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("warehouse")
            .to_string();
        partitions.push(PartitionHandle { name, path });
    }
    partitions.sort_by(|a, b| a.name.cmp(&b.name));

    if partitions.is_empty() {
        return Err(TallyError::NoPartitions {
            path: dir.to_path_buf(),
        });
    }

    debug!(partitions = partitions.len(), dir = %dir.display(), "discovered warehouse partitions");
    Ok(partitions)
}

/// Source of one partition's ordered transaction records.
///
/// The computation core never touches storage directly; workers go through
/// this seam so tests can feed records from memory.
#[async_trait]
pub trait PartitionSource: Send + Sync {
    async fn load(&self, partition: &PartitionHandle) -> Result<Vec<TransactionRecord>>;
}

/// Reads partition records from the CSV file named by the handle.
pub struct CsvPartitionSource;

#[async_trait]
impl PartitionSource for CsvPartitionSource {
    async fn load(&self, partition: &PartitionHandle) -> Result<Vec<TransactionRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&partition.path)
            .map_err(|e| TallyError::PartitionLoad {
                partition: partition.name.clone(),
                source: Box::new(e),
            })?;

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let raw = result.map_err(|e| TallyError::PartitionLoad {
                partition: partition.name.clone(),
                source: Box::new(e),
            })?;
            match parse_record(&raw) {
                Some(record) => records.push(record),
                None => {
                    warn!(
                        partition = %partition.name,
                        row = row + 1,
                        record = ?raw,
                        "malformed transaction record, treating as zero-effect"
                    );
                }
            }
        }

        debug!(partition = %partition.name, records = records.len(), "loaded partition records");
        Ok(records)
    }
}

fn parse_record(raw: &csv::StringRecord) -> Option<TransactionRecord> {
    let product = raw.get(0)?.trim();
    if product.is_empty() {
        return None;
    }
    let unit_price: f64 = raw.get(1)?.parse().ok()?;
    let quantity: f64 = raw.get(2)?.parse().ok()?;
    let kind = RecordKind::parse(raw.get(3)?)?;
    Some(TransactionRecord {
        product: product.to_string(),
        unit_price,
        quantity,
        kind,
    })
}

/// In-memory partition source keyed by partition name.
///
/// Lets callers run a computation without touching the filesystem.
#[derive(Debug, Default)]
pub struct StaticPartitionSource {
    partitions: HashMap<String, Vec<TransactionRecord>>,
}

impl StaticPartitionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partition(
        mut self,
        name: impl Into<String>,
        records: Vec<TransactionRecord>,
    ) -> Self {
        self.partitions.insert(name.into(), records);
        self
    }
}

#[async_trait]
impl PartitionSource for StaticPartitionSource {
    async fn load(&self, partition: &PartitionHandle) -> Result<Vec<TransactionRecord>> {
        self.partitions
            .get(&partition.name)
            .cloned()
            .ok_or_else(|| TallyError::PartitionLoad {
                partition: partition.name.clone(),
                source: "no such partition".into(),
            })
    }
}
