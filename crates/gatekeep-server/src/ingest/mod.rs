//! Access log ingestion and queries.
//!
//! A batch from a terminal is classified up front and stored all-or-nothing:
//! one bad entry rejects the whole batch and nothing is written. Allowed
//! entries update occupancy in the same transaction as the log rows.

pub mod occupancy;
pub mod pagination;

use gatekeep_core::db::unix_timestamp;
use gatekeep_core::wire::{LogEntryInput, LogRecord, Page};
use gatekeep_core::{EntryType, MacAddress};
use tracing::info;

use crate::error::GateError;
use crate::storage::{GateDatabase, LogFilter, NewAccessLog};

pub use occupancy::{OccupancyEngine, OccupancyState};
pub use pagination::PageRequest;

#[derive(Clone)]
pub struct LogIngestor {
    db: GateDatabase,
}

impl LogIngestor {
    pub const fn new(db: GateDatabase) -> Self {
        Self { db }
    }

    /// Store a batch reported by `mac`, in the order given.
    pub async fn ingest(
        &self,
        mac: &MacAddress,
        batch: &[LogEntryInput],
    ) -> Result<Vec<LogRecord>, GateError> {
        self.db.get_device(mac.as_str()).await?;
        let entries = classify(batch)?;
        self.db.touch_device(mac.as_str()).await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let now = unix_timestamp();
        let mut tx = self.db.pool().begin().await?;
        let mut records = Vec::with_capacity(entries.len());

        for entry in &entries {
            // The insert takes the write lock before occupancy is read.
            let log = GateDatabase::insert_access_log(&mut tx, mac.as_str(), entry, now).await?;
            if entry.entry_type.grants_entry() {
                occupancy::record_entry(&mut tx, entry.card_id, entry.user_id, now).await?;
            }
            records.push(log.to_record()?);
        }

        tx.commit().await?;

        info!(mac = %mac, count = records.len(), "Access logs ingested");
        Ok(records)
    }

    pub async fn list(
        &self,
        filter: LogFilter,
        page: PageRequest,
    ) -> Result<Page<LogRecord>, GateError> {
        let (rows, total) = self
            .db
            .list_access_logs(filter, i64::from(page.limit()), page.offset())
            .await?;
        let data = rows
            .iter()
            .map(|row| row.to_record().map_err(GateError::from))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            data,
            total,
            page: page.page(),
            limit: page.limit(),
        })
    }
}

/// Classify every entry, failing on the first invalid one.
fn classify(batch: &[LogEntryInput]) -> Result<Vec<NewAccessLog>, GateError> {
    batch
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let entry_type = EntryType::try_from(entry.attempt)
                .map_err(|e| GateError::Validation(format!("log entry {index}: {e}")))?;
            if entry.timestamp < 0 {
                return Err(GateError::Validation(format!(
                    "log entry {index}: timestamp must not be negative"
                )));
            }
            Ok(NewAccessLog {
                card_id: entry.card_id.get(),
                user_id: entry.user_id.get(),
                entry_type,
                timestamp: entry.timestamp,
            })
        })
        .collect()
}
