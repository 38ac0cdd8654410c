//! Access log queries.
//!
//! Inserts run on a caller-owned connection so ingestion can write a whole
//! batch, plus its occupancy updates, in one transaction.

use gatekeep_core::db::DatabaseError;
use sqlx::SqliteConnection;

use super::GateDatabase;
use super::models::{AccessLog, LogFilter, NewAccessLog};

impl GateDatabase {
    pub async fn insert_access_log(
        conn: &mut SqliteConnection,
        device_id: &str,
        entry: &NewAccessLog,
        received_at: i64,
    ) -> Result<AccessLog, DatabaseError> {
        let log = sqlx::query_as::<_, AccessLog>(
            "INSERT INTO access_logs (card_id, user_id, entry_type, timestamp, device_id, received_at)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(i64::from(entry.card_id))
        .bind(i64::from(entry.user_id))
        .bind(entry.entry_type.as_str())
        .bind(entry.timestamp)
        .bind(device_id)
        .bind(received_at)
        .fetch_one(conn)
        .await?;

        Ok(log)
    }

    /// One page of access logs, newest first, plus the total match count.
    ///
    /// Both reads share a transaction so the total agrees with the page.
    pub async fn list_access_logs(
        &self,
        filter: LogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AccessLog>, i64), DatabaseError> {
        let (clause, key) = match filter {
            LogFilter::All => ("", None),
            LogFilter::User(id) => (" WHERE user_id = ?", Some(i64::from(id))),
            LogFilter::Card(id) => (" WHERE card_id = ?", Some(i64::from(id))),
        };
        let count_sql = format!("SELECT COUNT(*) FROM access_logs{clause}");
        let page_sql = format!(
            "SELECT * FROM access_logs{clause} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?"
        );

        let mut tx = self.pool().begin().await?;

        let mut count = sqlx::query_as::<_, (i64,)>(&count_sql);
        let mut page = sqlx::query_as::<_, AccessLog>(&page_sql);
        if let Some(key) = key {
            count = count.bind(key);
            page = page.bind(key);
        }
        let (total,) = count.fetch_one(&mut *tx).await?;
        let logs = page.bind(limit).bind(offset).fetch_all(&mut *tx).await?;

        tx.commit().await?;
        Ok((logs, total))
    }
}
