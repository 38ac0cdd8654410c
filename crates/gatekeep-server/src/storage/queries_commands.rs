//! Command queue queries.

use gatekeep_core::db::{DatabaseError, unix_timestamp};
use sqlx::{QueryBuilder, Sqlite};

use super::GateDatabase;

/// Ids bound per `UPDATE`. `SQLite` caps bound parameters per statement.
const MARK_SENT_CHUNK: usize = 500;
use super::models::{Command, NewCommand};

impl GateDatabase {
    /// Append commands to a device queue in one transaction. Returns the
    /// assigned ids in input order.
    pub async fn insert_commands(
        &self,
        device_id: &str,
        commands: &[NewCommand],
    ) -> Result<Vec<i64>, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;
        let mut ids = Vec::with_capacity(commands.len());

        for command in commands {
            let result = sqlx::query(
                "INSERT INTO commands (device_id, name, payload, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(device_id)
            .bind(command.name.as_str())
            .bind(command.payload.to_string())
            .bind(now)
            .execute(&mut *tx)
            .await?;
            ids.push(result.last_insert_rowid());
        }

        tx.commit().await?;
        Ok(ids)
    }

    pub async fn get_command(&self, id: i64) -> Result<Command, DatabaseError> {
        sqlx::query_as::<_, Command>("SELECT * FROM commands WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Command {id}")))
    }

    /// Unsent commands for a device, oldest first.
    pub async fn pending_commands(&self, device_id: &str) -> Result<Vec<Command>, DatabaseError> {
        let commands = sqlx::query_as::<_, Command>(
            "SELECT * FROM commands WHERE device_id = ? AND sent = 0 ORDER BY id ASC",
        )
        .bind(device_id)
        .fetch_all(self.pool())
        .await?;

        Ok(commands)
    }

    /// The oldest `limit` unsent commands for a device.
    pub async fn next_pending_commands(
        &self,
        device_id: &str,
        limit: u32,
    ) -> Result<Vec<Command>, DatabaseError> {
        let commands = sqlx::query_as::<_, Command>(
            "SELECT * FROM commands WHERE device_id = ? AND sent = 0 ORDER BY id ASC LIMIT ?",
        )
        .bind(device_id)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await?;

        Ok(commands)
    }

    pub async fn count_pending_commands(&self, device_id: &str) -> Result<i64, DatabaseError> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM commands WHERE device_id = ? AND sent = 0")
                .bind(device_id)
                .fetch_one(self.pool())
                .await?;

        Ok(row.0)
    }

    /// Flip `sent` for the given ids, skipping rows that are already sent.
    ///
    /// Returns the ids this call transitioned, ascending. Two callers racing
    /// on the same ids never both get the same id back.
    pub async fn mark_commands_sent(&self, ids: &[i64]) -> Result<Vec<i64>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;
        let mut won: Vec<i64> = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(MARK_SENT_CHUNK) {
            let mut builder =
                QueryBuilder::<Sqlite>::new("UPDATE commands SET sent = 1, sent_at = ");
            builder.push_bind(now);
            builder.push(" WHERE sent = 0 AND id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(") RETURNING id");

            let rows: Vec<(i64,)> = builder.build_query_as().fetch_all(&mut *tx).await?;
            won.extend(rows.into_iter().map(|(id,)| id));
        }

        tx.commit().await?;
        won.sort_unstable();
        won.dedup();
        Ok(won)
    }
}
