//! Occupancy queries.

use gatekeep_core::db::DatabaseError;
use sqlx::SqliteConnection;

use super::GateDatabase;
use super::models::Occupancy;

impl GateDatabase {
    pub async fn get_occupancy(&self, card_id: u32) -> Result<Option<Occupancy>, DatabaseError> {
        let mut conn = self.pool().acquire().await?;
        Self::load_occupancy(&mut conn, card_id).await
    }

    pub async fn load_occupancy(
        conn: &mut SqliteConnection,
        card_id: u32,
    ) -> Result<Option<Occupancy>, DatabaseError> {
        let row = sqlx::query_as::<_, Occupancy>("SELECT * FROM occupancy WHERE card_id = ?")
            .bind(i64::from(card_id))
            .fetch_optional(conn)
            .await?;

        Ok(row)
    }

    /// Take the write lock on an occupancy row before reading it.
    ///
    /// `SQLite` refuses to upgrade a read transaction to a write one under
    /// contention, so read-modify-write paths must write first. Returns
    /// whether the row exists.
    pub async fn lock_occupancy(
        conn: &mut SqliteConnection,
        card_id: u32,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE occupancy SET updated_at = updated_at WHERE card_id = ?")
            .bind(i64::from(card_id))
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn store_occupancy(
        conn: &mut SqliteConnection,
        row: &Occupancy,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO occupancy (card_id, user_id, is_inside, start_time, end_time, cumulative_secs, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(card_id) DO UPDATE SET
                user_id = excluded.user_id,
                is_inside = excluded.is_inside,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                cumulative_secs = excluded.cumulative_secs,
                updated_at = excluded.updated_at",
        )
        .bind(row.card_id)
        .bind(row.user_id)
        .bind(row.is_inside)
        .bind(row.start_time)
        .bind(row.end_time)
        .bind(row.cumulative_secs)
        .bind(row.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }
}
