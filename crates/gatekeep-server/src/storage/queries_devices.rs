//! Device queries.

use gatekeep_core::db::{DatabaseError, unix_timestamp};

use super::GateDatabase;
use super::models::Device;

impl GateDatabase {
    /// Insert a new device row. A second insert for the same address fails
    /// with `DatabaseError::Conflict`.
    pub async fn create_device(&self, mac_address: &str) -> Result<Device, DatabaseError> {
        let now = unix_timestamp();

        let device = sqlx::query_as::<_, Device>(
            "INSERT INTO devices (mac_address, registered_at, last_seen) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(mac_address)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool())
        .await?;

        Ok(device)
    }

    pub async fn get_device(&self, mac_address: &str) -> Result<Device, DatabaseError> {
        sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE mac_address = ?")
            .bind(mac_address)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Device {mac_address}")))
    }

    /// Record that the device just talked to us.
    pub async fn touch_device(&self, mac_address: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE devices SET last_seen = ? WHERE mac_address = ?")
            .bind(unix_timestamp())
            .bind(mac_address)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Raise the acknowledged command id. Never moves it backwards; returns
    /// whether the stored value changed.
    pub async fn advance_acknowledged_command(
        &self,
        mac_address: &str,
        command_id: i64,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE devices SET last_acknowledged_command_id = ?
             WHERE mac_address = ?
               AND (last_acknowledged_command_id IS NULL OR last_acknowledged_command_id < ?)",
        )
        .bind(command_id)
        .bind(mac_address)
        .bind(command_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Highest command id already delivered to the device.
    pub async fn last_sent_command_id(
        &self,
        mac_address: &str,
    ) -> Result<Option<i64>, DatabaseError> {
        let row: (Option<i64>,) =
            sqlx::query_as("SELECT MAX(id) FROM commands WHERE device_id = ? AND sent = 1")
                .bind(mac_address)
                .fetch_one(self.pool())
                .await?;

        Ok(row.0)
    }
}
