//! Command queue manager.

use gatekeep_core::wire::QueuedCommand;
use gatekeep_core::{CommandName, MacAddress, validate_payload};
use serde_json::Value;
use tracing::info;

use crate::error::GateError;
use crate::storage::{Command, DatabaseError, GateDatabase, NewCommand};

/// Validates and stores commands for known devices.
#[derive(Clone)]
pub struct CommandQueue {
    db: GateDatabase,
}

impl CommandQueue {
    pub const fn new(db: GateDatabase) -> Self {
        Self { db }
    }

    /// Queue a single command.
    pub async fn enqueue(
        &self,
        mac: &MacAddress,
        name: CommandName,
        payload: Option<&Value>,
    ) -> Result<Command, QueueError> {
        let ids = self
            .enqueue_batch(
                mac,
                &[QueuedCommand {
                    name,
                    payload: payload.cloned(),
                }],
            )
            .await?;
        let id = ids
            .first()
            .copied()
            .ok_or_else(|| QueueError::Storage("insert returned no id".into()))?;
        self.db
            .get_command(id)
            .await
            .map_err(|e| QueueError::Storage(e.to_string()))
    }

    /// Queue several commands; either all are stored or none.
    ///
    /// Every payload is checked before anything is written. Returns the new
    /// ids in request order.
    pub async fn enqueue_batch(
        &self,
        mac: &MacAddress,
        commands: &[QueuedCommand],
    ) -> Result<Vec<i64>, QueueError> {
        self.db.get_device(mac.as_str()).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => QueueError::DeviceNotFound(mac.to_string()),
            other => QueueError::Storage(other.to_string()),
        })?;

        let validated = commands
            .iter()
            .enumerate()
            .map(|(index, cmd)| {
                validate_payload(cmd.name, cmd.payload.as_ref())
                    .map(|payload| NewCommand {
                        name: cmd.name,
                        payload,
                    })
                    .map_err(|e| QueueError::InvalidPayload { index, reason: e.to_string() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ids = self
            .db
            .insert_commands(mac.as_str(), &validated)
            .await
            .map_err(|e| QueueError::Storage(e.to_string()))?;

        info!(mac = %mac, count = ids.len(), "Commands queued");
        Ok(ids)
    }

    /// Unsent commands for the device, oldest first.
    pub async fn pending_for(&self, mac: &MacAddress) -> Result<Vec<Command>, QueueError> {
        self.db
            .pending_commands(mac.as_str())
            .await
            .map_err(|e| QueueError::Storage(e.to_string()))
    }

    /// The oldest `limit` unsent commands for the device.
    pub async fn next_batch(
        &self,
        mac: &MacAddress,
        limit: u32,
    ) -> Result<Vec<Command>, QueueError> {
        self.db
            .next_pending_commands(mac.as_str(), limit)
            .await
            .map_err(|e| QueueError::Storage(e.to_string()))
    }

    /// Mark commands sent. Returns how many were transitioned by this call;
    /// already-sent ids are skipped, so repeating a call returns 0.
    pub async fn mark_sent(&self, ids: &[i64]) -> Result<usize, QueueError> {
        Ok(self.claim(ids).await?.len())
    }

    /// Like [`Self::mark_sent`], but returns the ids this call won.
    pub async fn claim(&self, ids: &[i64]) -> Result<Vec<i64>, QueueError> {
        self.db
            .mark_commands_sent(ids)
            .await
            .map_err(|e| QueueError::Storage(e.to_string()))
    }
}

/// Command queue errors.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Device {0} not found")]
    DeviceNotFound(String),

    #[error("Command {index}: {reason}")]
    InvalidPayload { index: usize, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<QueueError> for GateError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::DeviceNotFound(_) => Self::NotFound(e.to_string()),
            QueueError::InvalidPayload { .. } => Self::Validation(e.to_string()),
            QueueError::Storage(msg) => Self::Storage(msg),
        }
    }
}
