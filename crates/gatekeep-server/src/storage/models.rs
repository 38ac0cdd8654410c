//! Data models for Gatekeep storage.

use gatekeep_core::wire::{CommandDto, LogRecord};
use gatekeep_core::{CommandName, CredentialId, EntryType, MacAddress};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub mac_address: String,
    pub last_acknowledged_command_id: Option<i64>,
    pub registered_at: i64,
    pub last_seen: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Command {
    pub id: i64,
    pub device_id: String,
    pub name: String,
    /// JSON document, already validated against `name`.
    pub payload: String,
    pub sent: bool,
    pub created_at: i64,
    pub sent_at: Option<i64>,
}

impl Command {
    /// The wire form of this command; id and delivery state are dropped.
    pub fn to_dto(&self) -> Result<CommandDto, DatabaseError> {
        let name: CommandName = self
            .name
            .parse()
            .map_err(|e| corrupt("commands", self.id, e))?;
        let payload: Value =
            serde_json::from_str(&self.payload).map_err(|e| corrupt("commands", self.id, e))?;
        Ok(CommandDto { name, payload })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccessLog {
    pub id: i64,
    pub card_id: i64,
    pub user_id: i64,
    pub entry_type: String,
    pub timestamp: i64,
    pub device_id: String,
    pub received_at: i64,
}

impl AccessLog {
    pub fn to_record(&self) -> Result<LogRecord, DatabaseError> {
        let id = |v: i64| {
            u32::try_from(v)
                .map(CredentialId)
                .map_err(|e| corrupt("access_logs", self.id, e))
        };
        Ok(LogRecord {
            id: self.id,
            card_id: id(self.card_id)?,
            user_id: id(self.user_id)?,
            entry_type: self
                .entry_type
                .parse::<EntryType>()
                .map_err(|e| corrupt("access_logs", self.id, e))?,
            timestamp: self.timestamp,
            device_id: MacAddress::parse(&self.device_id)
                .map_err(|e| corrupt("access_logs", self.id, e))?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Occupancy {
    pub card_id: i64,
    pub user_id: i64,
    pub is_inside: bool,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub cumulative_secs: i64,
    pub updated_at: i64,
}

/// A command to append to a device queue.
#[derive(Debug, Clone)]
pub struct NewCommand {
    pub name: CommandName,
    pub payload: Value,
}

/// A classified access attempt ready to be stored.
#[derive(Debug, Clone, Copy)]
pub struct NewAccessLog {
    pub card_id: u32,
    pub user_id: u32,
    pub entry_type: EntryType,
    pub timestamp: i64,
}

/// Which access logs a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFilter {
    All,
    User(u32),
    Card(u32),
}

fn corrupt(table: &str, id: impl std::fmt::Display, e: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::Query(format!("corrupt {table} row {id}: {e}"))
}
