//! JSON bodies exchanged over the device and operator HTTP APIs.
//!
//! Field names are camelCase on the wire to match terminal firmware.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::commands::CommandName;
use crate::entry::EntryType;
use crate::ids::{CredentialId, MacAddress};

/// A command as delivered to a terminal. Internal ids and delivery state
/// are never exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDto {
    pub name: CommandName,
    pub payload: Value,
}

impl CommandDto {
    /// The log-pull instruction appended to every poll response.
    pub fn fetch_logs() -> Self {
        Self {
            name: CommandName::FetchLogs,
            payload: Value::Object(serde_json::Map::new()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub mac_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub jwt_token: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntp_server: Option<String>,
    /// Poll period in milliseconds.
    pub polling_interval: u64,
    pub queue_size: u32,
    pub initial_commands: Vec<CommandDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub jwt_token: String,
    pub expires_in: i64,
}

/// One access attempt as reported by a terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryInput {
    pub card_id: CredentialId,
    pub user_id: CredentialId,
    /// Raw entry type code, classified server side.
    pub attempt: i64,
    /// Seconds since the Unix epoch, device clock.
    pub timestamp: i64,
}

/// A persisted access attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: i64,
    pub card_id: CredentialId,
    pub user_id: CredentialId,
    pub entry_type: EntryType,
    pub timestamp: i64,
    pub device_id: MacAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedCommand {
    pub name: CommandName,
    #[serde(default)]
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueCommandsRequest {
    pub mac_address: String,
    pub commands: Vec<QueuedCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueCommandsResponse {
    pub queued: usize,
    /// Ids assigned to the queued commands, in request order.
    pub command_ids: Vec<i64>,
}

/// One page of a newest-first listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub last_acknowledged_command_id: Option<i64>,
    pub last_sent_command_id: Option<i64>,
    pub pending: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub mac_address: MacAddress,
    pub registered_at: i64,
    pub last_seen: i64,
    pub sync: SyncStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyView {
    pub card_id: CredentialId,
    pub user_id: CredentialId,
    pub is_inside_workplace: bool,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    /// Accumulated seconds spent inside.
    pub cumulative_time_in_office: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
