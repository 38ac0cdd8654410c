//! Command catalog for access-control terminals.
//!
//! Command names are part of the terminal wire protocol: existing names are
//! never renamed or removed, only new ones appended. Each name has a payload
//! schema checked before a command is queued (see [`payload`]).

pub mod payload;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub use payload::validate_payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandName {
    /// Ask the terminal to upload its buffered access logs.
    FetchLogs,
    SetUserMetadata,
    SetSuccessBeep,
    SetFailBeep,
    SetRelayMode,
    SetDhcp,
}

impl CommandName {
    pub const ALL: [Self; 6] = [
        Self::FetchLogs,
        Self::SetUserMetadata,
        Self::SetSuccessBeep,
        Self::SetFailBeep,
        Self::SetRelayMode,
        Self::SetDhcp,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FetchLogs => "FETCH_LOGS",
            Self::SetUserMetadata => "SET_USER_METADATA",
            Self::SetSuccessBeep => "SET_SUCCESS_BEEP",
            Self::SetFailBeep => "SET_FAIL_BEEP",
            Self::SetRelayMode => "SET_RELAY_MODE",
            Self::SetDhcp => "SET_DHCP",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown command {s:?}")))
    }
}
