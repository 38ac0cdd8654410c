//! Payload schemas per command name.
//!
//! Numeric fields accept JSON numbers or canonical decimal strings, since the
//! configuration tool submits form values as strings. Unknown fields are
//! rejected.

use std::net::Ipv4Addr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CommandName;
use crate::error::{Error, Result};
use crate::ids::{canonical_uint, canonical_uint_opt};

/// Bits of the `SET_USER_METADATA` flag byte.
pub mod flags {
    pub const ANTI_PASSBACK: u8 = 0x1;
    pub const DEACTIVATED: u8 = 0x2;
    pub const INTERMEDIARY_GATE: u8 = 0x4;
    pub const ALL: u8 = ANTI_PASSBACK | DEACTIVATED | INTERMEDIARY_GATE;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchLogs {}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserMetadata {
    #[serde(deserialize_with = "canonical_uint")]
    pub user_id: u32,
    #[serde(deserialize_with = "canonical_uint")]
    pub card_id: u32,
    #[serde(deserialize_with = "canonical_uint")]
    pub metadata: u8,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Beep {
    /// Tone length in milliseconds.
    #[serde(deserialize_with = "canonical_uint")]
    pub duration: u32,
    #[serde(deserialize_with = "canonical_uint")]
    pub repeat: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RelayMode {
    pub use_both_relays: bool,
    #[serde(deserialize_with = "canonical_uint")]
    pub relay1_default_state: u8,
    #[serde(
        default,
        deserialize_with = "canonical_uint_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub relay2_default_state: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Dhcp {
    pub ip: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub subnet: Ipv4Addr,
    pub dns_server: Ipv4Addr,
}

/// Check `payload` against the schema for `name` and return its normalized
/// form. A missing or `null` payload is treated as `{}`.
pub fn validate_payload(name: CommandName, payload: Option<&Value>) -> Result<Value> {
    let raw = match payload {
        None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
        Some(v) => v.clone(),
    };

    match name {
        CommandName::FetchLogs => normalize::<FetchLogs>(name, raw, |_| Ok(())),
        CommandName::SetUserMetadata => normalize::<UserMetadata>(name, raw, |p| {
            if p.metadata & !flags::ALL != 0 {
                return Err(format!("metadata has unknown flag bits {:#04x}", p.metadata));
            }
            Ok(())
        }),
        CommandName::SetSuccessBeep | CommandName::SetFailBeep => {
            normalize::<Beep>(name, raw, |_| Ok(()))
        }
        CommandName::SetRelayMode => normalize::<RelayMode>(name, raw, check_relay_mode),
        CommandName::SetDhcp => normalize::<Dhcp>(name, raw, |p| {
            let mask = u32::from(p.subnet);
            if mask.leading_ones() + mask.trailing_zeros() != 32 {
                return Err(format!("subnet {} is not a contiguous netmask", p.subnet));
            }
            Ok(())
        }),
    }
}

fn check_relay_mode(p: &RelayMode) -> std::result::Result<(), String> {
    let valid_state = |s: u8| s <= 1;
    if !valid_state(p.relay1_default_state) {
        return Err("relay1DefaultState must be 0 or 1".into());
    }
    match (p.use_both_relays, p.relay2_default_state) {
        (true, Some(s)) if valid_state(s) => Ok(()),
        (true, Some(_)) => Err("relay2DefaultState must be 0 or 1".into()),
        (true, None) => Err("relay2DefaultState is required when useBothRelays is set".into()),
        (false, Some(_)) => Err("relay2DefaultState requires useBothRelays".into()),
        (false, None) => Ok(()),
    }
}

fn normalize<T>(
    name: CommandName,
    raw: Value,
    check: impl FnOnce(&T) -> std::result::Result<(), String>,
) -> Result<Value>
where
    T: DeserializeOwned + Serialize,
{
    let typed: T = serde_json::from_value(raw)
        .map_err(|e| Error::validation(format!("invalid {name} payload: {e}")))?;
    check(&typed).map_err(|e| Error::validation(format!("invalid {name} payload: {e}")))?;
    Ok(serde_json::to_value(&typed)?)
}
