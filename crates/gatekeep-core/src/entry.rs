//! Classified outcome of a badge-scan attempt.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Entry type reported by a terminal. The numeric codes are fixed by the
/// terminal firmware and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    EntryAllowed,
    IntermediaryAccess,
    /// Badge re-used before the prior exit.
    AntiPassback,
    /// Unknown credential.
    NotRegistered,
    /// Known but disabled credential.
    DeactivatedCard,
}

impl EntryType {
    pub const ALL: [Self; 5] = [
        Self::EntryAllowed,
        Self::IntermediaryAccess,
        Self::AntiPassback,
        Self::NotRegistered,
        Self::DeactivatedCard,
    ];

    pub const fn code(self) -> u8 {
        match self {
            Self::EntryAllowed => 0,
            Self::IntermediaryAccess => 1,
            Self::AntiPassback => 2,
            Self::NotRegistered => 3,
            Self::DeactivatedCard => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EntryAllowed => "ENTRY_ALLOWED",
            Self::IntermediaryAccess => "INTERMEDIARY_ACCESS",
            Self::AntiPassback => "ANTI_PASSBACK",
            Self::NotRegistered => "NOT_REGISTERED",
            Self::DeactivatedCard => "DEACTIVATED_CARD",
        }
    }

    /// Whether this outcome moves the card holder inside.
    pub const fn grants_entry(self) -> bool {
        matches!(self, Self::EntryAllowed)
    }
}

impl TryFrom<i64> for EntryType {
    type Error = Error;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|t| i64::from(t.code()) == code)
            .ok_or_else(|| Error::validation(format!("invalid entry type code {code}")))
    }
}

impl FromStr for EntryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown entry type {s:?}")))
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_in_both_directions() {
        for t in EntryType::ALL {
            assert_eq!(EntryType::try_from(i64::from(t.code())).unwrap(), t);
            assert_eq!(t.as_str().parse::<EntryType>().unwrap(), t);
        }
    }

    #[test]
    fn out_of_range_codes_are_rejected() {
        assert!(EntryType::try_from(5).is_err());
        assert!(EntryType::try_from(-1).is_err());
    }

    #[test]
    fn only_entry_allowed_grants_entry() {
        let granting: Vec<_> = EntryType::ALL.into_iter().filter(|t| t.grants_entry()).collect();
        assert_eq!(granting, vec![EntryType::EntryAllowed]);
    }

    #[test]
    fn serializes_as_wire_name() {
        let json = serde_json::to_string(&EntryType::AntiPassback).unwrap();
        assert_eq!(json, "\"ANTI_PASSBACK\"");
    }
}
