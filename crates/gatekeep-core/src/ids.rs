//! Hardware address and credential identifier types.
//!
//! Devices are keyed by MAC address, normalized to upper-case hex with `:`
//! separators. Card and user ids are unsigned 32-bit integers; on the wire
//! they may arrive either as JSON numbers or, for older firmware and tools,
//! as strings. A string is only accepted when it is a canonical decimal:
//! ASCII digits, no sign, no whitespace, and no leading zero unless the
//! value is exactly `"0"`. Anything else is rejected rather than coerced.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::Error;

static MAC_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^(?:[0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$|^(?:[0-9A-Fa-f]{2}-){5}[0-9A-Fa-f]{2}$")
        .unwrap()
});

/// A validated, normalized device hardware address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Parse and normalize a hardware address (`aa-bb-..` becomes `AA:BB:..`).
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let trimmed = raw.trim();
        if !MAC_RE.is_match(trimmed) {
            return Err(Error::validation(format!(
                "invalid MAC address {raw:?}: expected six hex octets separated by ':' or '-'"
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase().replace('-', ":")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MacAddress {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MacAddress> for String {
    fn from(value: MacAddress) -> Self {
        value.0
    }
}

/// Card or user identifier reported by a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CredentialId(pub u32);

impl CredentialId {
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for CredentialId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl FromStr for CredentialId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_canonical_decimal(s)
            .and_then(|v| u32::try_from(v).ok())
            .map(Self)
            .ok_or_else(|| {
                Error::validation(format!("{s:?} is not a canonical unsigned 32-bit integer"))
            })
    }
}

impl<'de> Deserialize<'de> for CredentialId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        canonical_uint::<D, u32>(deserializer).map(Self)
    }
}

/// Parse a canonical decimal string into a `u64`.
pub fn parse_canonical_decimal(s: &str) -> Option<u64> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    s.parse().ok()
}

/// `deserialize_with` helper: an unsigned integer given as a JSON number or
/// a canonical decimal string, range-checked into `T`.
pub fn canonical_uint<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    deserializer.deserialize_any(CanonicalUint(PhantomData))
}

/// Optional variant of [`canonical_uint`]; pair with `#[serde(default)]`.
pub fn canonical_uint_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    Option::<Canonical<T>>::deserialize(deserializer).map(|v| v.map(|c| c.0))
}

struct Canonical<T>(T);

impl<'de, T: TryFrom<u64>> Deserialize<'de> for Canonical<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        canonical_uint(deserializer).map(Self)
    }
}

struct CanonicalUint<T>(PhantomData<T>);

impl<T: TryFrom<u64>> Visitor<'_> for CanonicalUint<T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an unsigned integer or a canonical decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<T, E> {
        T::try_from(v).map_err(|_| E::custom(format!("integer {v} is out of range")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<T, E> {
        let v = u64::try_from(v).map_err(|_| E::custom(format!("integer {v} is negative")))?;
        self.visit_u64(v)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
        let n = parse_canonical_decimal(v)
            .ok_or_else(|| E::custom(format!("{v:?} is not a canonical decimal integer")))?;
        self.visit_u64(n)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn mac_is_normalized() {
        let mac = MacAddress::parse("aa-bb-cc-0d-ee-ff").unwrap();
        assert_eq!(mac.as_str(), "AA:BB:CC:0D:EE:FF");
        assert_eq!(MacAddress::parse("AA:BB:CC:0D:EE:FF").unwrap(), mac);
    }

    #[test]
    fn mac_rejects_mixed_separators_and_garbage() {
        assert!(MacAddress::parse("AA:BB-CC:DD:EE:FF").is_err());
        assert!(MacAddress::parse("AA:BB:CC:DD:EE").is_err());
        assert!(MacAddress::parse("GG:BB:CC:DD:EE:FF").is_err());
        assert!(MacAddress::parse("").is_err());
    }

    #[test]
    fn credential_accepts_numbers_and_canonical_strings() {
        let a: CredentialId = serde_json::from_str("42").unwrap();
        let b: CredentialId = serde_json::from_str("\"42\"").unwrap();
        let zero: CredentialId = serde_json::from_str("\"0\"").unwrap();
        assert_eq!(a, CredentialId(42));
        assert_eq!(a, b);
        assert_eq!(zero, CredentialId(0));
    }

    #[test]
    fn credential_rejects_ambiguous_input() {
        for bad in [
            "\"042\"", "\" 42\"", "\"+42\"", "\"-1\"", "\"4.2\"", "\"\"", "-1", "4.5", "true",
            "4294967296",
        ] {
            assert!(
                serde_json::from_str::<CredentialId>(bad).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn credential_from_query_string() {
        assert_eq!("7".parse::<CredentialId>().unwrap(), CredentialId(7));
        assert!("07".parse::<CredentialId>().is_err());
        assert!("abc".parse::<CredentialId>().is_err());
    }
}
