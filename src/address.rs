use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use std::{
    fmt,
    str::FromStr,
};

/// A 20-byte account or contract address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address {0} is not 40 hex characters")]
    Length(String),
    #[error("address {0} is not valid hex")]
    Hex(String),
}

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// `0x1234...abcd`, the form shown next to "Connected Account".
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != 40 {
            return Err(AddressError::Length(trimmed.to_string()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| AddressError::Hex(trimmed.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn from_str__accepts_mixed_case_with_prefix() {
        // given
        let raw = "0x5ACD86cdbf49cb5551a4790fdbce14d1ec78c16d";

        // when
        let address: Address = raw.parse().unwrap();

        // then
        assert_eq!(
            "0x5acd86cdbf49cb5551a4790fdbce14d1ec78c16d",
            address.to_string()
        );
    }

    #[test]
    fn from_str__rejects_wrong_length_and_bad_hex() {
        assert!(matches!(
            "0x1234".parse::<Address>(),
            Err(AddressError::Length(_))
        ));
        assert!(matches!(
            "0xzzcd86cdbf49cb5551a4790fdbce14d1ec78c16d".parse::<Address>(),
            Err(AddressError::Hex(_))
        ));
    }

    #[test]
    fn short__keeps_prefix_and_last_four() {
        let address: Address = "0x5acd86cdbf49cb5551a4790fdbce14d1ec78c16d"
            .parse()
            .unwrap();
        assert_eq!("0x5acd...c16d", address.short());
    }
}
