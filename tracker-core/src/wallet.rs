//! Wallet addresses

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TrackerError;

/// An EVM wallet address (`0x` followed by 40 hex characters)
///
/// The address keeps the casing it was entered with, since that is what the
/// REST path is built from. Comparisons ignore case, and channel names always
/// use the lower-cased form so subscribe and match agree with what the
/// server echoes.
#[derive(Clone)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and validate an address
    pub fn parse(input: &str) -> Result<Self, TrackerError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TrackerError::invalid_address("Address is required"));
        }

        let hex = trimmed
            .strip_prefix("0x")
            .ok_or_else(|| TrackerError::invalid_address(format!("{} must start with 0x", trimmed)))?;

        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TrackerError::invalid_address(format!(
                "{} is not a 20-byte hex address",
                trimmed
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// The address as entered
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased form used in channel names
    pub fn normalized(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// Shortened form for display, e.g. `0x1234...abcd`
    pub fn short(&self) -> String {
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl PartialEq for WalletAddress {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for WalletAddress {}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletAddress({})", self.0)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
