use std::{fmt, str::FromStr};

use parity_scale_codec::{Decode, Encode};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::ParseError;

/// 20-byte EVM signer address.
///
/// The derived ordering is plain ascending byte comparison. This is the
/// canonical order of multisig owner lists and, consequently, of aggregated
/// signature lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct EvmAddress([u8; Self::LENGTH]);

impl EvmAddress {
    /// Length of an address in bytes.
    pub const LENGTH: usize = 20;

    /// Wrap raw address bytes.
    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes.
    pub const fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    /// Address bytes as an owned vector, e.g. for use as an operation argument.
    pub fn to_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl FromStr for EvmAddress {
    type Err = ParseError;

    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let payload = address.strip_prefix("0x").unwrap_or(address);
        let bytes = crate::hex_decode(payload)?;
        let bytes: [u8; Self::LENGTH] = bytes
            .try_into()
            .map_err(|_| ParseError(format!("Expected {} bytes of address", Self::LENGTH)))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for EvmAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for EvmAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EvmAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let address = String::deserialize(deserializer)?;
        address.parse().map_err(de::Error::custom)
    }
}
