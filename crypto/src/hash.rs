//! Content hashing. Sha256 is the ledger-side digest used for account-id
//! and nonce derivation; keccak256 is the EVM digest used for addresses and
//! signed-message envelopes.

use std::fmt;

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use crate::ParseError;

/// Sha256 digest of some content, e.g. a sorted signer set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Hash(#[serde(with = "hex_array")] [u8; Self::LENGTH]);

impl Hash {
    /// Length of the digest in bytes.
    pub const LENGTH: usize = 32;

    /// Wrap a raw digest.
    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub const fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    /// Digest bytes as an owned vector.
    pub fn to_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Parse a digest from its hex representation.
    ///
    /// # Errors
    /// If the input is not exactly 32 hex-encoded bytes.
    pub fn from_hex(payload: impl AsRef<str>) -> Result<Self, ParseError> {
        let bytes = crate::hex_decode(payload.as_ref())?;
        let bytes: [u8; Self::LENGTH] = bytes
            .try_into()
            .map_err(|_| ParseError(format!("Expected {} bytes of hash", Self::LENGTH)))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Compute the sha256 digest of `payload`.
pub fn sha256(payload: impl AsRef<[u8]>) -> Hash {
    let digest = sha2::Sha256::digest(payload.as_ref());
    Hash(digest.into())
}

/// Compute the keccak256 digest of `payload`.
pub fn keccak256(payload: impl AsRef<[u8]>) -> [u8; Hash::LENGTH] {
    sha3::Keccak256::digest(payload.as_ref()).into()
}

mod hex_array {
    use serde::{Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let payload = String::deserialize(deserializer)?;
        let bytes = hex::decode(payload).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes of hash"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        let hash = sha256(b"abc");
        assert_eq!(
            hash.to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn keccak256_known_vector() {
        // Empty-input digest, as used all over the EVM ecosystem.
        assert_eq!(
            hex::encode(keccak256([])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn hash_hex_round_trip() {
        let hash = sha256(b"syndic");
        let parsed = Hash::from_hex(hash.to_string()).unwrap();
        assert_eq!(hash, parsed);
    }
}
