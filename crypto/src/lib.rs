//! Cryptographic primitives for EVM-style multisig authorization:
//! recoverable secp256k1 signatures, signer-address recovery and content
//! hashing used for account-id and nonce derivation.

mod address;
mod hash;
mod signature;

pub use address::EvmAddress;
pub use hash::{keccak256, sha256, Hash};
pub use signature::{eip191_hash, recover_address, KeyPair, Signature};

/// Error when dealing with cryptographic functions
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum Error {
    /// Failed to produce a signature: {0}
    Signing(String),
    /// Signature verification failed
    BadSignature,
    /// Could not recover a signer address from the signature
    Recovery,
    /// Parsing of a crypto primitive failed
    Parse(#[from] ParseError),
}

/// Error which occurs when parsing crypto primitives from their raw representation
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
#[displaydoc("{0}")]
pub struct ParseError(pub String);

pub(crate) fn hex_decode<T: AsRef<[u8]>>(payload: T) -> Result<Vec<u8>, ParseError> {
    hex::decode(payload).map_err(|err| ParseError(err.to_string()))
}

/// The prelude re-exports most commonly used items.
pub mod prelude {
    pub use super::{EvmAddress, Hash, KeyPair, Signature};
}
