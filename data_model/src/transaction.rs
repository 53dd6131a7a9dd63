//! The transaction envelope submitted to the ledger and the off-chain
//! transaction record whose lifecycle the backend drives.

use std::{fmt, str::FromStr};

use derive_more::Display;
use parity_scale_codec::{Decode, Encode};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use syndic_crypto::{ParseError, Signature};

use crate::{account::Signer, operation::Operation};

/// Id of the blockchain the envelope is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub struct BlockchainRid([u8; Self::LENGTH]);

impl BlockchainRid {
    /// Length of a blockchain rid in bytes.
    pub const LENGTH: usize = 32;

    /// Wrap raw rid bytes.
    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw rid bytes.
    pub const fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }
}

impl FromStr for BlockchainRid {
    type Err = ParseError;

    fn from_str(payload: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(payload).map_err(|err| ParseError(err.to_string()))?;
        let bytes: [u8; Self::LENGTH] = bytes.try_into().map_err(|_| {
            ParseError(format!("Expected {} bytes of blockchain rid", Self::LENGTH))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for BlockchainRid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

impl AsRef<[u8]> for BlockchainRid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for BlockchainRid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BlockchainRid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let payload = String::deserialize(deserializer)?;
        payload.parse().map_err(de::Error::custom)
    }
}

/// Error of decoding a transaction envelope from its transport encoding.
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum EnvelopeError {
    /// Envelope is not valid hex: {0}
    Hex(String),
    /// Envelope bytes failed to decode: {0}
    Codec(String),
}

/// The serialized structure submitted to the ledger: ordered operations plus
/// native signer and signature lists (empty for EVM-authorized envelopes,
/// where authorization travels inside the operations).
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct TxEnvelope {
    /// Blockchain the envelope is bound to.
    pub blockchain_rid: BlockchainRid,
    /// Ordered operations.
    pub operations: Vec<Operation>,
    /// Native signer public keys.
    pub signers: Vec<Vec<u8>>,
    /// Native signatures matching `signers`.
    pub signatures: Vec<Vec<u8>>,
}

impl TxEnvelope {
    /// Envelope over `operations` with empty native signer lists.
    pub fn new(blockchain_rid: BlockchainRid, operations: Vec<Operation>) -> Self {
        Self {
            blockchain_rid,
            operations,
            signers: Vec::new(),
            signatures: Vec::new(),
        }
    }

    /// Wire encoding of the envelope.
    pub fn encode_to_bytes(&self) -> Vec<u8> {
        self.encode()
    }

    /// Decode an envelope from its wire encoding.
    ///
    /// # Errors
    /// Fails if the bytes are not a valid envelope.
    pub fn decode_from_bytes(mut payload: &[u8]) -> Result<Self, EnvelopeError> {
        Self::decode(&mut payload).map_err(|err| EnvelopeError::Codec(err.to_string()))
    }

    /// Transportable hex encoding, as persisted by the backend.
    pub fn to_hex(&self) -> String {
        hex::encode(self.encode_to_bytes())
    }

    /// Decode an envelope from its transportable hex encoding.
    ///
    /// # Errors
    /// Fails if the payload is not hex or not a valid envelope.
    pub fn from_hex(payload: impl AsRef<str>) -> Result<Self, EnvelopeError> {
        let bytes =
            hex::decode(payload.as_ref()).map_err(|err| EnvelopeError::Hex(err.to_string()))?;
        Self::decode_from_bytes(&bytes)
    }
}

/// Kind of multisig transaction tracked by the backend.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionType {
    /// Register a new multisig account.
    #[display(fmt = "register")]
    Register,
    /// Transfer an asset out of the account.
    #[display(fmt = "transferFund")]
    TransferFund,
    /// Update the account's signer set / threshold.
    #[display(fmt = "updateDescriptor")]
    UpdateDescriptor,
}

/// Lifecycle of a multisig transaction.
///
/// `Pending → Ready` when collected signatures reach the threshold,
/// `Ready → Completed` after a successful execute call, `Pending → Rejected`
/// as the alternate terminal path. Enforced by the backend; the client
/// displays the state and requests the next transition.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionStatus {
    /// Signatures being collected.
    #[display(fmt = "pending")]
    Pending,
    /// Threshold reached, executable.
    #[display(fmt = "ready")]
    Ready,
    /// Rejected by a co-signer, terminal.
    #[display(fmt = "rejected")]
    Rejected,
    /// Executed, terminal.
    #[display(fmt = "completed")]
    Completed,
}

impl TransactionStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }
}

/// Signature collection progress, e.g. "2 out of 3".
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display(fmt = "{collected} out of {required}")]
pub struct SignatureProgress {
    /// Signatures collected so far.
    pub collected: u16,
    /// Signatures needed to execute.
    pub required: u16,
}

/// A multisig transaction as tracked by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Backend record id.
    pub id: String,
    /// Kind of transaction.
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Parties entitled to co-sign.
    pub signers: Vec<Signer>,
    /// Signature threshold.
    pub signatures_required: u16,
    /// Signatures collected so far.
    pub signatures: Vec<Signature>,
    /// Lifecycle state.
    pub status: TransactionStatus,
    /// Hex-encoded envelope, once assembled.
    pub tx: Option<String>,
    /// Free-form audit trail from the backend.
    #[serde(default)]
    pub logs: Vec<String>,
}

impl TransactionRecord {
    /// Whether the execute action may be offered: every required signature
    /// has been collected.
    pub fn is_executable(&self) -> bool {
        self.signatures.len() == usize::from(self.signatures_required)
    }

    /// Collection progress for display.
    pub fn progress(&self) -> SignatureProgress {
        SignatureProgress {
            collected: self.signatures.len().try_into().unwrap_or(u16::MAX),
            required: self.signatures_required,
        }
    }
}
