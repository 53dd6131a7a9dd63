//! Multisig accounts, their signer sets and the on-ledger auth descriptor.

use std::{fmt, str::FromStr};

use derive_more::Display;
use parity_scale_codec::{Decode, Encode};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use syndic_crypto::{sha256, EvmAddress, Hash, ParseError};

/// On-ledger address of an account, derived from its initial signer set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct AccountId([u8; Self::LENGTH]);

impl AccountId {
    /// Length of an account id in bytes.
    pub const LENGTH: usize = 32;

    /// Wrap raw account id bytes.
    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw account id bytes.
    pub const fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    /// Account id bytes as an owned vector, e.g. for use as an operation argument.
    pub fn to_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Derive the account id for a new account from its signer addresses.
    ///
    /// A single signer hashes alone; several signers hash as one payload in
    /// ascending byte order. Every signer derives the same id independently.
    pub fn derive(signers: &[EvmAddress]) -> Self {
        let digest = match signers {
            [single] => sha256(single),
            many => {
                let mut sorted: Vec<&EvmAddress> = many.iter().collect();
                sorted.sort_unstable();
                let payload: Vec<u8> = sorted
                    .into_iter()
                    .flat_map(|address| address.as_bytes().iter().copied())
                    .collect();
                sha256(payload)
            }
        };
        Self(*digest.as_bytes())
    }
}

impl FromStr for AccountId {
    type Err = ParseError;

    fn from_str(payload: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(payload).map_err(|err| ParseError(err.to_string()))?;
        let bytes: [u8; Self::LENGTH] = bytes
            .try_into()
            .map_err(|_| ParseError(format!("Expected {} bytes of account id", Self::LENGTH)))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let payload = String::deserialize(deserializer)?;
        payload.parse().map_err(de::Error::custom)
    }
}

/// A party entitled to co-sign account actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    /// Human-readable label shown in listings.
    pub name: String,
    /// The signer's EVM address.
    pub pub_key: EvmAddress,
}

/// Capability granted to an auth descriptor.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Encode, Decode, Serialize, Deserialize,
)]
pub enum AuthFlag {
    /// Account management: descriptor updates, account-level actions.
    #[display(fmt = "A")]
    Account,
    /// Asset transfers.
    #[display(fmt = "T")]
    Transfer,
}

/// The on-ledger record describing an account's current signer set and
/// threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthDescriptor {
    /// Descriptor id assigned by the ledger.
    pub id: Hash,
    /// Capabilities of this descriptor.
    pub flags: Vec<AuthFlag>,
    /// Signer addresses, in ascending byte order.
    pub signers: Vec<EvmAddress>,
    /// How many of the signers must co-sign an action.
    pub signatures_required: u16,
}

/// Off-chain registration progress of an account, advanced by the backend as
/// each step completes. The client only observes it.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum AccountStatus {
    /// Account proposed, signatures being collected.
    #[display(fmt = "pending")]
    Pending,
    /// Waiting for the registration fee transfer.
    #[display(fmt = "transferFee")]
    TransferFee,
    /// Registration transaction submitted to the ledger.
    #[display(fmt = "registering")]
    Registering,
    /// Account exists on the ledger.
    #[display(fmt = "created")]
    Created,
}

/// Error on an attempt to move an account status backwards.
#[derive(Debug, Clone, Copy, displaydoc::Display, thiserror::Error)]
#[displaydoc("Account status cannot regress from `{from}` to `{to}`")]
pub struct StatusRegression {
    /// Status the account is currently in.
    pub from: AccountStatus,
    /// Status the regressing update asked for.
    pub to: AccountStatus,
}

impl AccountStatus {
    /// Check that `next` does not move the status backwards.
    ///
    /// # Errors
    /// Fails with [`StatusRegression`] when `next` precedes `self`.
    pub fn advance_to(self, next: Self) -> Result<Self, StatusRegression> {
        if next < self {
            return Err(StatusRegression {
                from: self,
                to: next,
            });
        }
        Ok(next)
    }
}

/// A multisig account as tracked by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Backend record id.
    pub id: String,
    /// On-ledger address.
    pub account_id: AccountId,
    /// Parties entitled to co-sign.
    pub signers: Vec<Signer>,
    /// Signature threshold.
    pub signatures_required: u16,
    /// Current main auth descriptor, once known.
    pub main_descriptor: Option<AuthDescriptor>,
    /// Registration progress.
    pub status: AccountStatus,
}
