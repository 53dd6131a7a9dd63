//! Assets and amounts expressed in asset base units.

use std::{fmt, str::FromStr};

use parity_scale_codec::{Decode, Encode};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use syndic_crypto::ParseError;

/// On-ledger id of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct AssetId([u8; Self::LENGTH]);

impl AssetId {
    /// Length of an asset id in bytes.
    pub const LENGTH: usize = 32;

    /// Wrap raw asset id bytes.
    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Asset id bytes as an owned vector, e.g. for use as an operation argument.
    pub fn to_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl FromStr for AssetId {
    type Err = ParseError;

    fn from_str(payload: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(payload).map_err(|err| ParseError(err.to_string()))?;
        let bytes: [u8; Self::LENGTH] = bytes
            .try_into()
            .map_err(|_| ParseError(format!("Expected {} bytes of asset id", Self::LENGTH)))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let payload = String::deserialize(deserializer)?;
        payload.parse().map_err(de::Error::custom)
    }
}

/// Asset metadata as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// On-ledger id.
    pub id: AssetId,
    /// Ticker symbol, e.g. `tCHR`.
    pub symbol: String,
    /// Full name.
    pub name: String,
    /// Number of decimals of the base unit.
    pub decimals: u8,
}

/// Error of scaling a whole-unit amount into base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub enum AmountError {
    /// Amount {whole} with {decimals} decimals does not fit the base-unit range
    Overflow {
        /// Whole-unit amount requested.
        whole: u64,
        /// Decimals reported for the asset.
        decimals: u8,
    },
}

/// Amount of an asset in its base (smallest) units.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    Encode,
    Decode,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub u128);

impl Amount {
    /// Scale a whole-unit amount into base units, `whole × 10^decimals`.
    ///
    /// # Errors
    /// `decimals` is asset metadata served by the ledger; a value pushing
    /// the product out of the `u128` range is rejected rather than wrapped.
    pub fn from_whole(whole: u64, decimals: u8) -> Result<Self, AmountError> {
        let overflow = AmountError::Overflow { whole, decimals };
        let scale = 10_u128.checked_pow(u32::from(decimals)).ok_or(overflow)?;
        u128::from(whole).checked_mul(scale).map(Self).ok_or(overflow)
    }

    /// Whether a balance of `self` covers `required`.
    pub fn covers(self, required: Amount) -> bool {
        self >= required
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
