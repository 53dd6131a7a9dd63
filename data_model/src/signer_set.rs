//! [`SignerSet`] ties the canonical signer list, the threshold and the
//! in-flight signatures together, so that message building and signature
//! aggregation can never be called with inconsistent signer sets.

use serde::{Deserialize, Serialize};
use syndic_crypto::{EvmAddress, Signature};

use crate::account::AccountId;

/// Error of constructing or filling a [`SignerSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, displaydoc::Display, thiserror::Error)]
pub enum SignerSetError {
    /// Signer set cannot be empty
    Empty,
    /// Duplicate signer address: {0}
    DuplicateSigner(EvmAddress),
    /// Threshold {threshold} is not within 1..={signers} signers
    BadThreshold {
        /// Requested threshold.
        threshold: u16,
        /// Number of distinct signers.
        signers: u16,
    },
    /// Every signer has already provided a signature
    Saturated,
}

/// The canonical signer set of one authorization ceremony.
///
/// Signers are kept in ascending byte order, which is the order the ledger
/// verifies owner lists in. Both the authorization message and the
/// aggregated signature list are derived from the same instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerSet {
    signers: Vec<EvmAddress>,
    threshold: u16,
    collected: Vec<Signature>,
}

impl SignerSet {
    /// Construct a signer set from the given addresses and threshold.
    ///
    /// # Errors
    /// Fails on an empty list, a duplicate address, or a threshold outside
    /// `1..=signers`.
    pub fn new(mut signers: Vec<EvmAddress>, threshold: u16) -> Result<Self, SignerSetError> {
        if signers.is_empty() {
            return Err(SignerSetError::Empty);
        }
        signers.sort_unstable();
        if let Some(duplicate) = signers.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(SignerSetError::DuplicateSigner(duplicate[0]));
        }
        let len = u16::try_from(signers.len()).map_err(|_| SignerSetError::BadThreshold {
            threshold,
            signers: u16::MAX,
        })?;
        if threshold == 0 || threshold > len {
            return Err(SignerSetError::BadThreshold {
                threshold,
                signers: len,
            });
        }
        Ok(Self {
            signers,
            threshold,
            collected: Vec::new(),
        })
    }

    /// Signer addresses in ascending byte order.
    pub fn signers(&self) -> &[EvmAddress] {
        &self.signers
    }

    /// How many signatures the ledger requires.
    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    /// Signatures collected so far, in collection order.
    pub fn collected(&self) -> &[Signature] {
        &self.collected
    }

    /// Whether `address` belongs to the canonical signer list.
    pub fn contains(&self, address: EvmAddress) -> bool {
        self.signers.binary_search(&address).is_ok()
    }

    /// Record one more collected signature.
    ///
    /// # Errors
    /// Fails once every signer has already provided a signature.
    pub fn add_signature(&mut self, signature: Signature) -> Result<(), SignerSetError> {
        if self.collected.len() >= self.signers.len() {
            return Err(SignerSetError::Saturated);
        }
        self.collected.push(signature);
        Ok(())
    }

    /// Whether enough signatures were collected to meet the threshold.
    pub fn is_complete(&self) -> bool {
        self.collected.len() >= usize::from(self.threshold)
    }

    /// The account id this signer set derives to.
    pub fn account_id(&self) -> AccountId {
        AccountId::derive(&self.signers)
    }
}
