//! Wallet seam: the signing flows never hold key material themselves, they
//! ask a [`WalletProvider`] for addresses and message signatures.

use syndic_crypto::{EvmAddress, KeyPair, Signature};

/// Error surfaced by a wallet provider.
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum WalletError {
    /// User rejected the signing request in the wallet
    Rejected,
    /// Wallet exposes no accounts
    NoAccounts,
    /// Wallet provider failure: {0}
    Provider(String),
    /// Signing failure: {0}
    Crypto(#[from] syndic_crypto::Error),
}

/// An EVM wallet able to disclose its accounts and sign text messages.
///
/// Production deployments back this with a browser wallet extension; tests
/// and tooling use [`LocalWallet`].
pub trait WalletProvider {
    /// Addresses the wallet exposes, active account first.
    ///
    /// # Errors
    /// Fails if the wallet is locked or unreachable.
    fn accounts(&self) -> Result<Vec<EvmAddress>, WalletError>;

    /// Sign `message` with the active account, EIP-191 envelope applied.
    ///
    /// # Errors
    /// [`WalletError::Rejected`] when the user declines the request.
    fn sign_message(&self, message: &str) -> Result<Signature, WalletError>;

    /// The wallet's active account.
    ///
    /// # Errors
    /// [`WalletError::NoAccounts`] when the wallet exposes none.
    fn active_account(&self) -> Result<EvmAddress, WalletError> {
        self.accounts()?
            .into_iter()
            .next()
            .ok_or(WalletError::NoAccounts)
    }
}

/// In-process wallet over a [`KeyPair`]. Signs everything it is asked to.
#[derive(Debug, Clone)]
pub struct LocalWallet {
    key_pair: KeyPair,
}

impl LocalWallet {
    /// Wallet over an existing keypair.
    pub fn new(key_pair: KeyPair) -> Self {
        Self { key_pair }
    }

    /// Deterministic wallet for tests and local tooling.
    pub fn from_seed(seed: impl Into<Vec<u8>>) -> Self {
        Self::new(KeyPair::from_seed(seed.into()))
    }

    /// Address of the wallet's single account.
    pub fn address(&self) -> EvmAddress {
        self.key_pair.address()
    }
}

impl WalletProvider for LocalWallet {
    fn accounts(&self) -> Result<Vec<EvmAddress>, WalletError> {
        Ok(vec![self.key_pair.address()])
    }

    fn sign_message(&self, message: &str) -> Result<Signature, WalletError> {
        Ok(self.key_pair.sign_message(message)?)
    }
}

#[cfg(test)]
mod tests {
    use syndic_crypto::recover_address;

    use super::*;

    #[test]
    fn local_wallet_signs_as_its_account() {
        let wallet = LocalWallet::from_seed(b"wallet".to_vec());
        let signature = wallet.sign_message("authorize something").unwrap();
        let recovered = recover_address("authorize something", &signature).unwrap();

        assert_eq!(recovered, wallet.address());
        assert_eq!(wallet.active_account().unwrap(), wallet.address());
    }
}
