//! Crate contains the syndic client, which talks to the ledger nodes and the
//! bookkeeping backend via http and drives the multisig signing flows.

pub mod auth;
pub mod backend;
pub mod http;
mod http_default;
pub mod multisig;
pub mod node;
pub mod wallet;

pub use http_default::DefaultRequestBuilder;
pub use syndic_config as config;
pub use syndic_crypto as crypto;
pub use syndic_data_model as data_model;

/// Sample configurations and wallets, for tests and local tooling.
pub mod samples {
    use syndic_config::Configuration;

    use crate::wallet::LocalWallet;

    /// Configuration pointing at the default testnet pool, no credentials.
    pub fn sample_configuration() -> Configuration {
        Configuration::default()
    }

    /// Deterministic co-signer wallets.
    pub fn sample_signer_wallets(count: usize) -> Vec<LocalWallet> {
        (0..count)
            .map(|index| {
                LocalWallet::from_seed(format!("syndic sample signer {index}").into_bytes())
            })
            .collect()
    }
}

/// The prelude re-exports most commonly used traits, structs and macros from this crate.
pub mod prelude {
    pub use syndic_data_model::prelude::*;

    pub use crate::{
        auth::{authorize_against_main_descriptor, build_auth_message, AuthDataSource},
        backend::BackendClient,
        multisig::{
            assemble_register_account, assemble_transfer, assemble_update_descriptor,
            order_signatures, registration_message, submit_registration, transfer_fee, Session,
        },
        node::{Ledger, NodeClient},
        wallet::{LocalWallet, WalletProvider},
    };
}
