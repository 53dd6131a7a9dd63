//! Data model shared by the multisig flows, the node/backend clients and the
//! tests: accounts and their signer sets, assets, ledger operations, the
//! transaction envelope and the off-chain transaction lifecycle.

pub mod account;
pub mod asset;
pub mod operation;
pub mod pagination;
pub mod signer_set;
pub mod transaction;

/// Prelude: re-export of most commonly used traits, structs and macros in this crate.
pub mod prelude {
    pub use super::{
        account::{Account, AccountId, AccountStatus, AuthDescriptor, AuthFlag, Signer},
        asset::{Amount, AmountError, Asset, AssetId},
        operation::{OpArg, Operation},
        pagination::{ListQuery, Pagination, SortOrder, Sorting},
        signer_set::SignerSet,
        transaction::{
            BlockchainRid, TransactionRecord, TransactionStatus, TransactionType, TxEnvelope,
        },
    };
}
