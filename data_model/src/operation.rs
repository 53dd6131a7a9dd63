//! Ledger operations: named calls with typed arguments, the building blocks
//! of a transaction envelope.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use syndic_crypto::{EvmAddress, Hash, Signature};

use crate::{
    account::{AccountId, AuthDescriptor},
    asset::{Amount, AssetId},
};

/// A single argument of a ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum OpArg {
    /// Raw bytes: ids, addresses, signatures.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
    /// Unsigned integer, wide enough for base-unit amounts.
    Int(u128),
    /// Nested list of arguments.
    Array(Vec<OpArg>),
}

/// A named ledger operation and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Operation {
    /// Operation name as registered on the ledger.
    pub name: String,
    /// Ordered arguments.
    pub args: Vec<OpArg>,
}

impl Operation {
    /// Construct an operation from its raw parts.
    pub fn new(name: impl Into<String>, args: Vec<OpArg>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The no-op marker appended to every envelope for byte-size
    /// normalization. Carries no arguments so that envelope bytes stay
    /// deterministic for equal inputs.
    pub fn nop() -> Self {
        Self::new("nop", vec![])
    }

    /// Account-registration operation.
    pub fn register_account() -> Self {
        Self::new("ft.register_account", vec![])
    }

    /// Asset transfer from the authorized account to `receiver`.
    pub fn transfer(receiver: AccountId, asset: AssetId, amount: Amount) -> Self {
        Self::new(
            "ft.transfer",
            vec![
                OpArg::Bytes(receiver.to_vec()),
                OpArg::Bytes(asset.to_vec()),
                OpArg::Int(amount.0),
            ],
        )
    }

    /// Replace the account's main auth descriptor with `descriptor`.
    pub fn update_main_auth_descriptor(descriptor: &AuthDescriptor) -> Self {
        Self::new(
            "ft.update_main_auth_descriptor",
            vec![
                OpArg::Array(
                    descriptor
                        .flags
                        .iter()
                        .map(|flag| OpArg::Text(flag.to_string()))
                        .collect(),
                ),
                OpArg::Array(
                    descriptor
                        .signers
                        .iter()
                        .map(|signer| OpArg::Bytes(signer.to_vec()))
                        .collect(),
                ),
                OpArg::Int(u128::from(descriptor.signatures_required)),
            ],
        )
    }

    /// Supply co-signer signatures for verification against the owner list.
    /// Both lists must be in ascending recovered-address order.
    pub fn evm_signatures(owners: &[EvmAddress], signatures: &[Signature]) -> Self {
        Self::new(
            "auth.evm_signatures",
            vec![
                OpArg::Array(owners.iter().map(|owner| OpArg::Bytes(owner.to_vec())).collect()),
                OpArg::Array(
                    signatures
                        .iter()
                        .map(|signature| OpArg::Bytes(signature.to_bytes().to_vec()))
                        .collect(),
                ),
            ],
        )
    }

    /// Authorize the following operation against the given auth descriptor.
    pub fn evm_auth(account_id: AccountId, descriptor_id: Hash, signatures: &[Signature]) -> Self {
        Self::new(
            "auth.evm_auth",
            vec![
                OpArg::Bytes(account_id.to_vec()),
                OpArg::Bytes(descriptor_id.to_vec()),
                OpArg::Array(
                    signatures
                        .iter()
                        .map(|signature| OpArg::Bytes(signature.to_bytes().to_vec()))
                        .collect(),
                ),
            ],
        )
    }
}

/// Drop the absent entries of an ordered operation list before assembly.
pub fn compact(operations: impl IntoIterator<Item = Option<Operation>>) -> Vec<Operation> {
    operations.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_drops_absent_operations() {
        let operations = compact([
            Some(Operation::register_account()),
            None,
            Some(Operation::nop()),
        ]);
        assert_eq!(operations.len(), 2);
        assert_eq!(operations[1], Operation::nop());
    }

    #[test]
    fn nop_carries_no_arguments() {
        assert!(Operation::nop().args.is_empty());
    }

    #[test]
    fn transfer_argument_order() {
        let receiver = AccountId::new([1; 32]);
        let asset = AssetId::new([2; 32]);
        let operation = Operation::transfer(receiver, asset, Amount(42));

        assert_eq!(operation.name, "ft.transfer");
        assert_eq!(
            operation.args,
            vec![
                OpArg::Bytes(receiver.to_vec()),
                OpArg::Bytes(asset.to_vec()),
                OpArg::Int(42),
            ]
        );
    }
}
