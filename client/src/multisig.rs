//! The multisig ceremony: collecting co-signer signatures over one
//! authorization message, putting them into ledger order and assembling the
//! transaction envelope.

use syndic_crypto::{recover_address, EvmAddress, Hash, Signature};
use syndic_data_model::{operation::compact, prelude::*, signer_set::SignerSet};
use syndic_logger::prelude::*;

use crate::{
    auth::{build_auth_message, AuthDataSource},
    node::{Ledger, NodeError},
    wallet::{WalletError, WalletProvider},
};

/// Error of aggregating collected signatures into ledger order.
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum AggregateError {
    /// Signature recovers to {0}, which is not in the signer set
    UnknownSigner(EvmAddress),
    /// Two signatures recover to the same address {0}
    DuplicateSigner(EvmAddress),
    /// Collected {collected} signatures, {required} required
    BelowThreshold {
        /// Signatures collected so far.
        collected: u16,
        /// The signer set threshold.
        required: u16,
    },
    /// Signature recovery failure: {0}
    Recovery(#[from] syndic_crypto::Error),
}

/// Error of a flow that spans the wallet, the node and aggregation.
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum FlowError {
    /// Wallet failure: {0}
    Wallet(#[from] WalletError),
    /// Node failure: {0}
    Node(#[from] NodeError),
    /// Aggregation failure: {0}
    Aggregate(#[from] AggregateError),
    /// Account {0} has no pending registration; the fee must be transferred first
    NoPendingRegistration(AccountId),
    /// Balance {balance} does not cover the required {required}
    InsufficientBalance {
        /// Current balance in base units.
        balance: Amount,
        /// Amount the flow needs.
        required: Amount,
    },
}

/// Collected signatures in the order the ledger verifies them, together with
/// the owner list sorted the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedSignatures {
    /// Signer addresses in ascending byte order.
    pub owners: Vec<EvmAddress>,
    /// Signatures sorted by their recovered address, ascending.
    pub signatures: Vec<Signature>,
}

/// Put the signatures collected in `set` into ledger order.
///
/// Each signature is recovered against `message`; the result pairs are
/// sorted by recovered address. A signature from outside the set, or two
/// signatures recovering to the same address, fail aggregation outright.
///
/// # Errors
/// See [`AggregateError`].
pub fn order_signatures(
    message: &str,
    set: &SignerSet,
) -> Result<OrderedSignatures, AggregateError> {
    if !set.is_complete() {
        return Err(AggregateError::BelowThreshold {
            collected: set.collected().len().try_into().unwrap_or(u16::MAX),
            required: set.threshold(),
        });
    }

    let mut pairs: Vec<(EvmAddress, Signature)> = Vec::with_capacity(set.collected().len());
    for signature in set.collected() {
        let address = recover_address(message, signature)?;
        if !set.contains(address) {
            return Err(AggregateError::UnknownSigner(address));
        }
        if pairs.iter().any(|(seen, _)| *seen == address) {
            return Err(AggregateError::DuplicateSigner(address));
        }
        pairs.push((address, *signature));
    }
    pairs.sort_unstable_by_key(|(address, _)| *address);

    Ok(OrderedSignatures {
        owners: set.signers().to_vec(),
        signatures: pairs.into_iter().map(|(_, signature)| signature).collect(),
    })
}

/// Assemble the registration envelope for a new multisig account.
///
/// Operation order is fixed: signature verification, the optional
/// registration strategy, the registration itself, and the no-op marker.
///
/// # Errors
/// Fails if the collected signatures do not aggregate.
pub fn assemble_register_account(
    blockchain_rid: BlockchainRid,
    set: &SignerSet,
    message: &str,
    strategy: Option<Operation>,
) -> Result<TxEnvelope, AggregateError> {
    let ordered = order_signatures(message, set)?;
    let operations = compact([
        Some(Operation::evm_signatures(&ordered.owners, &ordered.signatures)),
        strategy,
        Some(Operation::register_account()),
        Some(Operation::nop()),
    ]);
    debug!(account_id = %set.account_id(), "Assembled registration envelope");
    Ok(TxEnvelope::new(blockchain_rid, operations))
}

/// Assemble the envelope replacing the account's main auth descriptor.
///
/// # Errors
/// Fails if the collected signatures do not aggregate.
pub fn assemble_update_descriptor(
    blockchain_rid: BlockchainRid,
    set: &SignerSet,
    message: &str,
    account_id: AccountId,
    descriptor_id: Hash,
    new_descriptor: &AuthDescriptor,
) -> Result<TxEnvelope, AggregateError> {
    let ordered = order_signatures(message, set)?;
    let operations = compact([
        Some(Operation::evm_signatures(&ordered.owners, &ordered.signatures)),
        Some(Operation::evm_auth(
            account_id,
            descriptor_id,
            &ordered.signatures,
        )),
        Some(Operation::update_main_auth_descriptor(new_descriptor)),
        Some(Operation::nop()),
    ]);
    Ok(TxEnvelope::new(blockchain_rid, operations))
}

/// Assemble the envelope transferring an asset out of the account.
///
/// # Errors
/// Fails if the collected signatures do not aggregate.
pub fn assemble_transfer(
    blockchain_rid: BlockchainRid,
    set: &SignerSet,
    message: &str,
    account_id: AccountId,
    descriptor_id: Hash,
    transfer: Operation,
) -> Result<TxEnvelope, AggregateError> {
    let ordered = order_signatures(message, set)?;
    let operations = compact([
        Some(Operation::evm_auth(
            account_id,
            descriptor_id,
            &ordered.signatures,
        )),
        Some(transfer),
        Some(Operation::nop()),
    ]);
    Ok(TxEnvelope::new(blockchain_rid, operations))
}

/// A single-signer session over the wallet's own account, used for calls
/// that need no co-signers, like the registration fee transfer.
#[derive(Debug)]
pub struct Session<'wallet, W> {
    wallet: &'wallet W,
    account_id: AccountId,
    descriptor_id: Hash,
}

impl<W> Copy for Session<'_, W> {}

impl<W> Clone for Session<'_, W> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'wallet, W: WalletProvider> Session<'wallet, W> {
    /// Open a session over the wallet's active account, resolving its main
    /// descriptor through `source`.
    ///
    /// # Errors
    /// Fails if the wallet exposes no accounts or the account is not
    /// registered on the ledger.
    pub fn authorize(
        wallet: &'wallet W,
        source: &impl AuthDataSource,
    ) -> Result<Self, FlowError> {
        let account_id = AccountId::derive(&[wallet.active_account()?]);
        let descriptor = source.main_auth_descriptor(account_id)?;
        Ok(Self {
            wallet,
            account_id,
            descriptor_id: descriptor.id,
        })
    }

    /// The session's account.
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Build the signed envelope for one operation without submitting it.
    ///
    /// # Errors
    /// Propagates wallet refusal and data-source failures; nothing leaves
    /// the process on error.
    pub fn prepare_call(
        &self,
        source: &impl AuthDataSource,
        operation: Operation,
    ) -> Result<TxEnvelope, FlowError> {
        let message = build_auth_message(source, self.account_id, self.descriptor_id, &operation)?;
        let signature = self.wallet.sign_message(&message)?;
        let operations = compact([
            Some(Operation::evm_auth(
                self.account_id,
                self.descriptor_id,
                &[signature],
            )),
            Some(operation),
            Some(Operation::nop()),
        ]);
        Ok(TxEnvelope::new(source.blockchain_rid(), operations))
    }

    /// Sign and submit one operation.
    ///
    /// # Errors
    /// Propagates wallet refusal, assembly and submission failures.
    pub fn call(&self, node: &impl Ledger, operation: Operation) -> Result<(), FlowError> {
        let envelope = self.prepare_call(node, operation)?;
        node.submit_transaction(&envelope)?;
        Ok(())
    }
}

/// Fetch the message co-signers must sign to register a new account under
/// `strategy`.
///
/// # Errors
/// Fails if the ledger cannot produce the message.
pub fn registration_message(
    node: &impl Ledger,
    strategy: &Operation,
) -> Result<String, NodeError> {
    node.register_account_message(strategy, &Operation::register_account())
}

/// Assemble and submit the registration envelope once every signature is in.
///
/// Registration consumes the pending strategy the fee transfer created; when
/// none exists yet the fee has not been paid and the flow refuses to run.
///
/// # Errors
/// See [`FlowError`].
pub fn submit_registration(
    node: &impl Ledger,
    set: &SignerSet,
    message: &str,
    strategy: Option<Operation>,
) -> Result<(), FlowError> {
    let strategies = node.pending_transfer_strategies(set.account_id())?;
    if strategies.is_empty() {
        return Err(FlowError::NoPendingRegistration(set.account_id()));
    }

    let envelope = assemble_register_account(node.blockchain_rid(), set, message, strategy)?;
    node.submit_transaction(&envelope)?;
    Ok(())
}

/// Transfer the registration fee from the wallet's own account to a pending
/// multisig account.
///
/// The transfer is what creates the recipient's pending strategy, so one
/// already present means the fee was paid earlier and the call succeeds
/// without transferring again. Refuses to run when the fee-payer balance
/// does not cover `amount`.
///
/// # Errors
/// See [`FlowError`].
pub fn transfer_fee(
    node: &impl Ledger,
    wallet: &impl WalletProvider,
    recipient_id: AccountId,
    asset: &Asset,
    amount: Amount,
) -> Result<(), FlowError> {
    let strategies = node.pending_transfer_strategies(recipient_id)?;
    if !strategies.is_empty() {
        info!(recipient_id = %recipient_id, "Registration fee already transferred, skipping");
        return Ok(());
    }

    let session = Session::authorize(wallet, node)?;
    let balance = node
        .asset_balance(session.account_id(), asset.id)?
        .unwrap_or_default();
    if !balance.covers(amount) {
        return Err(FlowError::InsufficientBalance {
            balance,
            required: amount,
        });
    }

    info!(recipient_id = %recipient_id, %amount, asset = %asset.symbol, "Transferring registration fee");
    session.call(node, Operation::transfer(recipient_id, asset.id, amount))
}
