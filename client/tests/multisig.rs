//! End-to-end multisig ceremonies over an in-memory ledger fixture: message
//! building, co-signing with local wallets, aggregation and envelope
//! assembly.

use std::cell::RefCell;

use syndic_client::{
    auth::AuthDataSource,
    multisig::{self, FlowError},
    node::{Ledger, NodeError},
    prelude::*,
    samples,
    wallet::{LocalWallet, WalletError},
};
use syndic_crypto::{recover_address, sha256, EvmAddress, Hash, Signature};
use syndic_data_model::{account::AuthFlag, signer_set::SignerSet};

const TEMPLATE: &str = "Please sign this message to authorize account {account_id} \
                        with descriptor {auth_descriptor_id}.\n\
                        Blockchain: {blockchain_rid}\n\
                        Nonce: {nonce}";

/// Ledger fixture: serves the template and a fixed counter, records
/// submitted envelopes instead of sending them, no network.
struct FixtureLedger {
    blockchain_rid: BlockchainRid,
    descriptor: AuthDescriptor,
    counter: u64,
    pending_strategies: Vec<String>,
    balance: Option<Amount>,
    submitted: RefCell<Vec<TxEnvelope>>,
}

impl FixtureLedger {
    fn new(signers: Vec<EvmAddress>, signatures_required: u16) -> Self {
        Self {
            blockchain_rid: BlockchainRid::new([0xE5; 32]),
            descriptor: AuthDescriptor {
                id: sha256(b"main descriptor"),
                flags: vec![AuthFlag::Account, AuthFlag::Transfer],
                signers,
                signatures_required,
            },
            counter: 7,
            pending_strategies: Vec::new(),
            balance: None,
            submitted: RefCell::new(Vec::new()),
        }
    }
}

impl AuthDataSource for FixtureLedger {
    fn blockchain_rid(&self) -> BlockchainRid {
        self.blockchain_rid
    }

    fn auth_message_template(&self, _operation: &Operation) -> Result<String, NodeError> {
        Ok(TEMPLATE.to_owned())
    }

    fn main_auth_descriptor(&self, _account_id: AccountId) -> Result<AuthDescriptor, NodeError> {
        Ok(self.descriptor.clone())
    }

    fn auth_descriptor_counter(
        &self,
        _account_id: AccountId,
        _descriptor_id: Hash,
    ) -> Result<u64, NodeError> {
        Ok(self.counter)
    }
}

impl Ledger for FixtureLedger {
    fn pending_transfer_strategies(
        &self,
        _recipient_id: AccountId,
    ) -> Result<Vec<String>, NodeError> {
        Ok(self.pending_strategies.clone())
    }

    fn asset_balance(
        &self,
        _account_id: AccountId,
        _asset_id: AssetId,
    ) -> Result<Option<Amount>, NodeError> {
        Ok(self.balance)
    }

    fn register_account_message(
        &self,
        strategy: &Operation,
        register: &Operation,
    ) -> Result<String, NodeError> {
        Ok(format!(
            "Sign to register a new account via {} and {}",
            strategy.name, register.name
        ))
    }

    fn submit_transaction(&self, envelope: &TxEnvelope) -> Result<(), NodeError> {
        self.submitted.borrow_mut().push(envelope.clone());
        Ok(())
    }
}

fn ceremony_wallets() -> Vec<LocalWallet> {
    samples::sample_signer_wallets(3)
}

fn signer_addresses(wallets: &[LocalWallet]) -> Vec<EvmAddress> {
    wallets.iter().map(LocalWallet::address).collect()
}

#[test]
fn registration_ceremony_from_message_to_envelope() {
    let wallets = ceremony_wallets();
    let ledger = FixtureLedger::new(signer_addresses(&wallets), 3);
    let mut set = SignerSet::new(signer_addresses(&wallets), 3).unwrap();
    let account_id = set.account_id();

    let message = syndic_client::auth::build_auth_message(
        &ledger,
        account_id,
        ledger.descriptor.id,
        &Operation::register_account(),
    )
    .unwrap();
    assert!(!message.contains('{'), "placeholders must be substituted");
    assert!(message.contains(&account_id.to_string()));

    for wallet in &wallets {
        set.add_signature(wallet.sign_message(&message).unwrap())
            .unwrap();
    }
    assert!(set.is_complete());

    let envelope = multisig::assemble_register_account(
        ledger.blockchain_rid,
        &set,
        &message,
        Some(Operation::new("ft.strategy_open", vec![])),
    )
    .unwrap();

    let decoded = TxEnvelope::from_hex(envelope.to_hex()).unwrap();
    assert_eq!(decoded.blockchain_rid, ledger.blockchain_rid);
    let names: Vec<&str> = decoded
        .operations
        .iter()
        .map(|operation| operation.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "auth.evm_signatures",
            "ft.strategy_open",
            "ft.register_account",
            "nop",
        ]
    );
}

#[test]
fn every_collection_order_yields_the_same_envelope() {
    let wallets = ceremony_wallets();
    let ledger = FixtureLedger::new(signer_addresses(&wallets), 3);
    let account_id = AccountId::derive(&signer_addresses(&wallets));

    let message = syndic_client::auth::build_auth_message(
        &ledger,
        account_id,
        ledger.descriptor.id,
        &Operation::register_account(),
    )
    .unwrap();

    let mut envelopes = Vec::new();
    let orders: [[usize; 3]; 3] = [[0, 1, 2], [2, 0, 1], [1, 2, 0]];
    for order in orders {
        let mut set = SignerSet::new(signer_addresses(&wallets), 3).unwrap();
        for index in order {
            set.add_signature(wallets[index].sign_message(&message).unwrap())
                .unwrap();
        }
        envelopes.push(
            multisig::assemble_register_account(ledger.blockchain_rid, &set, &message, None)
                .unwrap()
                .to_hex(),
        );
    }
    assert_eq!(envelopes[0], envelopes[1]);
    assert_eq!(envelopes[1], envelopes[2]);
}

#[test]
fn transfer_ceremony_with_partial_signer_set() {
    let wallets = ceremony_wallets();
    let ledger = FixtureLedger::new(signer_addresses(&wallets), 2);
    let account_id = AccountId::derive(&signer_addresses(&wallets));
    let transfer = Operation::transfer(
        AccountId::new([9; 32]),
        AssetId::new([8; 32]),
        Amount::from_whole(10, 6).unwrap(),
    );

    let authorization =
        syndic_client::auth::authorize_against_main_descriptor(&ledger, account_id, &transfer)
            .unwrap();

    let mut set = SignerSet::new(signer_addresses(&wallets), 2).unwrap();
    set.add_signature(wallets[2].sign_message(&authorization.message).unwrap())
        .unwrap();
    assert!(!set.is_complete());
    set.add_signature(wallets[0].sign_message(&authorization.message).unwrap())
        .unwrap();
    assert!(set.is_complete());

    let envelope = multisig::assemble_transfer(
        ledger.blockchain_rid,
        &set,
        &authorization.message,
        account_id,
        authorization.descriptor_id,
        transfer,
    )
    .unwrap();

    let decoded = TxEnvelope::from_hex(envelope.to_hex()).unwrap();
    assert_eq!(decoded.operations[0].name, "auth.evm_auth");
    assert_eq!(decoded.operations[1].name, "ft.transfer");
    assert_eq!(decoded.operations[2].name, "nop");
    assert!(decoded.signers.is_empty());
}

#[test]
fn aggregated_signatures_recover_in_owner_order() {
    let wallets = ceremony_wallets();
    let message = "ceremony message";
    let mut set = SignerSet::new(signer_addresses(&wallets), 3).unwrap();
    // Deliberately reversed collection order.
    for wallet in wallets.iter().rev() {
        set.add_signature(wallet.sign_message(message).unwrap())
            .unwrap();
    }

    let ordered = multisig::order_signatures(message, &set).unwrap();
    let recovered: Vec<EvmAddress> = ordered
        .signatures
        .iter()
        .map(|signature| recover_address(message, signature).unwrap())
        .collect();
    assert_eq!(recovered, ordered.owners);
    let mut sorted = ordered.owners.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, ordered.owners);
}

/// Wallet that discloses an account but declines every signing request.
struct RejectingWallet {
    address: EvmAddress,
}

impl WalletProvider for RejectingWallet {
    fn accounts(&self) -> Result<Vec<EvmAddress>, WalletError> {
        Ok(vec![self.address])
    }

    fn sign_message(&self, _message: &str) -> Result<Signature, WalletError> {
        Err(WalletError::Rejected)
    }
}

#[test]
fn wallet_rejection_aborts_the_flow_before_assembly() {
    let wallet = RejectingWallet {
        address: LocalWallet::from_seed(b"decliner".to_vec()).address(),
    };
    let ledger = FixtureLedger::new(vec![wallet.address], 1);

    let session = multisig::Session::authorize(&wallet, &ledger).unwrap();
    let err = session
        .prepare_call(&ledger, Operation::nop())
        .expect_err("declined signing must fail the flow");

    assert!(matches!(err, FlowError::Wallet(WalletError::Rejected)));
}

#[test]
fn session_call_envelope_carries_single_signature() {
    let wallet = LocalWallet::from_seed(b"fee payer".to_vec());
    let ledger = FixtureLedger::new(vec![wallet.address()], 1);

    let session = multisig::Session::authorize(&wallet, &ledger).unwrap();
    let envelope = session
        .prepare_call(
            &ledger,
            Operation::transfer(
                AccountId::new([7; 32]),
                AssetId::new([6; 32]),
                Amount::from_whole(2, 6).unwrap(),
            ),
        )
        .unwrap();

    assert_eq!(envelope.operations.len(), 3);
    assert_eq!(envelope.operations[0].name, "auth.evm_auth");
    assert_eq!(
        session.account_id(),
        AccountId::derive(&[wallet.address()])
    );
}

fn fee_asset() -> Asset {
    Asset {
        id: AssetId::new([8; 32]),
        symbol: "tCHR".to_owned(),
        name: "Chromia Test".to_owned(),
        decimals: 6,
    }
}

#[test]
fn fresh_account_fee_transfer_submits_the_transfer() {
    let payer = LocalWallet::from_seed(b"fee payer".to_vec());
    let mut ledger = FixtureLedger::new(vec![payer.address()], 1);
    ledger.balance = Some(Amount::from_whole(5, 6).unwrap());

    multisig::transfer_fee(
        &ledger,
        &payer,
        AccountId::new([9; 32]),
        &fee_asset(),
        Amount::from_whole(2, 6).unwrap(),
    )
    .unwrap();

    let submitted = ledger.submitted.borrow();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].operations[0].name, "auth.evm_auth");
    assert_eq!(submitted[0].operations[1].name, "ft.transfer");
}

#[test]
fn repeated_fee_transfer_is_skipped_without_a_second_payment() {
    let payer = LocalWallet::from_seed(b"fee payer".to_vec());
    let mut ledger = FixtureLedger::new(vec![payer.address()], 1);
    ledger.pending_strategies = vec!["transfer_fee".to_owned()];

    multisig::transfer_fee(
        &ledger,
        &payer,
        AccountId::new([9; 32]),
        &fee_asset(),
        Amount::from_whole(2, 6).unwrap(),
    )
    .unwrap();

    assert!(ledger.submitted.borrow().is_empty());
}

#[test]
fn fee_transfer_requires_a_covering_balance() {
    let payer = LocalWallet::from_seed(b"fee payer".to_vec());
    let mut ledger = FixtureLedger::new(vec![payer.address()], 1);
    ledger.balance = Some(Amount(1));

    let err = multisig::transfer_fee(
        &ledger,
        &payer,
        AccountId::new([9; 32]),
        &fee_asset(),
        Amount::from_whole(2, 6).unwrap(),
    )
    .unwrap_err();

    assert!(matches!(err, FlowError::InsufficientBalance { .. }));
    assert!(ledger.submitted.borrow().is_empty());
}

#[test]
fn registration_waits_for_the_fee_transfer() {
    let wallets = ceremony_wallets();
    let ledger = FixtureLedger::new(signer_addresses(&wallets), 3);
    let mut set = SignerSet::new(signer_addresses(&wallets), 3).unwrap();

    let message = multisig::registration_message(
        &ledger,
        &Operation::new("ft.strategy_open", vec![]),
    )
    .unwrap();
    for wallet in &wallets {
        set.add_signature(wallet.sign_message(&message).unwrap())
            .unwrap();
    }

    let err = multisig::submit_registration(&ledger, &set, &message, None).unwrap_err();
    assert!(matches!(
        err,
        FlowError::NoPendingRegistration(account_id) if account_id == set.account_id()
    ));
    assert!(ledger.submitted.borrow().is_empty());
}

#[test]
fn registration_submits_once_the_fee_is_in() {
    let wallets = ceremony_wallets();
    let mut ledger = FixtureLedger::new(signer_addresses(&wallets), 3);
    ledger.pending_strategies = vec!["transfer_fee".to_owned()];
    let mut set = SignerSet::new(signer_addresses(&wallets), 3).unwrap();

    let strategy = Operation::new("ft.strategy_open", vec![]);
    let message = multisig::registration_message(&ledger, &strategy).unwrap();
    for wallet in &wallets {
        set.add_signature(wallet.sign_message(&message).unwrap())
            .unwrap();
    }

    multisig::submit_registration(&ledger, &set, &message, Some(strategy)).unwrap();

    let submitted = ledger.submitted.borrow();
    assert_eq!(submitted.len(), 1);
    let names: Vec<&str> = submitted[0]
        .operations
        .iter()
        .map(|operation| operation.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "auth.evm_signatures",
            "ft.strategy_open",
            "ft.register_account",
            "nop",
        ]
    );
}
