//! Authorization messages: the human-readable text every co-signer signs
//! before an operation may execute against an auth descriptor.
//!
//! The ledger hands out a template with placeholders; the client fills in
//! the account, descriptor, chain and a replay nonce, so that every
//! co-signer derives byte-identical text independently.

use parity_scale_codec::Encode as _;
use syndic_crypto::{sha256, Hash};
use syndic_data_model::prelude::*;

use crate::node::NodeError;

/// Placeholder the template carries for the account id.
pub const PLACEHOLDER_ACCOUNT_ID: &str = "{account_id}";
/// Placeholder for the auth descriptor id.
pub const PLACEHOLDER_AUTH_DESCRIPTOR_ID: &str = "{auth_descriptor_id}";
/// Placeholder for the blockchain rid.
pub const PLACEHOLDER_BLOCKCHAIN_RID: &str = "{blockchain_rid}";
/// Placeholder for the replay nonce.
pub const PLACEHOLDER_NONCE: &str = "{nonce}";

/// The ledger-side data an authorization message is built from.
///
/// [`crate::node::NodeClient`] is the production source; tests substitute a
/// fixture.
pub trait AuthDataSource {
    /// The blockchain the message is bound to.
    fn blockchain_rid(&self) -> BlockchainRid;

    /// Message template for `operation`, with placeholders intact.
    ///
    /// # Errors
    /// Fails if the source cannot produce the template.
    fn auth_message_template(&self, operation: &Operation) -> Result<String, NodeError>;

    /// The account's current main auth descriptor.
    ///
    /// # Errors
    /// [`NodeError::NotFound`] if the account is not registered.
    fn main_auth_descriptor(&self, account_id: AccountId) -> Result<AuthDescriptor, NodeError>;

    /// Replay counter of the given descriptor.
    ///
    /// # Errors
    /// Fails if the source cannot resolve the counter.
    fn auth_descriptor_counter(
        &self,
        account_id: AccountId,
        descriptor_id: Hash,
    ) -> Result<u64, NodeError>;
}

/// Derive the replay nonce for one authorization: a digest over the chain,
/// the exact operation and the descriptor counter, so a signed message can
/// neither be replayed nor reused for a different operation.
pub fn derive_nonce(blockchain_rid: BlockchainRid, operation: &Operation, counter: u64) -> String {
    let mut payload = blockchain_rid.as_bytes().to_vec();
    payload.extend_from_slice(&operation.encode());
    payload.extend_from_slice(&counter.to_be_bytes());
    sha256(payload).to_string()
}

/// Build the final authorization message for `operation` against the given
/// descriptor, all placeholders substituted.
///
/// # Errors
/// Propagates failures of the underlying data source.
pub fn build_auth_message(
    source: &impl AuthDataSource,
    account_id: AccountId,
    descriptor_id: Hash,
    operation: &Operation,
) -> Result<String, NodeError> {
    let template = source.auth_message_template(operation)?;
    let counter = source.auth_descriptor_counter(account_id, descriptor_id)?;
    let blockchain_rid = source.blockchain_rid();
    let nonce = derive_nonce(blockchain_rid, operation, counter);
    Ok(template
        .replace(PLACEHOLDER_ACCOUNT_ID, &account_id.to_string())
        .replace(PLACEHOLDER_AUTH_DESCRIPTOR_ID, &descriptor_id.to_string())
        .replace(PLACEHOLDER_BLOCKCHAIN_RID, &blockchain_rid.to_string())
        .replace(PLACEHOLDER_NONCE, &nonce))
}

/// An authorization message together with the descriptor it was built
/// against, as needed to later assemble the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// Message for the co-signers to sign.
    pub message: String,
    /// Descriptor the message authorizes against.
    pub descriptor_id: Hash,
}

/// Build the authorization for an operation against the account's main
/// descriptor, resolving the descriptor along the way.
///
/// # Errors
/// [`NodeError::NotFound`] if the account has no main descriptor.
pub fn authorize_against_main_descriptor(
    source: &impl AuthDataSource,
    account_id: AccountId,
    operation: &Operation,
) -> Result<Authorization, NodeError> {
    let descriptor = source.main_auth_descriptor(account_id)?;
    let message = build_auth_message(source, account_id, descriptor.id, operation)?;
    Ok(Authorization {
        message,
        descriptor_id: descriptor.id,
    })
}
