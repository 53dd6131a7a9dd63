//! Client for the ledger node REST API: queries against the bound blockchain
//! and transaction submission.
//!
//! Queries follow the prepare/handle split: `prepare_*` fills a
//! [`RequestBuilder`] of the caller's choosing and returns the matching
//! response handler, while the plain methods wire the two together over the
//! default transport.

use std::marker::PhantomData;

use eyre::{eyre, Result, WrapErr};
use rand::seq::SliceRandom as _;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use syndic_config::ChainContext;
use syndic_crypto::Hash;
use syndic_data_model::prelude::*;
use syndic_logger::prelude::*;
use url::Url;

use crate::{
    http::{Headers, Method, RequestBuilder, Response, StatusCode},
    http_default::DefaultRequestBuilder,
};

/// Error of a node query.
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum NodeError {
    /// Queried entity was not found on the ledger
    NotFound,
    /// Node rejected the request: {reason}
    Rejected {
        /// Status line and body returned by the node.
        reason: String,
    },
    /// Transport or response-handling failure: {0}
    Transport(#[from] eyre::Report),
}

/// A named query with JSON arguments, as the node expects it.
#[derive(Debug, Clone)]
pub struct NodeQuery {
    name: &'static str,
    args: serde_json::Value,
}

impl NodeQuery {
    /// Query `name` with the given JSON object of arguments.
    pub fn new(name: &'static str, args: serde_json::Value) -> Self {
        Self { name, args }
    }

    /// Query name as registered on the ledger.
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn payload(&self) -> Result<Vec<u8>> {
        let mut body = self.args.clone();
        let object = body
            .as_object_mut()
            .ok_or_else(|| eyre!("Query arguments must be a JSON object"))?;
        object.insert("type".to_owned(), json!(self.name));
        serde_json::to_vec(&body).wrap_err("Failed to serialize query payload")
    }
}

/// Output of [`NodeClient::prepare_query`], awaiting the transport response.
#[derive(Debug)]
pub struct QueryResponseHandler<T>(PhantomData<T>);

impl<T> Copy for QueryResponseHandler<T> {}

impl<T> Clone for QueryResponseHandler<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: DeserializeOwned> QueryResponseHandler<T> {
    /// Decode the query result out of the node's HTTP response.
    ///
    /// # Errors
    /// [`NodeError::NotFound`] on 404, [`NodeError::Rejected`] on any other
    /// non-success status, [`NodeError::Transport`] if the body is not the
    /// expected JSON.
    pub fn handle(self, response: &Response<Vec<u8>>) -> Result<T, NodeError> {
        match response.status() {
            StatusCode::OK => serde_json::from_slice(response.body()).map_err(|err| {
                NodeError::Transport(eyre!("Failed to decode query response: {err}"))
            }),
            StatusCode::NOT_FOUND => Err(NodeError::NotFound),
            status => Err(NodeError::Rejected {
                reason: format!("{status}: {}", String::from_utf8_lossy(response.body())),
            }),
        }
    }
}

/// Name and rid of a blockchain hosted by the node, from the directory chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockchainInfo {
    /// Human-readable chain name.
    pub name: String,
    /// Chain rid, usable as a [`NodeClient`] binding.
    pub rid: BlockchainRid,
}

/// Directory-chain listing entry; inactive chains are filtered out before
/// the listing is handed to callers.
#[derive(Debug, Clone, Deserialize)]
struct BlockchainEntry {
    name: String,
    rid: BlockchainRid,
    active: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct BalanceInfo {
    amount: Amount,
}

/// The directory chain is addressed by its well-known iid rather than a rid.
const DIRECTORY_CHAIN_PATH: &str = "iid_0";

/// Client for one ledger node, bound to one blockchain.
#[derive(Debug, Clone)]
pub struct NodeClient {
    node_url: Url,
    blockchain_rid: BlockchainRid,
}

impl NodeClient {
    /// Connect to a random node out of the context's endpoint pool.
    ///
    /// # Errors
    /// Fails if the pool is empty.
    pub fn new(context: &ChainContext) -> Result<Self> {
        let node_url = context
            .node_urls
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| eyre!("Node endpoint pool is empty"))?;
        debug!(%node_url, network = %context.network, "Selected ledger node");
        Ok(Self::with_node(node_url, context.blockchain_rid))
    }

    /// Bind to a specific node, bypassing pool selection.
    pub fn with_node(node_url: Url, blockchain_rid: BlockchainRid) -> Self {
        Self {
            node_url,
            blockchain_rid,
        }
    }

    /// The blockchain this client is bound to.
    pub fn blockchain_rid(&self) -> BlockchainRid {
        self.blockchain_rid
    }

    fn endpoint(&self, segment: &str, chain: &str) -> Result<Url> {
        self.node_url
            .join(&format!("{segment}/{chain}"))
            .wrap_err("Failed to construct node endpoint url")
    }

    /// Fill `B` with a query request against the bound chain.
    ///
    /// # Errors
    /// Fails if the request cannot be assembled.
    pub fn prepare_query<B, T>(&self, query: &NodeQuery) -> Result<(B, QueryResponseHandler<T>)>
    where
        B: RequestBuilder,
        T: DeserializeOwned,
    {
        self.prepare_query_against(query, &self.blockchain_rid.to_string())
    }

    fn prepare_query_against<B, T>(
        &self,
        query: &NodeQuery,
        chain: &str,
    ) -> Result<(B, QueryResponseHandler<T>)>
    where
        B: RequestBuilder,
        T: DeserializeOwned,
    {
        let url = self.endpoint("query", chain)?;
        let builder = B::build(
            Method::POST,
            url,
            query.payload()?,
            Vec::<(String, String)>::new(),
            Headers::default(),
        )?;
        Ok((builder, QueryResponseHandler(PhantomData)))
    }

    fn query<T: DeserializeOwned>(&self, query: &NodeQuery) -> Result<T, NodeError> {
        let (builder, handler) =
            self.prepare_query::<DefaultRequestBuilder, T>(query)?;
        trace!(query = query.name(), "Sending node query");
        handler.handle(&builder.send()?)
    }

    fn query_directory<T: DeserializeOwned>(&self, query: &NodeQuery) -> Result<T, NodeError> {
        let (builder, handler) = self
            .prepare_query_against::<DefaultRequestBuilder, T>(query, DIRECTORY_CHAIN_PATH)?;
        trace!(query = query.name(), "Sending directory-chain query");
        handler.handle(&builder.send()?)
    }

    /// Active blockchains hosted on the network, from the directory chain.
    ///
    /// # Errors
    /// Fails if the node rejects the query or the transport fails.
    pub fn blockchains(&self) -> Result<Vec<BlockchainInfo>, NodeError> {
        let entries: Vec<BlockchainEntry> =
            self.query_directory(&NodeQuery::new("get_blockchains", json!({})))?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.active)
            .map(|entry| BlockchainInfo {
                name: entry.name,
                rid: entry.rid,
            })
            .collect())
    }

    /// Balance of `asset` on `account`, `None` when the account holds none.
    ///
    /// # Errors
    /// Fails if the node rejects the query or the transport fails.
    pub fn asset_balance(
        &self,
        account_id: AccountId,
        asset_id: AssetId,
    ) -> Result<Option<Amount>, NodeError> {
        let query = NodeQuery::new(
            "ft.get_asset_balance",
            json!({ "account_id": account_id, "asset_id": asset_id }),
        );
        match self.query::<BalanceInfo>(&query) {
            Ok(balance) => Ok(Some(balance.amount)),
            Err(NodeError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Assets matching a ticker symbol.
    ///
    /// # Errors
    /// Fails if the node rejects the query or the transport fails.
    pub fn assets_by_symbol(&self, symbol: &str) -> Result<Vec<Asset>, NodeError> {
        self.query(&NodeQuery::new(
            "ft.get_assets_by_symbol",
            json!({ "symbol": symbol }),
        ))
    }

    /// The account's current main auth descriptor.
    ///
    /// # Errors
    /// [`NodeError::NotFound`] if the account is not registered.
    pub fn main_auth_descriptor(
        &self,
        account_id: AccountId,
    ) -> Result<AuthDescriptor, NodeError> {
        self.query(&NodeQuery::new(
            "ft.get_account_main_auth_descriptor",
            json!({ "account_id": account_id }),
        ))
    }

    /// Replay counter of the given auth descriptor.
    ///
    /// # Errors
    /// Fails if the node rejects the query or the transport fails.
    pub fn auth_descriptor_counter(
        &self,
        account_id: AccountId,
        descriptor_id: Hash,
    ) -> Result<u64, NodeError> {
        self.query(&NodeQuery::new(
            "ft.get_auth_descriptor_counter",
            json!({ "account_id": account_id, "auth_descriptor_id": descriptor_id }),
        ))
    }

    /// Authorization message template for `operation`, with placeholders.
    ///
    /// # Errors
    /// Fails if the node rejects the query or the transport fails.
    pub fn auth_message_template(&self, operation: &Operation) -> Result<String, NodeError> {
        self.query(&NodeQuery::new(
            "ft.get_auth_message_template",
            json!({ "operation": operation }),
        ))
    }

    /// Full registration message covering the strategy and register
    /// operations, ready for co-signing.
    ///
    /// # Errors
    /// Fails if the node rejects the query or the transport fails.
    pub fn register_account_message(
        &self,
        strategy: &Operation,
        register: &Operation,
    ) -> Result<String, NodeError> {
        self.query(&Self::register_message_query(strategy, register))
    }

    /// Fill `B` with the registration-message query.
    ///
    /// # Errors
    /// Fails if the request cannot be assembled.
    pub fn prepare_register_account_message<B: RequestBuilder>(
        &self,
        strategy: &Operation,
        register: &Operation,
    ) -> Result<(B, QueryResponseHandler<String>)> {
        self.prepare_query(&Self::register_message_query(strategy, register))
    }

    fn register_message_query(strategy: &Operation, register: &Operation) -> NodeQuery {
        NodeQuery::new(
            "ft.get_register_account_message",
            json!({ "strategy": strategy, "register": register }),
        )
    }

    /// Registration strategies for which `recipient` has a pending fee
    /// transfer; empty when nothing awaits registration.
    ///
    /// # Errors
    /// Fails if the node rejects the query or the transport fails.
    pub fn pending_transfer_strategies(
        &self,
        recipient_id: AccountId,
    ) -> Result<Vec<String>, NodeError> {
        self.query(&NodeQuery::new(
            "ft.get_pending_transfer_strategies",
            json!({ "recipient_id": recipient_id }),
        ))
    }

    /// Fill `B` with a transaction submission request.
    ///
    /// # Errors
    /// Fails if the request cannot be assembled.
    pub fn prepare_submit<B: RequestBuilder>(&self, envelope: &TxEnvelope) -> Result<B> {
        let url = self.endpoint("tx", &self.blockchain_rid.to_string())?;
        let payload = serde_json::to_vec(&json!({ "tx": envelope.to_hex() }))
            .wrap_err("Failed to serialize transaction payload")?;
        B::build(
            Method::POST,
            url,
            payload,
            Vec::<(String, String)>::new(),
            Headers::default(),
        )
    }

    /// Submit an assembled envelope to the bound chain.
    ///
    /// # Errors
    /// [`NodeError::Rejected`] if the node refuses the transaction.
    pub fn submit_transaction(&self, envelope: &TxEnvelope) -> Result<(), NodeError> {
        let builder = self.prepare_submit::<DefaultRequestBuilder>(envelope)?;
        let response = builder.send()?;
        match response.status() {
            StatusCode::OK => {
                info!(blockchain_rid = %self.blockchain_rid, "Transaction submitted");
                Ok(())
            }
            status => Err(NodeError::Rejected {
                reason: format!("{status}: {}", String::from_utf8_lossy(response.body())),
            }),
        }
    }
}

/// The node surface the signing flows drive: the auth-message queries plus
/// registration state, balances and submission.
///
/// [`NodeClient`] is the production implementation; tests substitute an
/// in-memory fixture.
pub trait Ledger: crate::auth::AuthDataSource {
    /// Registration strategies for which `recipient_id` has a completed fee
    /// transfer; empty before the fee is paid.
    ///
    /// # Errors
    /// Fails if the ledger cannot be reached or rejects the query.
    fn pending_transfer_strategies(
        &self,
        recipient_id: AccountId,
    ) -> Result<Vec<String>, NodeError>;

    /// Balance of `asset_id` on `account_id`, `None` when the account holds
    /// none.
    ///
    /// # Errors
    /// Fails if the ledger cannot be reached or rejects the query.
    fn asset_balance(
        &self,
        account_id: AccountId,
        asset_id: AssetId,
    ) -> Result<Option<Amount>, NodeError>;

    /// Registration message covering the strategy and register operations.
    ///
    /// # Errors
    /// Fails if the ledger cannot be reached or rejects the query.
    fn register_account_message(
        &self,
        strategy: &Operation,
        register: &Operation,
    ) -> Result<String, NodeError>;

    /// Submit an assembled envelope.
    ///
    /// # Errors
    /// [`NodeError::Rejected`] if the ledger refuses the transaction.
    fn submit_transaction(&self, envelope: &TxEnvelope) -> Result<(), NodeError>;
}

impl Ledger for NodeClient {
    fn pending_transfer_strategies(
        &self,
        recipient_id: AccountId,
    ) -> Result<Vec<String>, NodeError> {
        self.pending_transfer_strategies(recipient_id)
    }

    fn asset_balance(
        &self,
        account_id: AccountId,
        asset_id: AssetId,
    ) -> Result<Option<Amount>, NodeError> {
        self.asset_balance(account_id, asset_id)
    }

    fn register_account_message(
        &self,
        strategy: &Operation,
        register: &Operation,
    ) -> Result<String, NodeError> {
        self.register_account_message(strategy, register)
    }

    fn submit_transaction(&self, envelope: &TxEnvelope) -> Result<(), NodeError> {
        self.submit_transaction(envelope)
    }
}

impl crate::auth::AuthDataSource for NodeClient {
    fn blockchain_rid(&self) -> BlockchainRid {
        self.blockchain_rid
    }

    fn auth_message_template(&self, operation: &Operation) -> Result<String, NodeError> {
        self.auth_message_template(operation)
    }

    fn main_auth_descriptor(&self, account_id: AccountId) -> Result<AuthDescriptor, NodeError> {
        self.main_auth_descriptor(account_id)
    }

    fn auth_descriptor_counter(
        &self,
        account_id: AccountId,
        descriptor_id: Hash,
    ) -> Result<u64, NodeError> {
        self.auth_descriptor_counter(account_id, descriptor_id)
    }
}
