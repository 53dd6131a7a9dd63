//! Request preparation against a recording transport: verifies the exact
//! urls, query params, headers and bodies the clients would send, without
//! any network.

use std::borrow::Borrow;

use eyre::Result;
use syndic_client::{
    backend::{BackendClient, SignRequest},
    http::{Headers, Method, RequestBuilder},
    node::NodeClient,
    prelude::*,
};
use syndic_config::{BasicAuth, Configuration};

/// Transport double that records the request instead of sending it.
struct RecordingRequestBuilder {
    method: Method,
    url: String,
    body: Vec<u8>,
    params: Vec<(String, String)>,
    headers: Headers,
}

impl RequestBuilder for RecordingRequestBuilder {
    fn build<U, P, K, V>(
        method: Method,
        url: U,
        body: Vec<u8>,
        query_params: P,
        headers: Headers,
    ) -> Result<Self>
    where
        U: AsRef<str>,
        P: IntoIterator,
        P::Item: Borrow<(K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        let params = query_params
            .into_iter()
            .map(|pair| {
                let (key, value) = pair.borrow();
                (key.as_ref().to_owned(), value.to_string())
            })
            .collect();
        Ok(Self {
            method,
            url: url.as_ref().to_owned(),
            body,
            params,
            headers,
        })
    }
}

fn backend() -> BackendClient {
    let configuration = Configuration {
        basic_auth: Some(BasicAuth {
            web_login: "mad_hatter".to_owned(),
            password: "ilovetea".to_owned(),
        }),
        ..Configuration::default()
    };
    BackendClient::new(&configuration)
}

#[test]
fn list_transactions_request_carries_query_params_and_auth() {
    let query = ListQuery {
        pagination: Pagination::new(Some(2), Some(25)),
        sorting: Sorting::by_field("createdAt", SortOrder::Desc),
        status: Some(TransactionStatus::Pending),
        tx_type: None,
        search: None,
    };

    let (request, _handler) = backend()
        .prepare_list_transactions::<RecordingRequestBuilder>(query)
        .unwrap();

    assert_eq!(request.method, Method::GET);
    assert!(request.url.ends_with("/transactions"));
    assert!(request.body.is_empty());
    assert!(request
        .params
        .contains(&("page".to_owned(), "2".to_owned())));
    assert!(request
        .params
        .contains(&("status".to_owned(), "pending".to_owned())));
    let authorization = request.headers.get("authorization").unwrap();
    assert!(authorization.starts_with("Basic "));
}

#[test]
fn list_accounts_request_without_filters_has_no_params() {
    let (request, _handler) = backend()
        .prepare_list_accounts::<RecordingRequestBuilder>(ListQuery::default())
        .unwrap();

    assert_eq!(request.method, Method::GET);
    assert!(request.url.ends_with("/accounts"));
    assert!(request.params.is_empty());
}

#[test]
fn node_query_request_targets_the_bound_chain() {
    let blockchain_rid: BlockchainRid = "E5".repeat(32).parse().unwrap();
    let node = NodeClient::with_node(
        "https://node0.testnet.chromia.com:7740".parse().unwrap(),
        blockchain_rid,
    );
    let query = syndic_client::node::NodeQuery::new(
        "ft.get_assets_by_symbol",
        serde_json::json!({ "symbol": "tCHR" }),
    );

    let (request, _handler) = node
        .prepare_query::<RecordingRequestBuilder, Vec<Asset>>(&query)
        .unwrap();

    assert_eq!(request.method, Method::POST);
    assert!(request.url.ends_with(&format!("/query/{blockchain_rid}")));
    let payload: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(payload["type"], "ft.get_assets_by_symbol");
    assert_eq!(payload["symbol"], "tCHR");
}

#[test]
fn register_message_request_names_both_operations() {
    let node = NodeClient::with_node(
        "https://node0.testnet.chromia.com:7740".parse().unwrap(),
        BlockchainRid::new([0xE5; 32]),
    );

    let (request, _handler) = node
        .prepare_register_account_message::<RecordingRequestBuilder>(
            &Operation::new("ft.strategy_open", vec![]),
            &Operation::register_account(),
        )
        .unwrap();

    assert_eq!(request.method, Method::POST);
    let payload: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(payload["type"], "ft.get_register_account_message");
    assert_eq!(payload["strategy"]["name"], "ft.strategy_open");
    assert_eq!(payload["register"]["name"], "ft.register_account");
}

#[test]
fn submit_request_wraps_the_envelope_hex() {
    let blockchain_rid = BlockchainRid::new([0xE5; 32]);
    let node = NodeClient::with_node(
        "https://node0.testnet.chromia.com:7740".parse().unwrap(),
        blockchain_rid,
    );
    let envelope = TxEnvelope::new(blockchain_rid, vec![Operation::nop()]);

    let request = node
        .prepare_submit::<RecordingRequestBuilder>(&envelope)
        .unwrap();

    assert_eq!(request.method, Method::POST);
    assert!(request.url.ends_with(&format!("/tx/{blockchain_rid}")));
    let payload: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(payload["tx"], envelope.to_hex());
}

#[test]
fn sign_request_payload_round_trips() {
    let signature = syndic_crypto::KeyPair::from_seed(b"payload".to_vec())
        .sign_message("authorize")
        .unwrap();
    let request = SignRequest {
        signature,
        tx: Some("deadbeef".to_owned()),
    };

    let json = serde_json::to_string(&request).unwrap();
    let back: SignRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(request, back);
}
