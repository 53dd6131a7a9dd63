//! Client for the bookkeeping backend: the REST service that stores pending
//! accounts and transactions while signatures are being collected, and
//! drives their lifecycle.

use std::marker::PhantomData;

use eyre::{Result, WrapErr};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use syndic_config::Configuration;
use syndic_crypto::Signature;
use syndic_data_model::prelude::*;
use syndic_logger::prelude::*;
use url::Url;

use crate::{
    http::{Headers, Method, RequestBuilder, Response, StatusCode},
    http_default::DefaultRequestBuilder,
};

/// Error of a backend call.
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum BackendError {
    /// Backend returned {status}: {message}
    Api {
        /// HTTP status of the response.
        status: StatusCode,
        /// Response body.
        message: String,
    },
    /// Transport or response-handling failure: {0}
    Transport(#[from] eyre::Report),
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items of the requested page.
    pub data: Vec<T>,
    /// Total number of items across all pages.
    pub total: u64,
}

/// Payload for proposing a new multisig account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    /// Parties entitled to co-sign, with display names.
    pub signers: Vec<Signer>,
    /// Signature threshold.
    pub signatures_required: u16,
}

/// Payload for proposing a new multisig transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// Kind of transaction.
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Parties entitled to co-sign.
    pub signers: Vec<Signer>,
    /// Signature threshold.
    pub signatures_required: u16,
    /// Hex-encoded envelope, when already assembled.
    pub tx: Option<String>,
}

/// Partial account update; absent fields stay untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountUpdate {
    /// New lifecycle status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AccountStatus>,
    /// Main auth descriptor, once resolved from the ledger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_descriptor: Option<AuthDescriptor>,
}

/// Payload of the sign action: one more collected signature, plus the
/// re-assembled envelope once the threshold is met.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequest {
    /// The co-signer's signature over the authorization message.
    pub signature: Signature,
    /// Hex-encoded envelope, present once assembly became possible.
    pub tx: Option<String>,
}

/// Output of a `prepare_*` call, awaiting the transport response.
#[derive(Debug)]
pub struct ApiResponseHandler<T>(PhantomData<T>);

impl<T> Copy for ApiResponseHandler<T> {}

impl<T> Clone for ApiResponseHandler<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: DeserializeOwned> ApiResponseHandler<T> {
    /// Decode the API result out of the backend's HTTP response.
    ///
    /// # Errors
    /// [`BackendError::Api`] on a non-success status,
    /// [`BackendError::Transport`] if the body is not the expected JSON.
    pub fn handle(self, response: &Response<Vec<u8>>) -> Result<T, BackendError> {
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => serde_json::from_slice(response.body())
                .map_err(|err| {
                    BackendError::Transport(eyre::eyre!("Failed to decode backend response: {err}"))
                }),
            status => Err(BackendError::Api {
                status,
                message: String::from_utf8_lossy(response.body()).into_owned(),
            }),
        }
    }
}

/// Client for the bookkeeping backend API.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: Url,
    headers: Headers,
}

impl BackendClient {
    /// Construct the client from configuration, attaching Basic
    /// Authentication when credentials are configured.
    pub fn new(configuration: &Configuration) -> Self {
        let mut headers = Headers::default();
        if let Some(basic_auth) = &configuration.basic_auth {
            let credentials =
                base64::encode(format!("{}:{}", basic_auth.web_login, basic_auth.password));
            headers.insert("authorization".to_owned(), format!("Basic {credentials}"));
        }
        Self {
            base_url: configuration.backend_api_url.clone(),
            headers,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/{path}")
            .parse()
            .wrap_err("Failed to construct backend endpoint url")
    }

    fn prepare<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
        params: Vec<(&'static str, String)>,
    ) -> Result<(B, ApiResponseHandler<T>)>
    where
        B: RequestBuilder,
        T: DeserializeOwned,
    {
        let builder = B::build(
            method,
            self.endpoint(path)?,
            body,
            params,
            self.headers.clone(),
        )?;
        Ok((builder, ApiResponseHandler(PhantomData)))
    }

    fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<T, BackendError> {
        let (builder, handler) =
            self.prepare::<DefaultRequestBuilder, T>(Method::GET, path, Vec::new(), params)?;
        handler.handle(&builder.send()?)
    }

    fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &impl Serialize,
    ) -> Result<T, BackendError> {
        let body = serde_json::to_vec(payload)
            .wrap_err("Failed to serialize backend request payload")?;
        let (builder, handler) =
            self.prepare::<DefaultRequestBuilder, T>(Method::POST, path, body, Vec::new())?;
        handler.handle(&builder.send()?)
    }

    /// Fill `B` with a list-accounts request; exposed for custom transports.
    ///
    /// # Errors
    /// Fails if the request cannot be assembled.
    pub fn prepare_list_accounts<B: RequestBuilder>(
        &self,
        query: ListQuery,
    ) -> Result<(B, ApiResponseHandler<Page<Account>>)> {
        self.prepare(Method::GET, "accounts", Vec::new(), query.into())
    }

    /// List tracked accounts.
    ///
    /// # Errors
    /// See [`BackendError`].
    pub fn list_accounts(&self, query: ListQuery) -> Result<Page<Account>, BackendError> {
        self.get("accounts", query.into())
    }

    /// Fetch one account by backend record id.
    ///
    /// # Errors
    /// See [`BackendError`].
    pub fn account(&self, id: &str) -> Result<Account, BackendError> {
        self.get(&format!("accounts/{id}"), Vec::new())
    }

    /// Propose a new multisig account.
    ///
    /// # Errors
    /// See [`BackendError`].
    pub fn create_account(&self, account: &NewAccount) -> Result<Account, BackendError> {
        info!(signers = account.signers.len(), "Proposing multisig account");
        self.post("accounts", account)
    }

    /// Apply a partial update to an account record.
    ///
    /// # Errors
    /// See [`BackendError`].
    pub fn update_account(
        &self,
        id: &str,
        update: &AccountUpdate,
    ) -> Result<Account, BackendError> {
        let body = serde_json::to_vec(update)
            .wrap_err("Failed to serialize backend request payload")?;
        let (builder, handler) = self.prepare::<DefaultRequestBuilder, Account>(
            Method::PUT,
            &format!("accounts/{id}"),
            body,
            Vec::new(),
        )?;
        handler.handle(&builder.send()?)
    }

    /// Record that the registration fee has been transferred.
    ///
    /// # Errors
    /// See [`BackendError`].
    pub fn mark_fee_transferred(&self, id: &str) -> Result<Account, BackendError> {
        self.post(&format!("accounts/{id}/transfer-fee"), &())
    }

    /// Record that the registration envelope has been submitted.
    ///
    /// # Errors
    /// See [`BackendError`].
    pub fn mark_registering(&self, id: &str) -> Result<Account, BackendError> {
        self.post(&format!("accounts/{id}/register"), &())
    }

    /// Fill `B` with a list-transactions request.
    ///
    /// # Errors
    /// Fails if the request cannot be assembled.
    pub fn prepare_list_transactions<B: RequestBuilder>(
        &self,
        query: ListQuery,
    ) -> Result<(B, ApiResponseHandler<Page<TransactionRecord>>)> {
        self.prepare(Method::GET, "transactions", Vec::new(), query.into())
    }

    /// List tracked transactions.
    ///
    /// # Errors
    /// See [`BackendError`].
    pub fn list_transactions(
        &self,
        query: ListQuery,
    ) -> Result<Page<TransactionRecord>, BackendError> {
        self.get("transactions", query.into())
    }

    /// Fetch one transaction by backend record id.
    ///
    /// # Errors
    /// See [`BackendError`].
    pub fn transaction(&self, id: &str) -> Result<TransactionRecord, BackendError> {
        self.get(&format!("transactions/{id}"), Vec::new())
    }

    /// Propose a new multisig transaction.
    ///
    /// # Errors
    /// See [`BackendError`].
    pub fn create_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<TransactionRecord, BackendError> {
        info!(tx_type = %transaction.tx_type, "Proposing multisig transaction");
        self.post("transactions", transaction)
    }

    /// Attach one more collected signature to a pending transaction.
    ///
    /// # Errors
    /// See [`BackendError`].
    pub fn sign_transaction(
        &self,
        id: &str,
        request: &SignRequest,
    ) -> Result<TransactionRecord, BackendError> {
        self.post(&format!("transactions/{id}/sign"), request)
    }

    /// Ask the backend to submit a ready transaction to the ledger.
    ///
    /// # Errors
    /// See [`BackendError`].
    pub fn execute_transaction(&self, id: &str) -> Result<TransactionRecord, BackendError> {
        self.post(&format!("transactions/{id}/execute"), &())
    }

    /// Reject a pending transaction, terminally.
    ///
    /// # Errors
    /// See [`BackendError`].
    pub fn reject_transaction(&self, id: &str) -> Result<TransactionRecord, BackendError> {
        self.post(&format!("transactions/{id}/reject"), &())
    }
}
