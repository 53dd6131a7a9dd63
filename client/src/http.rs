//! Abstraction over the blocking HTTP transport shared by the node and
//! backend clients.

use std::{borrow::Borrow, collections::HashMap};

use eyre::Result;
pub use http::{Method, Response, StatusCode};

/// Type alias for HTTP headers hash map.
pub type Headers = HashMap<String, String>;

/// General trait for building http-requests.
///
/// To use a custom transport, implement this trait for some type and pass it
/// to the `prepare_*` methods; the clients will fill the request in.
pub trait RequestBuilder: Sized {
    /// Entirely construct the request with all its parts.
    ///
    /// # Errors
    /// Fails if the request parts cannot be assembled, e.g. a header name is
    /// malformed.
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
        V: ToString;
}
