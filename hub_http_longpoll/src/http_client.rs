//! Fetch-client abstraction used by the long-poll transport.
//!
//! The transport only needs three verbs. Implementations handle the
//! mechanics of making requests (TLS, connection pooling, timeouts) while
//! this trait exposes a single awaited round-trip per call.

#[cfg(feature = "reqwest")]
mod reqwest_client;

#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
pub use reqwest_client::{ReqwestHttpClient, ReqwestHttpError};

use futures::future::BoxFuture;

/// A minimal async HTTP client.
///
/// Headers are passed as borrowed name/value pairs.
pub trait HttpClient: Clone + Send + Sync + 'static {
    /// The error type for HTTP operations.
    type Error: core::error::Error + Send + 'static;

    /// Send a GET request.
    fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>>;

    /// Send a POST request with `body`.
    fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>>;

    /// Send a DELETE request.
    fn delete(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>>;
}

/// A minimal HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,

    /// The response body bytes.
    pub body: Vec<u8>,

    /// Selected response headers (lowercase keys).
    pub headers: Vec<(String, String)>,
}

impl HttpResponse {
    /// A response with the given status and an empty body.
    #[must_use]
    pub const fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// A 200 response carrying `body`.
    #[must_use]
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            headers: Vec::new(),
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Look up a response header by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k == &lower)
            .map(|(_, v)| v.as_str())
    }
}
