//! [`reqwest`]-backed implementation of [`HttpClient`].

use core::time::Duration;

use futures::{FutureExt, future::BoxFuture};

use super::{HttpClient, HttpResponse};

/// Error type for the reqwest-based HTTP client.
#[derive(Debug, thiserror::Error)]
#[error("HTTP request failed: {0}")]
pub struct ReqwestHttpError(#[from] reqwest::Error);

/// A [`reqwest`]-backed implementation of [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    inner: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a new client with [`DEFAULT_REQUEST_TIMEOUT_SECS`](crate::DEFAULT_REQUEST_TIMEOUT_SECS).
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(crate::DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Create a new client with a custom per-request timeout.
    ///
    /// This bounds how long a held poll may block, and so how long the
    /// poll loop may outlive `stop()`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Wrap an already configured [`reqwest::Client`].
    #[must_use]
    pub const fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    fn execute(
        builder: reqwest::RequestBuilder,
        headers: &[(&str, &str)],
    ) -> BoxFuture<'static, Result<HttpResponse, ReqwestHttpError>> {
        let builder = headers
            .iter()
            .fold(builder, |b, &(name, value)| b.header(name, value));

        async move {
            let resp = builder.send().await?;
            let status = resp.status().as_u16();

            let resp_headers: Vec<(String, String)> = resp
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_lowercase(), v.to_string()))
                })
                .collect();

            let body = resp.bytes().await?.to_vec();

            Ok(HttpResponse {
                status,
                body,
                headers: resp_headers,
            })
        }
        .boxed()
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    type Error = ReqwestHttpError;

    fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>> {
        Self::execute(self.inner.get(url), headers)
    }

    fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>> {
        Self::execute(self.inner.post(url).body(body), headers)
    }

    fn delete(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>> {
        Self::execute(self.inner.delete(url), headers)
    }
}
