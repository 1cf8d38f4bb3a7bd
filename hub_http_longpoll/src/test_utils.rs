//! Test utilities: a scripted, in-memory [`HttpClient`].
//!
//! GET requests behave like held long polls: each one waits until the test
//! pushes a response with [`ScriptedHttpClient::push_get`]. POST and DELETE
//! responses are taken from per-method queues and default to `200` with an
//! empty body. Every request is recorded.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use futures::{FutureExt, future::BoxFuture};
use thiserror::Error;

use crate::http_client::{HttpClient, HttpResponse};

/// HTTP method of a recorded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

/// A request observed by [`ScriptedHttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// The HTTP method.
    pub method: Method,
    /// The full request URL.
    pub url: String,
    /// The request headers, in the order given.
    pub headers: Vec<(String, String)>,
    /// The request body (empty for GET and DELETE).
    pub body: Vec<u8>,
}

/// A scripted request failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("scripted failure: {0}")]
pub struct ScriptedError(pub String);

type Scripted = Result<HttpResponse, ScriptedError>;

#[derive(Debug)]
struct Inner {
    get_tx: async_channel::Sender<Scripted>,
    get_rx: async_channel::Receiver<Scripted>,
    posts: Mutex<VecDeque<Scripted>>,
    deletes: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<RecordedRequest>>,
    request_tx: async_channel::Sender<RecordedRequest>,
    request_rx: async_channel::Receiver<RecordedRequest>,
}

/// A scripted in-memory HTTP client.
#[derive(Debug, Clone)]
pub struct ScriptedHttpClient {
    inner: Arc<Inner>,
}

impl ScriptedHttpClient {
    /// Create a client with empty scripts.
    #[must_use]
    pub fn new() -> Self {
        let (get_tx, get_rx) = async_channel::unbounded();
        let (request_tx, request_rx) = async_channel::unbounded();
        Self {
            inner: Arc::new(Inner {
                get_tx,
                get_rx,
                posts: Mutex::new(VecDeque::new()),
                deletes: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
                request_tx,
                request_rx,
            }),
        }
    }

    /// Answer the oldest waiting (or next) GET.
    pub fn push_get(&self, response: Result<HttpResponse, ScriptedError>) {
        // The client holds the receiver, so the channel never closes.
        let _ = self.inner.get_tx.try_send(response);
    }

    /// Queue the response for the next POST.
    pub fn push_post(&self, response: Result<HttpResponse, ScriptedError>) {
        lock(&self.inner.posts).push_back(response);
    }

    /// Queue the response for the next DELETE.
    pub fn push_delete(&self, response: Result<HttpResponse, ScriptedError>) {
        lock(&self.inner.deletes).push_back(response);
    }

    /// All requests issued so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.inner.requests).clone()
    }

    /// Requests issued so far with the given method.
    #[must_use]
    pub fn requests_with(&self, method: Method) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    /// Wait for the next request to be issued (in issue order).
    pub async fn next_request(&self) -> Option<RecordedRequest> {
        self.inner.request_rx.recv().await.ok()
    }

    fn record(&self, method: Method, url: &str, headers: &[(&str, &str)], body: Vec<u8>) {
        let request = RecordedRequest {
            method,
            url: url.to_owned(),
            headers: headers
                .iter()
                .map(|&(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
            body,
        };
        lock(&self.inner.requests).push(request.clone());
        let _ = self.inner.request_tx.try_send(request);
    }

    fn queued(queue: &Mutex<VecDeque<Scripted>>) -> Scripted {
        lock(queue)
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::status(200)))
    }
}

impl Default for ScriptedHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ScriptedHttpClient {
    type Error = ScriptedError;

    fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>> {
        self.record(Method::Get, url, headers, Vec::new());
        let rx = self.inner.get_rx.clone();
        async move {
            rx.recv()
                .await
                .unwrap_or_else(|_| Err(ScriptedError("script closed".into())))
        }
        .boxed()
    }

    fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>> {
        self.record(Method::Post, url, headers, body);
        let response = Self::queued(&self.inner.posts);
        async move { response }.boxed()
    }

    fn delete(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> BoxFuture<'_, Result<HttpResponse, Self::Error>> {
        self.record(Method::Delete, url, headers, Vec::new());
        let response = Self::queued(&self.inner.deletes);
        async move { response }.boxed()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
