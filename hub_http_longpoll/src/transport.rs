//! The long-polling transport.
//!
//! Provides [`LongPollingTransport`], which implements [`Transport`] by
//! probing the server once, then repeatedly issuing held `GET` requests on
//! a background task and forwarding each payload to the receive callback.
//!
//! Every path from [`State::Active`] into [`State::Stopped`] goes through a
//! single compare-exchange. Whoever wins it (the poll loop on a 204 or an
//! error, or `stop()`) fires the close callback, so it fires exactly once.

mod poll_loop;

use std::{
    collections::BTreeMap,
    sync::{Arc, OnceLock},
};

use futures::{FutureExt, future::BoxFuture};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    DEFAULT_CACHE_BUSTER_PARAM,
    cache_buster::CacheBuster,
    callbacks::{Callbacks, OnClose, OnReceive},
    error::{SendError, StartError, StopError, TransportError},
    http_client::{HttpClient, HttpResponse},
    spawn::Spawn,
    state::{AtomicState, State},
};

use poll_loop::poll_loop;

/// The interface a hub connection drives a transport through.
pub trait Transport: Send + Sync {
    /// Error returned by [`start`](Self::start).
    type StartError: core::error::Error + Send + 'static;

    /// Error returned by [`send`](Self::send).
    type SendError: core::error::Error + Send + 'static;

    /// Error returned by [`stop`](Self::stop).
    type StopError: core::error::Error + Send + 'static;

    /// Connect to `url` and begin delivering messages.
    fn start<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), Self::StartError>>;

    /// Send one message to the server.
    fn send(&self, message: Vec<u8>) -> BoxFuture<'_, Result<(), Self::SendError>>;

    /// Disconnect and notify the close callback.
    fn stop(&self) -> BoxFuture<'_, Result<(), Self::StopError>>;

    /// Register the message callback, replacing any previous one.
    fn set_on_receive(&self, callback: OnReceive);

    /// Register the close callback, replacing any previous one.
    fn set_on_close(&self, callback: OnClose);
}

/// Immutable configuration supplied at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Headers attached to every request.
    pub headers: BTreeMap<String, String>,

    /// Name of the cache-busting query parameter added to poll requests.
    pub cache_buster_param: String,
}

impl TransportOptions {
    /// Add a header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Use a different cache-busting query parameter name.
    #[must_use]
    pub fn with_cache_buster_param(mut self, param: impl Into<String>) -> Self {
        self.cache_buster_param = param.into();
        self
    }
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            cache_buster_param: DEFAULT_CACHE_BUSTER_PARAM.into(),
        }
    }
}

/// State shared between the transport handle and its poll loop.
struct Shared<H> {
    http: H,
    headers: Vec<(String, String)>,
    cache_buster: CacheBuster,
    state: AtomicState,
    url: OnceLock<Url>,
    callbacks: Callbacks,
}

impl<H: HttpClient> Shared<H> {
    fn header_pairs(&self) -> Vec<(&str, &str)> {
        self.headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let headers = self.header_pairs();
        self.http
            .get(url.as_str(), &headers)
            .await
            .map_err(|e| TransportError::request(&e))
    }

    async fn notify_disconnect(&self, url: &Url) -> Result<(), TransportError> {
        let headers = self.header_pairs();
        let resp = self
            .http
            .delete(url.as_str(), &headers)
            .await
            .map_err(|e| TransportError::request(&e))?;

        if resp.is_success() {
            Ok(())
        } else {
            Err(TransportError::unexpected_status(resp.status, &resp.body))
        }
    }

    /// Move `Active → Stopped` and fire the close callback if this call won.
    fn close(&self, reason: Option<TransportError>) -> bool {
        if self.state.transition(State::Active, State::Stopped).is_ok() {
            self.callbacks.close(reason);
            true
        } else {
            debug!("transport already stopped, close notification suppressed");
            false
        }
    }
}

/// HTTP long-polling transport.
///
/// Cloning yields another handle to the same connection, so `stop()` can
/// be called from any thread or task.
///
/// # Type Parameters
///
/// - `H`: The HTTP client implementation
/// - `S`: The task spawner for the poll loop
pub struct LongPollingTransport<H, S> {
    shared: Arc<Shared<H>>,
    spawner: S,
}

impl<H, S: Clone> Clone for LongPollingTransport<H, S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            spawner: self.spawner.clone(),
        }
    }
}

impl<H, S> core::fmt::Debug for LongPollingTransport<H, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LongPollingTransport")
            .field("state", &self.shared.state.load())
            .field("url", &self.shared.url.get().map(Url::as_str))
            .field("callbacks", &self.shared.callbacks)
            .finish_non_exhaustive()
    }
}

impl<H, S> LongPollingTransport<H, S>
where
    H: HttpClient,
    S: Spawn + Send + Sync + 'static,
{
    /// Create an idle transport.
    ///
    /// - `http`: The fetch client used for every request.
    /// - `spawner`: Launches the poll loop once `start` succeeds.
    /// - `options`: Headers and cache-buster configuration.
    #[must_use]
    pub fn new(http: H, spawner: S, options: TransportOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                http,
                headers: options.headers.into_iter().collect(),
                cache_buster: CacheBuster::new(options.cache_buster_param),
                state: AtomicState::new(),
                url: OnceLock::new(),
                callbacks: Callbacks::default(),
            }),
            spawner,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.shared.state.load()
    }

    /// Whether the poll loop is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == State::Active
    }

    /// The connection URL recorded by `start`.
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.shared.url.get()
    }

    /// Register the message callback.
    ///
    /// Must be called before [`start`](Self::start).
    pub fn set_on_receive(&self, callback: impl Fn(Vec<u8>) + Send + Sync + 'static) {
        self.shared.callbacks.set_on_receive(Arc::new(callback));
    }

    /// Register the close callback.
    ///
    /// Must be called before [`start`](Self::start).
    pub fn set_on_close(
        &self,
        callback: impl Fn(Option<TransportError>) + Send + Sync + 'static,
    ) {
        self.shared.callbacks.set_on_close(Arc::new(callback));
    }

    /// Probe `url` and, on a 200, launch the poll loop.
    ///
    /// Resolves once the probe has completed. The close callback is never
    /// invoked for a failed start.
    ///
    /// # Errors
    ///
    /// - [`StartError::ConnectionFailed`] if the probe fails or returns anything but 200
    /// - [`StartError::InvalidState`] if the transport was already started
    /// - [`StartError::InvalidUrl`] if `url` does not parse
    /// - [`StartError::CallbackNotSet`] if a callback is missing
    /// - [`StartError::StoppedWhileConnecting`] if `stop` raced the probe
    /// - [`StartError::Spawn`] if the poll loop could not be launched
    pub async fn start(&self, url: &str) -> Result<(), StartError> {
        let url = Url::parse(url)?;

        if let Some(name) = self.shared.callbacks.missing() {
            return Err(StartError::CallbackNotSet(name));
        }

        self.shared
            .state
            .transition(State::Idle, State::Probing)
            .map_err(StartError::InvalidState)?;

        info!(%url, "starting long-polling transport");
        let url = self.shared.url.get_or_init(|| url).clone();

        let probe_url = self.shared.cache_buster.decorate(&url);
        debug!(url = %probe_url, "probing");

        let probe = self.shared.get(&probe_url).await.and_then(|resp| {
            if resp.status == 200 {
                Ok(())
            } else {
                Err(TransportError::unexpected_status(resp.status, &resp.body))
            }
        });

        if let Err(reason) = probe {
            error!(error = %reason, "long-polling probe failed");
            // stop() may already have moved us to Stopped; either way we end there.
            let _ = self.shared.state.transition(State::Probing, State::Stopped);
            return Err(StartError::ConnectionFailed(reason));
        }

        if self
            .shared
            .state
            .transition(State::Probing, State::Active)
            .is_err()
        {
            warn!("transport stopped while connecting");
            self.notify_disconnect_best_effort(&url).await;
            return Err(StartError::StoppedWhileConnecting);
        }

        let loop_shared = self.shared.clone();
        if let Err(e) = self.spawner.spawn(poll_loop(loop_shared, url.clone()).boxed()) {
            error!(error = %e, "failed to spawn poll loop");
            if self
                .shared
                .state
                .transition(State::Active, State::Stopped)
                .is_ok()
            {
                self.notify_disconnect_best_effort(&url).await;
            }
            return Err(e.into());
        }

        Ok(())
    }

    /// POST `message` to the connection URL.
    ///
    /// Independent of the poll loop: it neither reads nor changes the
    /// lifecycle state.
    ///
    /// # Errors
    ///
    /// - [`SendError::NotStarted`] if `start` was never called
    /// - [`SendError::Failed`] if the request fails or returns a non-2xx status
    pub async fn send(&self, message: impl Into<Vec<u8>>) -> Result<(), SendError> {
        let url = self.shared.url.get().ok_or(SendError::NotStarted)?;
        let body = message.into();
        debug!(%url, len = body.len(), "sending message");

        let headers = self.shared.header_pairs();
        let resp = self
            .shared
            .http
            .post(url.as_str(), &headers, body)
            .await
            .map_err(|e| SendError::Failed(TransportError::request(&e)))?;

        if !resp.is_success() {
            error!(status = resp.status, "send failed");
            return Err(SendError::Failed(TransportError::unexpected_status(
                resp.status,
                &resp.body,
            )));
        }

        Ok(())
    }

    /// Deactivate the poll loop, DELETE the connection URL, and fire the
    /// close callback with no error.
    ///
    /// Does not wait for an in-flight poll; the loop exits once it returns.
    /// Calling this on a transport that is idle or already stopped does
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StopError::Notify`] if the DELETE failed. The close
    /// callback has fired regardless.
    pub async fn stop(&self) -> Result<(), StopError> {
        match self.shared.state.deactivate() {
            Some(State::Active) => {
                info!("long-polling transport stopped");

                let notified = match self.shared.url.get() {
                    Some(url) => self.shared.notify_disconnect(url).await,
                    None => Ok(()),
                };

                if let Err(e) = &notified {
                    warn!(error = %e, "failed to notify server of disconnect");
                }

                self.shared.callbacks.close(None);
                notified.map_err(StopError::Notify)
            }
            Some(_) => {
                info!("long-polling transport stopped before connecting");
                Ok(())
            }
            None => {
                debug!(state = ?self.state(), "stop ignored, transport not running");
                Ok(())
            }
        }
    }

    async fn notify_disconnect_best_effort(&self, url: &Url) {
        if let Err(e) = self.shared.notify_disconnect(url).await {
            warn!(error = %e, "failed to notify server of disconnect");
        }
    }
}

impl<H, S> Transport for LongPollingTransport<H, S>
where
    H: HttpClient,
    S: Spawn + Send + Sync + 'static,
{
    type StartError = StartError;
    type SendError = SendError;
    type StopError = StopError;

    fn start<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<(), StartError>> {
        Self::start(self, url).boxed()
    }

    fn send(&self, message: Vec<u8>) -> BoxFuture<'_, Result<(), SendError>> {
        Self::send(self, message).boxed()
    }

    fn stop(&self) -> BoxFuture<'_, Result<(), StopError>> {
        Self::stop(self).boxed()
    }

    fn set_on_receive(&self, callback: OnReceive) {
        self.shared.callbacks.set_on_receive(callback);
    }

    fn set_on_close(&self, callback: OnClose) {
        self.shared.callbacks.set_on_close(callback);
    }
}
