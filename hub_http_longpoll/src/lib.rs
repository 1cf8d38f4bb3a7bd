//! # Hub HTTP Long-Poll Transport
//!
//! A long-polling transport for hub connections. It emulates a persistent,
//! bidirectional connection on top of plain HTTP request-response pairs,
//! for environments where WebSockets or server-sent events are unavailable.
//!
//! # Protocol
//!
//! ```text
//! ┌──────────┐                          ┌──────────┐
//! │  Client  │                          │  Server  │
//! └────┬─────┘                          └────┬─────┘
//!      │                                     │
//!      │  GET {url}&_=<millis>   (probe)     │
//!      │ ──────────────────────────────────► │
//!      │  200                                │
//!      │ ◄────────────────────────────────── │
//!      │                                     │
//!      │  GET {url}&_=<millis>   (poll)      │
//!      │ ──────────────────────────────────► │
//!      │           ... (blocks) ...          │
//!      │  200 + payload  /  200 keep-alive   │
//!      │ ◄────────────────────────────────── │
//!      │                                     │
//!      │  POST {url}             (send)      │
//!      │ ──────────────────────────────────► │
//!      │                                     │
//!      │  DELETE {url}           (stop)      │
//!      │ ──────────────────────────────────► │
//!      │                                     │
//!      │  204 on a poll: server closed       │
//!      │ ◄────────────────────────────────── │
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  LongPollingTransport                    │
//! │                                                          │
//! │  start(url) ── probe GET ──► spawn(poll_loop)            │
//! │                                   │                      │
//! │                                   ├─► on_receive(bytes)  │
//! │                                   └─► on_close(reason)   │
//! │                                                          │
//! │  send(msg) ── POST ──►     stop() ── DELETE ──► on_close │
//! │                                                          │
//! │  state: AtomicU8 (Idle → Probing → Active → Stopped)     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - `reqwest` — `http_client::ReqwestHttpClient`
//! - `tokio` — `spawn::TokioSpawn`
//! - `test_utils` — a scripted in-memory fetch client for tests

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cache_buster;
pub mod callbacks;
pub mod error;
pub mod http_client;
pub mod spawn;
pub mod state;
pub mod transport;

#[cfg(any(test, feature = "test_utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test_utils")))]
pub mod test_utils;

pub use transport::{LongPollingTransport, Transport, TransportOptions};

/// Default name of the cache-busting query parameter.
pub const DEFAULT_CACHE_BUSTER_PARAM: &str = "_";

/// Default timeout for a single HTTP request, including a held poll (120 seconds).
///
/// Must exceed the server's long-poll hold time, otherwise idle polls
/// surface as request failures and close the transport.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
