//! Cache-busting decoration for poll URLs.
//!
//! Intermediaries may cache `GET` responses. Every poll therefore carries a
//! query parameter holding a millisecond timestamp that differs from the
//! previous request's.

use core::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use url::Url;

use crate::DEFAULT_CACHE_BUSTER_PARAM;

/// Append `param=stamp` to `base`, keeping any existing query pairs.
#[must_use]
pub fn poll_url(base: &Url, param: &str, stamp: u64) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair(param, &stamp.to_string());
    url
}

/// Produces strictly increasing timestamps for successive poll URLs.
#[derive(Debug)]
pub struct CacheBuster {
    param: String,
    last: AtomicU64,
}

impl CacheBuster {
    /// Create a cache buster using the given query parameter name.
    #[must_use]
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            last: AtomicU64::new(0),
        }
    }

    /// The query parameter name.
    #[must_use]
    pub fn param(&self) -> &str {
        &self.param
    }

    /// Next stamp: the current wall-clock milliseconds, or one past the
    /// previous stamp if the clock has not moved forward.
    pub fn next_stamp(&self) -> u64 {
        self.next_stamp_at(now_millis())
    }

    fn next_stamp_at(&self, now: u64) -> u64 {
        let advance = |last: u64| now.max(last.saturating_add(1));
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(advance(last)))
            .unwrap_or_else(|last| last);
        advance(previous)
    }

    /// A freshly stamped poll URL for `base`.
    #[must_use]
    pub fn decorate(&self, base: &Url) -> Url {
        poll_url(base, &self.param, self.next_stamp())
    }
}

impl Default for CacheBuster {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_BUSTER_PARAM)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
