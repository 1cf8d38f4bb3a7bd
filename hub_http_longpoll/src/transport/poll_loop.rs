//! Background polling task for receiving server messages.

use std::sync::Arc;

use tracing::{debug, error, info};
use url::Url;

use super::Shared;
use crate::{
    error::TransportError,
    http_client::{HttpClient, HttpResponse},
    state::State,
};

/// What a single poll response means for the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum PollOutcome {
    /// 200 with a body.
    Message(Vec<u8>),

    /// 200 with an empty body.
    KeepAlive,

    /// 204: the server closed the connection gracefully.
    ServerClosed,
}

/// Classify a poll response. Anything but 200 or 204 is an error close.
pub(super) fn interpret(resp: HttpResponse) -> Result<PollOutcome, TransportError> {
    match resp.status {
        200 if resp.body.is_empty() => Ok(PollOutcome::KeepAlive),
        200 => Ok(PollOutcome::Message(resp.body)),
        204 => Ok(PollOutcome::ServerClosed),
        status => Err(TransportError::unexpected_status(status, &resp.body)),
    }
}

/// Run the poll loop until the transport is deactivated or the server ends
/// the connection.
///
/// The state is checked before every request, never during one.
pub(super) async fn poll_loop<H: HttpClient>(shared: Arc<Shared<H>>, url: Url) {
    info!(%url, "starting poll loop");

    while shared.state.load() == State::Active {
        let poll_url = shared.cache_buster.decorate(&url);
        debug!(url = %poll_url, "polling");

        match shared.get(&poll_url).await.and_then(interpret) {
            Ok(PollOutcome::Message(body)) => {
                if shared.state.load() != State::Active {
                    debug!(len = body.len(), "discarding message received after stop");
                    break;
                }

                debug!(len = body.len(), "message received");
                shared.callbacks.receive(body);
            }
            Ok(PollOutcome::KeepAlive) => {
                debug!("keep-alive poll, re-polling");
            }
            Ok(PollOutcome::ServerClosed) => {
                info!("long-polling transport terminated by server");
                shared.close(None);
                break;
            }
            Err(reason) => {
                error!(error = %reason, "poll failed, closing transport");
                if !shared.close(Some(reason)) {
                    debug!("poll failure after stop ignored");
                }
                break;
            }
        }
    }

    info!("poll loop exited");
}
