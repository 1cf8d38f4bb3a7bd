//! Error types for the HTTP long-poll transport.

use thiserror::Error;

use crate::state::State;

/// Why a request against the server did not succeed.
///
/// This is also the reason carried by the close callback when the poll
/// loop terminates abnormally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The HTTP request itself failed (network, timeout, ...).
    #[error("HTTP request error: {0}")]
    Request(String),

    /// The server answered with a status the transport does not expect.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// The HTTP status code.
        status: u16,
        /// The response body, lossily decoded as UTF-8.
        body: String,
    },
}

impl TransportError {
    /// Build an [`UnexpectedStatus`](Self::UnexpectedStatus) from a raw response.
    #[must_use]
    pub fn unexpected_status(status: u16, body: &[u8]) -> Self {
        Self::UnexpectedStatus {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// Wrap a fetch-client error.
    pub fn request(err: &impl core::error::Error) -> Self {
        Self::Request(err.to_string())
    }
}

/// Problem while starting the transport.
#[derive(Debug, Error)]
pub enum StartError {
    /// The initial probe did not return 200, or failed outright.
    #[error("failed to connect: {0}")]
    ConnectionFailed(TransportError),

    /// `start` was called on a transport that is not idle.
    #[error("transport cannot be started from state {0:?}")]
    InvalidState(State),

    /// The connection URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A required callback was not registered before `start`.
    #[error("callback not set: {0}")]
    CallbackNotSet(&'static str),

    /// `stop` was called while the probe was still in flight.
    #[error("transport stopped while connecting")]
    StoppedWhileConnecting,

    /// The poll loop could not be spawned.
    #[error(transparent)]
    Spawn(#[from] crate::spawn::SpawnError),
}

/// Problem while sending a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// `send` was called before the transport was started.
    #[error("transport not started")]
    NotStarted,

    /// The POST failed or returned a non-success status.
    #[error("send failed: {0}")]
    Failed(TransportError),
}

/// Problem while stopping the transport.
///
/// The close callback has already fired when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StopError {
    /// The DELETE notifying the server failed.
    #[error("failed to notify server of disconnect: {0}")]
    Notify(TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_status_decodes_body_lossily() {
        let err = TransportError::unexpected_status(503, b"busy \xff");
        assert_eq!(
            err,
            TransportError::UnexpectedStatus {
                status: 503,
                body: "busy \u{fffd}".into()
            }
        );
    }

    #[test]
    fn transport_error_displays() {
        let err = TransportError::unexpected_status(500, b"boom");
        assert_eq!(format!("{err}"), "unexpected status 500: boom");
    }

    #[test]
    fn start_error_displays() {
        let err = StartError::ConnectionFailed(TransportError::Request("refused".into()));
        assert_eq!(
            format!("{err}"),
            "failed to connect: HTTP request error: refused"
        );
    }

    #[test]
    fn send_error_displays() {
        assert_eq!(format!("{}", SendError::NotStarted), "transport not started");
    }

    #[test]
    fn stop_error_displays() {
        let err = StopError::Notify(TransportError::unexpected_status(404, b""));
        assert_eq!(
            format!("{err}"),
            "failed to notify server of disconnect: unexpected status 404: "
        );
    }
}
