//! Single-slot callback registrations.
//!
//! The owner registers one message sink and one close sink before starting
//! the transport. Registering again replaces the previous callback.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::TransportError;

/// Receives each payload delivered by the server, in arrival order.
pub type OnReceive = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

/// Receives the close notification: `None` for a graceful close (owner or
/// server initiated), `Some` with the cause otherwise.
pub type OnClose = Arc<dyn Fn(Option<TransportError>) + Send + Sync>;

/// The two callback slots of a transport.
#[derive(Default)]
pub(crate) struct Callbacks {
    on_receive: RwLock<Option<OnReceive>>,
    on_close: RwLock<Option<OnClose>>,
}

impl Callbacks {
    pub(crate) fn set_on_receive(&self, callback: OnReceive) {
        *self
            .on_receive
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    pub(crate) fn set_on_close(&self, callback: OnClose) {
        *self
            .on_close
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    /// Name of the first unregistered callback, if any.
    pub(crate) fn missing(&self) -> Option<&'static str> {
        if self.receiver().is_none() {
            Some("on_receive")
        } else if self.closer().is_none() {
            Some("on_close")
        } else {
            None
        }
    }

    pub(crate) fn receive(&self, message: Vec<u8>) {
        if let Some(callback) = self.receiver() {
            callback(message);
            tracing::debug!("on_receive callback invoked");
        }
    }

    pub(crate) fn close(&self, reason: Option<TransportError>) {
        if let Some(callback) = self.closer() {
            callback(reason);
            tracing::debug!("on_close callback invoked");
        }
    }

    // Clone the callback out so no lock is held while user code runs.
    fn receiver(&self) -> Option<OnReceive> {
        self.on_receive
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn closer(&self) -> Option<OnClose> {
        self.on_close
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl core::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_receive", &self.receiver().is_some())
            .field("on_close", &self.closer().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn reports_missing_callbacks_in_order() {
        let callbacks = Callbacks::default();
        assert_eq!(callbacks.missing(), Some("on_receive"));

        callbacks.set_on_receive(Arc::new(|_| {}));
        assert_eq!(callbacks.missing(), Some("on_close"));

        callbacks.set_on_close(Arc::new(|_| {}));
        assert_eq!(callbacks.missing(), None);
    }

    #[test]
    fn registering_again_replaces_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let callbacks = Callbacks::default();

        let first = seen.clone();
        callbacks.set_on_receive(Arc::new(move |_| first.lock().expect("lock").push("first")));
        let second = seen.clone();
        callbacks.set_on_receive(Arc::new(move |_| second.lock().expect("lock").push("second")));

        callbacks.receive(b"x".to_vec());
        assert_eq!(*seen.lock().expect("lock"), vec!["second"]);
    }

    #[test]
    fn close_passes_reason_through() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let callbacks = Callbacks::default();

        let sink = seen.clone();
        callbacks.set_on_close(Arc::new(move |reason| sink.lock().expect("lock").push(reason)));

        callbacks.close(None);
        callbacks.close(Some(TransportError::Request("reset".into())));

        assert_eq!(
            *seen.lock().expect("lock"),
            vec![None, Some(TransportError::Request("reset".into()))]
        );
    }

    #[test]
    fn callback_may_reregister_without_deadlock() {
        let callbacks = Arc::new(Callbacks::default());
        let inner = callbacks.clone();
        callbacks.set_on_receive(Arc::new(move |_| inner.set_on_close(Arc::new(|_| {}))));

        callbacks.receive(Vec::new());
        assert_eq!(callbacks.missing(), None);
    }
}
