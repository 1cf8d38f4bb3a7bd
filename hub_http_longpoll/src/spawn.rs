//! Task spawning for the background poll loop.
//!
//! Implement [`Spawn`] for your runtime. Two implementations ship with the
//! crate: [`ThreadSpawn`] drives the loop on a dedicated OS thread, and
//! `TokioSpawn` (feature `tokio`) hands it to the ambient tokio runtime.

use futures::future::BoxFuture;
use thiserror::Error;

/// Name given to threads started by [`ThreadSpawn`].
pub const POLL_THREAD_NAME: &str = "hub-longpoll";

/// The poll loop could not be launched.
#[derive(Debug, Error)]
#[error("failed to spawn poll loop: {0}")]
pub struct SpawnError(#[from] std::io::Error);

/// Trait for launching the poll loop as a background task.
pub trait Spawn {
    /// Spawn a future as a background task.
    ///
    /// The future must be driven to completion without blocking the caller.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError`] if the task could not be launched.
    fn spawn(&self, fut: BoxFuture<'static, ()>) -> Result<(), SpawnError>;
}

/// Runs each spawned future to completion on its own OS thread.
///
/// Works with fetch clients that do not depend on a specific async runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSpawn;

impl Spawn for ThreadSpawn {
    fn spawn(&self, fut: BoxFuture<'static, ()>) -> Result<(), SpawnError> {
        std::thread::Builder::new()
            .name(POLL_THREAD_NAME.into())
            .spawn(move || futures::executor::block_on(fut))?;
        Ok(())
    }
}

/// A spawner that uses tokio to spawn tasks.
///
/// Must be used from within a tokio runtime.
#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawn;

#[cfg(feature = "tokio")]
impl Spawn for TokioSpawn {
    fn spawn(&self, fut: BoxFuture<'static, ()>) -> Result<(), SpawnError> {
        drop(tokio::spawn(fut));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;

    #[test]
    fn thread_spawn_runs_future_on_named_thread() {
        let (tx, rx) = std::sync::mpsc::channel();
        ThreadSpawn
            .spawn(
                async move {
                    let name = std::thread::current().name().map(ToOwned::to_owned);
                    tx.send(name).ok();
                }
                .boxed(),
            )
            .expect("spawn");

        let name = rx
            .recv_timeout(core::time::Duration::from_secs(5))
            .expect("future ran");
        assert_eq!(name.as_deref(), Some(POLL_THREAD_NAME));
    }

    #[test]
    fn spawn_error_displays() {
        let err = SpawnError::from(std::io::Error::other("no threads"));
        assert_eq!(format!("{err}"), "failed to spawn poll loop: no threads");
    }
}
