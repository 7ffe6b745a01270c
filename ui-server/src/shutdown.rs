//! One-shot shutdown trigger shared between the `/shutdown` route and the
//! server loop.

use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};

/// Handle held by the router; firing it stops the server.
#[derive(Clone)]
pub struct ShutdownHandle {
    sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

/// Future side awaited by `axum::serve(..).with_graceful_shutdown(..)`.
pub struct ShutdownSignal {
    receiver: oneshot::Receiver<()>,
}

impl ShutdownHandle {
    pub fn new() -> (Self, ShutdownSignal) {
        let (sender, receiver) = oneshot::channel();
        let handle = Self {
            sender: Arc::new(Mutex::new(Some(sender))),
        };
        (handle, ShutdownSignal { receiver })
    }

    /// Fire the shutdown. Returns false if it was already fired or the
    /// server loop is gone.
    pub async fn trigger(&self) -> bool {
        match self.sender.lock().await.take() {
            Some(sender) => sender.send(()).is_ok(),
            None => false,
        }
    }
}

impl ShutdownSignal {
    /// Resolves when the handle fires or is dropped.
    pub async fn wait(self) {
        let _ = self.receiver.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_fires_once() {
        let (handle, signal) = ShutdownHandle::new();
        let waiter = tokio::spawn(signal.wait());

        assert!(handle.clone().trigger().await);
        assert!(!handle.trigger().await);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_trigger_after_signal_dropped() {
        let (handle, signal) = ShutdownHandle::new();
        drop(signal);
        assert!(!handle.trigger().await);
    }
}
