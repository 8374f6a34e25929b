//! Cooperative cancellation for in-flight calls
//!
//! A `CancelHandle` flips a watch channel; every `CancelToken` cloned from
//! the pair observes the flip. The retry loop races both the network call
//! and the backoff sleep against the token.

use std::future;

use tokio::sync::watch;

/// Create a connected handle/token pair
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Caller side of a cancellation pair
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal cancellation to every token of this pair
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether `cancel` has been called
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observer side of a cancellation pair
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        let (_, token) = cancel_pair();
        token
    }

    /// Whether cancellation has been signalled
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is signalled
    ///
    /// If the handle is dropped without cancelling, this never resolves.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                future::pending::<()>().await;
            }
        }
    }
}
