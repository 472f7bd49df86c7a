//! Cooperative cancellation flag shared between the engine and a running query

use tokio::sync::watch;

/// Settable-once flag meaning "the results of this request are no longer wanted".
///
/// Clones share the same flag. Setting it is idempotent and visible to every
/// clone on every thread once `set` returns. Traversals poll `is_set` at
/// their own checkpoints; async callers can await `cancelled`.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: watch::Sender<bool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Request cancellation.
    ///
    /// Returns `true` only for the call that actually flipped the flag.
    pub fn set(&self) -> bool {
        self.tx.send_if_modified(|flag| {
            if *flag {
                false
            } else {
                *flag = true;
                true
            }
        })
    }

    /// Non-blocking read of the current state
    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the flag is set
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|flag| *flag).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
