//! Process-level interrupt signal.
//!
//! Long waits (the HTTP request, the editor, the terminal prompt) are raced
//! against [`Interrupt::triggered`] and dropped when it fires.

use tokio::sync::watch;
use tracing::{debug, warn};

/// Receiving side; cheap to clone.
#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: watch::Receiver<bool>,
}

/// Sending side, owned by whoever listens for the signal.
#[derive(Debug)]
pub struct InterruptHandle {
    tx: watch::Sender<bool>,
}

/// A connected handle/interrupt pair.
pub fn channel() -> (InterruptHandle, Interrupt) {
    let (tx, rx) = watch::channel(false);
    (InterruptHandle { tx }, Interrupt { rx })
}

impl Interrupt {
    /// An interrupt that never fires.
    pub fn never() -> Self {
        let (_, interrupt) = channel();
        interrupt
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the interrupt fires. Pending forever if the handle is
    /// dropped without firing.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|&fired| fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl InterruptHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Fire on the first Ctrl-C. Must be called inside a tokio runtime.
    pub fn listen_for_ctrl_c(self) {
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    debug!("Received Ctrl-C");
                    self.trigger();
                    // Keep the sender alive so late waiters still see the flag.
                    std::future::pending::<()>().await;
                }
                Err(e) => warn!("Could not listen for Ctrl-C: {e}"),
            }
        });
    }
}
