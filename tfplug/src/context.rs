//! Context implementation for request-scoped cancellation and deadlines
//!
//! Every framework callback receives a Context. Long-running provider work
//! (HTTP calls, state polling) should watch it so Terraform can interrupt
//! an apply and so per-operation timeouts are honoured.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Context carries request-scoped cancellation signals and deadlines
/// CRITICAL: Pass this as first parameter to ALL async trait methods
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: Arc<watch::Sender<bool>>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done: done_rx,
                done_tx: Arc::new(done_tx),
            }),
        }
    }

    /// Derive a context that is cancelled after `timeout`.
    ///
    /// The derived deadline never extends past the parent's deadline, and
    /// cancelling the parent cancels the child.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let requested = Instant::now() + timeout;
        let deadline = match self.inner.deadline {
            Some(parent) if parent < requested => parent,
            _ => requested,
        };

        let (done_tx, done_rx) = watch::channel(*self.inner.done.borrow());
        let done_tx = Arc::new(done_tx);

        let timer_tx = Arc::downgrade(&done_tx);
        let mut parent_done = self.inner.done.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline.into()) => {}
                _ = wait_for_true(&mut parent_done) => {}
            }
            if let Some(tx) = timer_tx.upgrade() {
                let _ = tx.send(true);
            }
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                done: done_rx,
                done_tx,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left until the deadline, `None` when the context has no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns a channel that flips to `true` when work done on behalf of
    /// this context should be cancelled
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn cancelled(&self) {
        let mut done = self.inner.done.clone();
        wait_for_true(&mut done).await;
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_true(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone without cancelling: never resolves.
            std::future::pending::<()>().await;
        }
    }
}
