//! Context implementation for request-scoped cancellation
//!
//! This module provides the Context type which carries cancellation signals
//! and deadlines across async boundaries.

use crate::error::TfplugError;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Context carries request-scoped cancellation signals and deadlines
/// CRITICAL: Pass this as first parameter to ALL async trait methods
/// This enables proper cancellation and timeout handling
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done: done_rx,
                done_tx,
            }),
        }
    }

    /// Derive a context that is cancelled after `timeout`, or earlier when
    /// this context is cancelled
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let deadline = match self.inner.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };

        let (done_tx, done_rx) = watch::channel(self.is_cancelled());

        let child_tx = done_tx.clone();
        let mut parent_done = self.done();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline.into()) => {}
                _ = wait_cancelled(&mut parent_done) => {}
                _ = child_tx.closed() => return,
            }
            let _ = child_tx.send(true);
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

    /// Returns a channel that flips to true when work done on behalf of this
    /// context should be cancelled
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }

    /// Drive `fut` to completion unless the context is cancelled first
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, TfplugError> {
        if self.is_cancelled() {
            return Err(TfplugError::Cancelled);
        }

        let mut done = self.done();
        tokio::select! {
            output = fut => Ok(output),
            _ = wait_cancelled(&mut done) => Err(TfplugError::Cancelled),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once the receiver observes `true`; never resolves if the sender
/// goes away without cancelling
async fn wait_cancelled(done: &mut watch::Receiver<bool>) {
    loop {
        if *done.borrow_and_update() {
            return;
        }
        if done.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
