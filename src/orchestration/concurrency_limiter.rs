//! # Concurrency Limiter
//!
//! Dispatches an ordered sequence of batches with at most `concurrency` of them
//! executing at once. A batch starts as soon as a slot frees up; completion order
//! is whatever the batches' own latencies make it. A [`StopSignal`] prevents any
//! batch that has not yet started from starting, while batches already in flight
//! run to completion.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Cooperative stop flag shared between the runner and the limiter
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request that no further batches start. Idempotent.
    pub fn request_stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once a stop has been requested
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here
        let _ = rx.wait_for(|requested| *requested).await;
    }
}

/// Summary of a dispatch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Batches handed to the limiter
    pub total: usize,
    /// Batches that actually started
    pub dispatched: usize,
}

impl DispatchReport {
    pub fn was_cut_short(&self) -> bool {
        self.dispatched < self.total
    }
}

/// Bounded batch dispatcher: an in-flight counter (semaphore permits), a
/// pending queue (the remaining batches) and a stop flag.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    concurrency: usize,
    stop_signal: StopSignal,
}

impl ConcurrencyLimiter {
    pub fn new(concurrency: usize, stop_signal: StopSignal) -> Self {
        Self {
            concurrency: concurrency.max(1),
            stop_signal,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Execute `batches` in order under the concurrency cap.
    ///
    /// Returns after every started batch has settled. `execute` receives the
    /// batch index and the batch itself.
    pub async fn run<B, F, Fut>(self, batches: Vec<B>, execute: F) -> DispatchReport
    where
        B: Send + 'static,
        F: Fn(usize, B) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let total = batches.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut in_flight = JoinSet::new();
        let mut dispatched = 0;

        info!(
            total_batches = total,
            concurrency = self.concurrency,
            "🚦 LIMITER: Dispatching batches"
        );

        for (index, batch) in batches.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                () = self.stop_signal.stopped() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };

            // A freed slot does not override a stop that arrived while waiting
            let Some(permit) = permit.filter(|_| !self.stop_signal.is_stop_requested()) else {
                info!(
                    next_batch = index,
                    remaining = total - index,
                    "🛑 LIMITER: Stop requested, not starting remaining batches"
                );
                break;
            };

            debug!(batch = index, "LIMITER: Starting batch");
            let work = execute(index, batch);
            in_flight.spawn(async move {
                // Slot is held until the whole batch has settled
                let _permit = permit;
                work.await;
            });
            dispatched += 1;
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "⚠️ LIMITER: Batch task did not complete cleanly");
            }
        }

        info!(
            dispatched = dispatched,
            total_batches = total,
            "✅ LIMITER: All dispatched batches settled"
        );

        DispatchReport { total, dispatched }
    }
}
