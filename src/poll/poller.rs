//! Fixed-interval poll task
//!
//! The first tick fires immediately, then every `period`. The interval is
//! the only retry mechanism: a failed tick is reported and the next one runs
//! on schedule. On shutdown an in-flight fetch is dropped, so nothing it
//! would have produced reaches the session.

use super::{FetchError, LatestSighting, SightingsClient};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Result of one poll tick
#[derive(Debug)]
pub enum PollOutcome {
    Updated(LatestSighting),
    /// Empty body: nothing to apply
    NoData,
    Failed(FetchError),
}

impl From<Result<Option<LatestSighting>, FetchError>> for PollOutcome {
    fn from(result: Result<Option<LatestSighting>, FetchError>) -> Self {
        match result {
            Ok(Some(sighting)) => Self::Updated(sighting),
            Ok(None) => Self::NoData,
            Err(e) => Self::Failed(e),
        }
    }
}

/// Anything that can answer "what is the latest sighting"
pub trait LatestSource: Send + Sync + 'static {
    fn fetch_latest(
        &self,
    ) -> impl Future<Output = Result<Option<LatestSighting>, FetchError>> + Send;
}

impl LatestSource for SightingsClient {
    async fn fetch_latest(&self) -> Result<Option<LatestSighting>, FetchError> {
        SightingsClient::fetch_latest(self).await
    }
}

/// Control handle for a running poller
///
/// Dropping the handle also stops the task (the shutdown sender closes).
pub struct PollHandle {
    poll_now: Arc<Notify>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Run a tick now without waiting for the schedule
    pub fn poll_now(&self) {
        self.poll_now.notify_one();
    }

    /// Signal the task to stop; returns false if it was already stopped
    pub fn stop(&mut self) -> bool {
        match self.shutdown_tx.take() {
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    /// Stop and wait for the task to exit (timer released)
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Poller task ended abnormally: {}", e);
            }
        }
    }
}

/// Start polling `source` every `period`, reporting into `tx`
pub fn spawn_poller<S: LatestSource>(
    source: S,
    period: Duration,
    tx: mpsc::Sender<PollOutcome>,
) -> PollHandle {
    let poll_now = Arc::new(Notify::new());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let task = tokio::spawn(run_poller(source, period, tx, poll_now.clone(), shutdown_rx));

    PollHandle {
        poll_now,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    }
}

async fn run_poller<S: LatestSource>(
    source: S,
    period: Duration,
    tx: mpsc::Sender<PollOutcome>,
    poll_now: Arc<Notify>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!("Poller started (every {:?})", period);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => {}
            _ = poll_now.notified() => {
                tracing::debug!("Immediate poll requested");
            }
        }

        let outcome: PollOutcome = tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            result = source.fetch_latest() => result.into(),
        };

        match &outcome {
            PollOutcome::Failed(e) => tracing::warn!("Failed to load latest sighting: {}", e),
            PollOutcome::NoData => tracing::debug!("No sighting reported yet"),
            PollOutcome::Updated(s) => tracing::debug!("Latest sighting at {}", s.position),
        }

        // A full channel must not hold off the stop signal
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            sent = tx.send(outcome) => {
                if sent.is_err() {
                    // Receiver gone: the view is tearing down
                    break;
                }
            }
        }
    }

    tracing::debug!("Poller stopped");
}
