use std::time::Duration;

use beehive_core::{DeadlineClock, DeadlineSnapshot};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::controller::SessionController;

struct TickerLifecycle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TickerLifecycle {
    fn spawn<F>(body: impl FnOnce(watch::Receiver<bool>) -> F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(body(shutdown_rx));
        Self { shutdown_tx, task }
    }

    async fn stop(mut self, name: &'static str) {
        let _ = self.shutdown_tx.send(true);
        if let Err(error) = (&mut self.task).await {
            if !error.is_cancelled() {
                warn!(ticker = name, error = %error, "ticker task ended abnormally");
            }
        }
    }
}

impl Drop for TickerLifecycle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn interval(period: Duration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Republishes the deadline of the active attempt on a coarse interval.
///
/// The snapshot is also refreshed whenever the session state changes, so
/// activation and cancellation show up without waiting for the next tick.
/// `None` is published while nothing is active.
pub struct DeadlineTicker {
    snapshots: watch::Receiver<Option<DeadlineSnapshot>>,
    lifecycle: TickerLifecycle,
}

impl DeadlineTicker {
    pub fn spawn(controller: SessionController, deadline: DeadlineClock, refresh: Duration) -> Self {
        let (snapshot_tx, snapshots) = watch::channel(None);
        let lifecycle = TickerLifecycle::spawn(move |mut shutdown_rx| async move {
            let mut states = controller.subscribe();
            let mut ticker = interval(refresh);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    changed = states.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {}
                }
                let snapshot = controller.deadline(&deadline).await;
                snapshot_tx.send_if_modified(|current| {
                    if *current == snapshot {
                        false
                    } else {
                        *current = snapshot;
                        true
                    }
                });
            }
            debug!("deadline ticker stopped");
        });
        Self {
            snapshots,
            lifecycle,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<DeadlineSnapshot>> {
        self.snapshots.clone()
    }

    pub fn current(&self) -> Option<DeadlineSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub async fn stop(self) {
        self.lifecycle.stop("deadline").await;
    }
}

/// Periodically persists the elapsed duration of the active attempt.
pub struct CheckpointLoop {
    lifecycle: TickerLifecycle,
}

impl CheckpointLoop {
    pub(crate) fn spawn(controller: SessionController, period: Duration) -> Self {
        let lifecycle = TickerLifecycle::spawn(move |mut shutdown_rx| async move {
            let mut ticker = interval(period);
            // The first tick completes immediately; the attempt was just persisted.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        if let Some(issued) = controller.checkpoint().await {
                            let _ = issued.await;
                        }
                    }
                }
            }
            debug!("checkpoint loop stopped");
        });
        Self { lifecycle }
    }

    pub async fn stop(self) {
        self.lifecycle.stop("checkpoint").await;
    }
}
