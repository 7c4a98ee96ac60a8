//! Watch-driven controller
//!
//! Feeds order keys from store events and periodic resyncs into a
//! [`WorkQueue`] and runs a fixed pool of workers that reconcile them.

use super::queue::WorkQueue;
use crate::config::ControllerConfig;
use crate::error::ReconcileError;
use crate::reconciler::{CancelSignal, OrderReconciler, ReconcileOutcome};
use crate::storage::{OrderStorage, Storage};
use std::sync::Arc;
use taco_types::ObjectKey;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};

/// Drives reconciliation of every order in the store
pub struct Controller {
    config: ControllerConfig,
    storage: Arc<dyn Storage>,
    reconciler: Arc<OrderReconciler>,
    queue: WorkQueue,
}

impl Controller {
    pub fn new(
        config: ControllerConfig,
        storage: Arc<dyn Storage>,
        reconciler: Arc<OrderReconciler>,
    ) -> Self {
        let queue = WorkQueue::new(config.base_backoff(), config.max_backoff());
        Self {
            config,
            storage,
            reconciler,
            queue,
        }
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    /// Run until `shutdown` turns true
    ///
    /// Workers finish the reconciliation they are in before the call returns.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow_and_update() {
            return;
        }

        let workers = self.config.max_concurrent_reconciles.max(1);
        tracing::info!(
            workers,
            resync_interval_secs = self.config.resync_interval_secs,
            "Controller started"
        );

        // Subscribe before listing so no change falls between the two.
        let mut events = self.storage.subscribe();

        let mut tasks = JoinSet::new();
        for id in 0..workers {
            let worker = Worker {
                id,
                queue: self.queue.clone(),
                reconciler: self.reconciler.clone(),
                timeout: self.config.reconcile_timeout(),
            };
            tasks.spawn(worker.run());
        }

        let mut resync = interval(self.config.resync_interval());
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                // The first tick completes immediately and performs the initial list.
                _ = resync.tick() => self.resync().await,
                event = events.recv() => match event {
                    Ok(event) => self.queue.add(event.key().clone()),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Watch stream lagged, resyncing");
                        self.resync().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::warn!("Watch stream closed, stopping controller");
                        break;
                    }
                },
            }
        }

        self.queue.shutdown();
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Reconcile worker panicked");
            }
        }

        tracing::info!("Controller stopped");
    }

    async fn resync(&self) {
        match self.storage.list_orders().await {
            Ok(orders) => {
                tracing::debug!(count = orders.len(), "Resyncing orders");
                // Keys still backing off are ignored by the queue.
                for order in orders {
                    if !order.phase().is_terminal() {
                        self.queue.add(order.key());
                    }
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to list orders for resync"),
        }
    }
}

struct Worker {
    id: usize,
    queue: WorkQueue,
    reconciler: Arc<OrderReconciler>,
    timeout: std::time::Duration,
}

impl Worker {
    async fn run(self) {
        while let Some(key) = self.queue.next().await {
            let result = self.reconcile_with_timeout(&key).await;
            self.handle_result(&key, result);
            self.queue.done(&key);
        }
        tracing::debug!(worker = self.id, "Reconcile worker exiting");
    }

    /// Reconcile `key`, raising the cancel signal once the deadline passes
    ///
    /// The reconciliation is never dropped mid-step: after the deadline the
    /// worker keeps awaiting it until it observes the signal and returns.
    async fn reconcile_with_timeout(
        &self,
        key: &ObjectKey,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let cancel = CancelSignal::new(cancel_rx);

        let reconcile = self.reconciler.reconcile(key, &cancel);
        tokio::pin!(reconcile);

        tokio::select! {
            result = &mut reconcile => return result,
            _ = tokio::time::sleep(self.timeout) => {
                tracing::warn!(
                    order = %key,
                    timeout_secs = self.timeout.as_secs(),
                    "Reconciliation deadline exceeded, cancelling"
                );
                cancel_tx.send_replace(true);
            }
        }

        reconcile.await
    }

    fn handle_result(&self, key: &ObjectKey, result: Result<ReconcileOutcome, ReconcileError>) {
        match result {
            Ok(outcome) => {
                tracing::debug!(worker = self.id, order = %key, ?outcome, "Reconciled");
                self.queue.forget(key);
            }
            Err(e) if e.is_retryable() => {
                let delay = self.queue.add_rate_limited(key.clone());
                tracing::warn!(
                    worker = self.id,
                    order = %key,
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "Reconciliation failed, requeued"
                );
            }
            Err(e) => {
                tracing::error!(
                    worker = self.id,
                    order = %key,
                    error = %e,
                    "Reconciliation failed permanently"
                );
                self.queue.forget(key);
            }
        }
    }
}
