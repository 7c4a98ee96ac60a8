//! Keyed work queue
//!
//! A key is handed to at most one worker at a time. Adding a key that is
//! already queued is a no-op; adding one that is being processed marks it
//! dirty so it is queued again once the worker calls [`WorkQueue::done`].
//! A key waiting out a retry backoff ignores plain adds until its delay
//! expires.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use taco_types::ObjectKey;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<ObjectKey>,
    dirty: HashSet<ObjectKey>,
    processing: HashSet<ObjectKey>,
    backing_off: HashSet<ObjectKey>,
    failures: HashMap<ObjectKey, u32>,
    shut_down: bool,
}

/// Deduplicating FIFO of order keys with per-key backoff
#[derive(Debug, Clone)]
pub struct WorkQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
    base_backoff: Duration,
    max_backoff: Duration,
}

impl WorkQueue {
    pub fn new(base_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            notify: Arc::new(Notify::new()),
            base_backoff,
            max_backoff,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // State stays consistent even if a holder panicked mid-update.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a key for reconciliation
    pub fn add(&self, key: ObjectKey) {
        let mut state = self.lock();
        if state.shut_down || state.backing_off.contains(&key) {
            return;
        }
        if !state.dirty.insert(key.clone()) {
            return;
        }
        if state.processing.contains(&key) {
            return;
        }
        state.queue.push_back(key);
        drop(state);
        self.notify.notify_one();
    }

    /// Queue a key after its backoff delay and count the failure
    ///
    /// Changes observed while the failed attempt ran, including the
    /// attempt's own status writes, are folded into the retry. Until the
    /// delay expires, events and resyncs for the key are ignored.
    pub fn add_rate_limited(&self, key: ObjectKey) -> Duration {
        let delay = self.backoff(&key);
        {
            let mut state = self.lock();
            if state.shut_down {
                return delay;
            }
            state.dirty.remove(&key);
            state.backing_off.insert(key.clone());
        }

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.lock().backing_off.remove(&key);
            queue.add(key);
        });
        delay
    }

    /// Next retry delay for `key`, counting one more failure
    pub fn backoff(&self, key: &ObjectKey) -> Duration {
        let mut state = self.lock();
        let failures = state.failures.entry(key.clone()).or_insert(0);
        let exponent = (*failures).min(31);
        *failures = failures.saturating_add(1);

        self.base_backoff
            .checked_mul(1u32 << exponent)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }

    /// Reset the failure count of `key`
    pub fn forget(&self, key: &ObjectKey) {
        self.lock().failures.remove(key);
    }

    /// Wait for the next key; `None` once the queue is shut down
    pub async fn next(&self) -> Option<ObjectKey> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.lock();
                if state.shut_down {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
            }
            notified.await;
        }
    }

    /// Release a key handed out by [`WorkQueue::next`]
    pub fn done(&self, key: &ObjectKey) {
        let mut state = self.lock();
        state.processing.remove(key);
        if state.dirty.contains(key) && !state.shut_down {
            state.queue.push_back(key.clone());
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Stop handing out keys and wake every waiting worker
    pub fn shutdown(&self) {
        self.lock().shut_down = true;
        self.notify.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ObjectKey {
        ObjectKey::new("default", name)
    }

    fn queue() -> WorkQueue {
        WorkQueue::new(Duration::from_millis(100), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_duplicate_adds_collapse() {
        let queue = queue();
        queue.add(key("a"));
        queue.add(key("a"));
        queue.add(key("b"));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.next().await, Some(key("a")));
        assert_eq!(queue.next().await, Some(key("b")));
    }

    #[tokio::test]
    async fn test_key_in_flight_is_not_handed_out_twice() {
        let queue = queue();
        queue.add(key("a"));
        let first = queue.next().await.unwrap();

        // Re-added while processing: held back until done.
        queue.add(key("a"));
        assert!(queue.is_empty());

        queue.done(&first);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next().await, Some(key("a")));
    }

    #[tokio::test]
    async fn test_done_without_readd_drops_key() {
        let queue = queue();
        queue.add(key("a"));
        let first = queue.next().await.unwrap();
        queue.done(&first);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let queue = queue();
        let k = key("a");

        assert_eq!(queue.backoff(&k), Duration::from_millis(100));
        assert_eq!(queue.backoff(&k), Duration::from_millis(200));
        assert_eq!(queue.backoff(&k), Duration::from_millis(400));
        assert_eq!(queue.backoff(&k), Duration::from_millis(800));
        assert_eq!(queue.backoff(&k), Duration::from_secs(1));
        assert_eq!(queue.backoff(&k), Duration::from_secs(1));

        queue.forget(&k);
        assert_eq!(queue.backoff(&k), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_writes_do_not_skip_backoff() {
        let queue = queue();
        queue.add(key("a"));
        let first = queue.next().await.unwrap();

        // A status write made by the attempt itself dirties the key.
        queue.add(key("a"));
        let delay = queue.add_rate_limited(first.clone());
        queue.done(&first);

        assert_eq!(delay, Duration::from_millis(100));
        assert!(queue.is_empty());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(queue.next().await, Some(key("a")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_adds_during_backoff_are_ignored() {
        let queue = queue();
        queue.add(key("a"));
        let first = queue.next().await.unwrap();
        queue.add_rate_limited(first.clone());
        queue.done(&first);

        // Late watch events and resyncs for a key that is backing off.
        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.add(key("a"));
        queue.add(key("b"));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next().await, Some(key("b")));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(queue.next().await, Some(key("a")));
    }

    #[tokio::test]
    async fn test_shutdown_wakes_waiters() {
        let queue = queue();
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.next().await })
        };

        tokio::task::yield_now().await;
        queue.shutdown();

        assert_eq!(waiter.await.unwrap(), None);
        queue.add(key("a"));
        assert!(queue.is_empty());
    }
}
