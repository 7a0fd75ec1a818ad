//! Keyed debouncing of asynchronous writes.
//!
//! Each key owns an independent timer: triggering key `A` never delays or
//! cancels a write scheduled for key `B`. Re-triggering a key replaces its
//! pending operation; only the most recent one runs, once the quiet period
//! has elapsed. Operations are plain futures and do nothing until they fire,
//! so they should read the state they need when polled, not when scheduled.
//!
//! A fired operation is detached from its timer. Cancelling or re-triggering
//! a key afterwards does not abort a request that is already in flight.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

type BoxedOp = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct Timer {
    ticket: u64,
    sleeper: JoinHandle<()>,
    op: BoxedOp,
}

/// Tracks operations that have left the timer stage and are running.
#[derive(Default)]
struct Activity {
    running: AtomicUsize,
    notify: Notify,
}

struct RunningGuard(Arc<Activity>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }
}

pub struct KeyedDebouncer<K> {
    delay: Duration,
    timers: Arc<Mutex<HashMap<K, Timer>>>,
    activity: Arc<Activity>,
    tickets: AtomicU64,
}

fn lock<K>(timers: &Mutex<HashMap<K, Timer>>) -> MutexGuard<'_, HashMap<K, Timer>> {
    timers.lock().unwrap_or_else(|e| e.into_inner())
}

impl<K> KeyedDebouncer<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timers: Arc::new(Mutex::new(HashMap::new())),
            activity: Arc::new(Activity::default()),
            tickets: AtomicU64::new(0),
        }
    }

    /// Schedules `op` for `key` after the quiet period, replacing any
    /// not-yet-fired operation for the same key.
    pub fn trigger<F>(&self, key: K, op: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed) + 1;
        let timers = Arc::clone(&self.timers);
        let activity = Arc::clone(&self.activity);
        let delay = self.delay;

        let mut map = lock(&self.timers);
        if let Some(previous) = map.remove(&key) {
            previous.sleeper.abort();
            debug!("debounce {:?}: superseded pending write", key);
        }

        // The sleeper cannot observe the map before the insert below: it
        // needs the same lock.
        let sleeper = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let fired = {
                let mut map = lock(&timers);
                let key = map
                    .iter()
                    .find(|(_, t)| t.ticket == ticket)
                    .map(|(k, _)| k.clone());
                key.and_then(|k| map.remove(&k)).map(|timer| {
                    activity.running.fetch_add(1, Ordering::SeqCst);
                    timer.op
                })
            };
            if let Some(op) = fired {
                spawn_running(activity, op);
            }
        });

        map.insert(
            key,
            Timer {
                ticket,
                sleeper,
                op: Box::pin(op),
            },
        );
    }

    /// Drops the pending operation for `key`. Returns whether one existed.
    pub fn cancel(&self, key: &K) -> bool {
        let removed = lock(&self.timers).remove(key);
        match removed {
            Some(timer) => {
                timer.sleeper.abort();
                self.activity.notify.notify_waiters();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let drained: Vec<Timer> = lock(&self.timers).drain().map(|(_, t)| t).collect();
        for timer in drained {
            timer.sleeper.abort();
        }
        self.activity.notify.notify_waiters();
    }

    /// Moves the pending operation of `from` under `to`, keeping its deadline.
    /// If `to` already has one pending, the most recently triggered survives.
    pub fn rekey(&self, from: &K, to: K) {
        let mut map = lock(&self.timers);
        let Some(moved) = map.remove(from) else {
            return;
        };
        match map.remove(&to) {
            Some(existing) if existing.ticket > moved.ticket => {
                moved.sleeper.abort();
                map.insert(to, existing);
            }
            Some(existing) => {
                existing.sleeper.abort();
                map.insert(to, moved);
            }
            None => {
                map.insert(to, moved);
            }
        }
    }

    /// Fires the pending operation for `key` right away.
    pub fn flush(&self, key: &K) -> Option<JoinHandle<()>> {
        let timer = lock(&self.timers).remove(key)?;
        timer.sleeper.abort();
        self.activity.running.fetch_add(1, Ordering::SeqCst);
        Some(spawn_running(Arc::clone(&self.activity), timer.op))
    }

    /// Runs `op` immediately, counted as in-flight work for `idle`.
    pub fn run_now<F>(&self, op: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.activity.running.fetch_add(1, Ordering::SeqCst);
        spawn_running(Arc::clone(&self.activity), Box::pin(op))
    }

    pub fn is_pending(&self, key: &K) -> bool {
        lock(&self.timers).contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.timers).len()
    }

    pub fn running_count(&self) -> usize {
        self.activity.running.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.pending_count() == 0 && self.running_count() == 0
    }

    /// Waits until no operation is pending or running.
    pub async fn idle(&self) {
        loop {
            let notified = self.activity.notify.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

fn spawn_running(activity: Arc<Activity>, op: BoxedOp) -> JoinHandle<()> {
    let guard = RunningGuard(activity);
    tokio::spawn(async move {
        let _guard = guard;
        op.await;
    })
}

impl<K> Drop for KeyedDebouncer<K> {
    fn drop(&mut self) {
        for (_, timer) in lock(&self.timers).drain() {
            timer.sleeper.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> BoxedOp) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |value: &str| -> BoxedOp {
            let sink = Arc::clone(&sink);
            let value = value.to_string();
            Box::pin(async move { sink.lock().unwrap().push(value) })
        };
        (log, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_into_last_call() {
        let debouncer = KeyedDebouncer::new(Duration::from_millis(1000));
        let (log, op) = recorder();

        for value in ["E", "En", "Eng"] {
            debouncer.trigger(1, op(value));
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert!(log.lock().unwrap().is_empty());

        debouncer.idle().await;
        assert_eq!(*log.lock().unwrap(), vec!["Eng"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let debouncer = KeyedDebouncer::new(Duration::from_millis(1000));
        let (log, op) = recorder();

        debouncer.trigger("a", op("a1"));
        tokio::time::sleep(Duration::from_millis(600)).await;
        debouncer.trigger("b", op("b1"));
        tokio::time::sleep(Duration::from_millis(500)).await;

        // `a` fired on its own schedule; `b` is still waiting.
        assert_eq!(*log.lock().unwrap(), vec!["a1"]);
        assert!(debouncer.is_pending(&"b"));

        debouncer.idle().await;
        assert_eq!(*log.lock().unwrap(), vec!["a1", "b1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let debouncer = KeyedDebouncer::new(Duration::from_millis(100));
        let (log, op) = recorder();

        debouncer.trigger(7, op("x"));
        assert!(debouncer.cancel(&7));
        assert!(!debouncer.cancel(&7));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(log.lock().unwrap().is_empty());
        assert!(debouncer.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rekey_keeps_deadline_under_new_key() {
        let debouncer = KeyedDebouncer::new(Duration::from_millis(1000));
        let (log, op) = recorder();

        debouncer.trigger(100, op("moved"));
        tokio::time::sleep(Duration::from_millis(400)).await;
        debouncer.rekey(&100, 1);
        assert!(!debouncer.is_pending(&100));
        assert!(debouncer.is_pending(&1));

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(*log.lock().unwrap(), vec!["moved"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_runs_immediately() {
        let debouncer = KeyedDebouncer::new(Duration::from_secs(60));
        let (log, op) = recorder();

        debouncer.trigger((), op("now"));
        debouncer.flush(&()).unwrap().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["now"]);
        assert!(debouncer.flush(&()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrigger_does_not_abort_in_flight_op() {
        let debouncer = KeyedDebouncer::new(Duration::from_millis(100));
        let finished = Arc::new(AtomicU32::new(0));

        let done = Arc::clone(&finished);
        debouncer.trigger(1, async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            done.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(debouncer.running_count(), 1);

        let done = Arc::clone(&finished);
        debouncer.trigger(1, async move {
            done.fetch_add(10, Ordering::SeqCst);
        });

        debouncer.idle().await;
        assert_eq!(finished.load(Ordering::SeqCst), 11);
    }
}
