//! Periodic fetch with cancellation and stale-response suppression.
//!
//! Every tick starts its own fetch, so a slow request never delays the
//! schedule. Completions are tagged with the tick's sequence number and only
//! the newest one is delivered; an older response that lands late is dropped.
//!
//! Delivery is serialized through a reentrant gate. `cancel()` takes the same
//! gate, which gives the guarantee callers rely on: once `cancel()` returns, no
//! callback is running on another thread and none will start. A callback may
//! cancel its own poller (the gate is reentrant).

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{Error, Result};

pub mod jobs;

pub use jobs::{JobDetailPoller, JobPoller};

/// Shortest accepted period; `tokio::time::interval` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(100);

/// A fetch that failed, as handed to `on_error`.
#[derive(Debug)]
pub struct FetchFailure {
    /// Sequence number of the tick that issued the request.
    pub seq: u64,
    /// Failures delivered since the last successful update, including this one.
    pub consecutive_failures: u32,
    pub error: Error,
}

type UpdateFn<T> = dyn Fn(Arc<T>) + Send + Sync;
type ErrorFn = dyn Fn(FetchFailure) + Send + Sync;

struct Delivery<T> {
    delivered_seq: u64,
    consecutive_failures: u32,
    snapshot: Option<Arc<T>>,
}

struct Shared<T> {
    cancelled: AtomicBool,
    token: CancellationToken,
    gate: ReentrantMutex<()>,
    delivery: Mutex<Delivery<T>>,
}

impl<T> Shared<T> {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.token.cancel();
        // Wait out any callback in flight on another thread.
        drop(self.gate.lock());
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Owner of a running poll task. Dropping the handle cancels the task.
pub struct PollHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> PollHandle<T> {
    /// Stops polling. Idempotent; safe to call from inside a callback.
    pub fn cancel(&self) {
        if !self.shared.is_cancelled() {
            debug!("poller cancelled");
        }
        self.shared.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Last successfully delivered value. Kept across failed fetches.
    pub fn snapshot(&self) -> Option<Arc<T>> {
        self.shared.delivery.lock().snapshot.clone()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.shared.delivery.lock().consecutive_failures
    }

    /// A cloneable cancel switch that does not own the task, for use inside
    /// callbacks.
    pub fn canceller(&self) -> Canceller<T> {
        Canceller {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.shared.cancel();
    }
}

/// Cancels a poller without owning it.
pub struct Canceller<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Canceller<T> {
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }
}

impl<T> Clone for Canceller<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Starts polling `fetch` every `period`, the first fetch immediately.
///
/// `on_update` receives each delivered value; `on_error` receives each
/// delivered failure. Polling continues after failures until cancelled.
///
/// # Panics
/// Panics if called outside a Tokio runtime.
pub fn spawn<T, F, Fut>(
    period: Duration,
    fetch: F,
    on_update: impl Fn(Arc<T>) + Send + Sync + 'static,
    on_error: impl Fn(FetchFailure) + Send + Sync + 'static,
) -> PollHandle<T>
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let shared = Arc::new(Shared {
        cancelled: AtomicBool::new(false),
        token: CancellationToken::new(),
        gate: ReentrantMutex::new(()),
        delivery: Mutex::new(Delivery {
            delivered_seq: 0,
            consecutive_failures: 0,
            snapshot: None,
        }),
    });
    let on_update: Arc<UpdateFn<T>> = Arc::new(on_update);
    let on_error: Arc<ErrorFn> = Arc::new(on_error);

    let task_shared = Arc::clone(&shared);
    tokio::spawn(async move {
        let mut ticker = interval(period.max(MIN_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut seq = 0u64;

        loop {
            tokio::select! {
                () = task_shared.token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            seq += 1;
            trace!(seq, "poll tick");
            tokio::spawn(deliver(
                Arc::clone(&task_shared),
                seq,
                fetch(),
                Arc::clone(&on_update),
                Arc::clone(&on_error),
            ));
        }
    });

    PollHandle { shared }
}

async fn deliver<T, Fut>(
    shared: Arc<Shared<T>>,
    seq: u64,
    fetch: Fut,
    on_update: Arc<UpdateFn<T>>,
    on_error: Arc<ErrorFn>,
) where
    Fut: Future<Output = Result<T>>,
{
    let result = tokio::select! {
        () = shared.token.cancelled() => return,
        result = fetch => result,
    };

    let _gate = shared.gate.lock();
    if shared.is_cancelled() {
        return;
    }

    let mut delivery = shared.delivery.lock();
    if seq <= delivery.delivered_seq {
        debug!(seq, latest = delivery.delivered_seq, "discarding stale poll result");
        return;
    }
    delivery.delivered_seq = seq;

    match result {
        Ok(value) => {
            let value = Arc::new(value);
            delivery.snapshot = Some(Arc::clone(&value));
            delivery.consecutive_failures = 0;
            drop(delivery);
            on_update(value);
        }
        Err(error) => {
            delivery.consecutive_failures += 1;
            let consecutive_failures = delivery.consecutive_failures;
            drop(delivery);
            debug!(seq, consecutive_failures, "poll fetch failed: {error}");
            on_error(FetchFailure {
                seq,
                consecutive_failures,
                error,
            });
        }
    }
}
