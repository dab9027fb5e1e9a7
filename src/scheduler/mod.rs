//! Clock and timer scheduling
//!
//! The poll engine never sleeps or reads the wall clock directly. It asks a
//! [`Clock`] for the time and a [`Scheduler`] for cancellable timers whose
//! firings come back as [`TimerEvent`]s on the bot's event queue. Tests swap
//! in [`ManualClock`] and [`ManualScheduler`] to drive time by hand.

use crate::polls::PhaseKind;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Source of the current time in Unix milliseconds
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_ms(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock for tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock reading `start_ms`
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        let by = millis(by);
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(by))
            });
    }

    /// Jump to an absolute time. Never moves backwards.
    pub fn set(&self, ms: i64) {
        self.now.fetch_max(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Whole milliseconds of `duration`, saturating at `i64::MAX`
pub fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Identifier of a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// "Time remaining" reminder
    Reminder,
    /// One-shot warning shortly before the deadline
    FinalWarning,
    /// End of the phase
    Deadline,
}

/// Payload delivered when a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    /// Phase the timer belongs to
    pub phase: PhaseKind,
    /// Epoch of the phase instance that scheduled it
    pub epoch: u64,
    /// Reminder or deadline
    pub kind: TimerKind,
}

/// Cancellable one-shot timers
pub trait Scheduler: Send + Sync + std::fmt::Debug {
    /// Deliver `event` after `delay`
    fn schedule(&self, delay: Duration, event: TimerEvent) -> TimerId;

    /// Cancel a timer. Unknown or already-fired ids are ignored.
    fn cancel(&self, id: TimerId);
}

/// Shared scheduler
pub type DynScheduler = Arc<dyn Scheduler>;

/// Tokio-backed scheduler: each timer is a task that sleeps and then posts
/// its event to an mpsc queue, unless its cancellation token fires first.
#[derive(Debug)]
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<TimerEvent>,
    next_id: AtomicU64,
    tokens: Arc<Mutex<HashMap<TimerId, CancellationToken>>>,
}

impl TokioScheduler {
    /// Create a scheduler and the receiving end of its event queue
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            tx,
            next_id: AtomicU64::new(1),
            tokens: Arc::new(Mutex::new(HashMap::new())),
        };
        (scheduler, rx)
    }

    /// Number of timers still pending
    pub fn pending(&self) -> usize {
        self.tokens.lock().len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, event: TimerEvent) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();
        self.tokens.lock().insert(id, token.clone());

        let tx = self.tx.clone();
        let tokens = self.tokens.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(timer = %id, "timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    tokens.lock().remove(&id);
                    if tx.send(event).is_err() {
                        debug!(timer = %id, "event queue closed, dropping timer event");
                    }
                }
            }
        });
        id
    }

    fn cancel(&self, id: TimerId) {
        if let Some(token) = self.tokens.lock().remove(&id) {
            token.cancel();
        }
    }
}

/// Scheduler for tests: timers sit in a queue ordered by due time until the
/// test pops them.
#[derive(Debug)]
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    next_id: AtomicU64,
    pending: Mutex<BTreeMap<(i64, TimerId), TimerEvent>>,
}

impl ManualScheduler {
    /// Create a scheduler that computes due times from `clock`
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// Remove and return the earliest timer due at or before `limit_ms`
    pub fn pop_due(&self, limit_ms: i64) -> Option<(i64, TimerEvent)> {
        let mut pending = self.pending.lock();
        let key = *pending.keys().next()?;
        if key.0 > limit_ms {
            return None;
        }
        pending.remove(&key).map(|event| (key.0, event))
    }

    /// Due time of the earliest pending timer
    pub fn next_due(&self) -> Option<i64> {
        self.pending.lock().keys().next().map(|(due, _)| *due)
    }

    /// Number of pending timers
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, event: TimerEvent) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let due = self.clock.now_ms().saturating_add(millis(delay));
        self.pending.lock().insert((due, id), event);
        id
    }

    fn cancel(&self, id: TimerId) {
        self.pending.lock().retain(|(_, timer), _| *timer != id);
    }
}
