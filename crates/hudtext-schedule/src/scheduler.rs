//! The debounced flush scheduler.
//!
//! Each [`Scheduler`] owns one worker thread and at most one pending flush.
//! Requests are coalesced into that single slot: an earlier (or equally
//! early but higher-priority) request replaces it, anything else is
//! absorbed. When the slot's target time arrives the worker moves the
//! scheduler back to idle, releases the lock and invokes the flush callback,
//! so the callback may schedule the next flush itself.
//!
//! ```text
//!            schedule                 pause
//!   Idle ─────────────────▶ Pending ─────────▶ Paused
//!    ▲  ◀──── fire ───────── │   ▲ ◀── resume ──  │
//!    └────────── cancel ─────┘   └────────────────┘ (cancel → Idle)
//! ```

use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::governor::RateGovernor;

/// Default minimum interval between two flushes to the same recipient.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(525);

const DEFAULT_THREAD_NAME: &str = "hudtext-flush";

const FAR_FUTURE: Duration = Duration::from_secs(86_400);

/// Relative importance of a flush request. Only used to break ties between
/// requests resolving to the same instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    pub const LOW: Priority = Priority(0);
    pub const NORMAL: Priority = Priority(10);
    pub const HIGH: Priority = Priority(100);
    /// Used by [`SchedulerHandle::flush_now`].
    pub const IMMEDIATE: Priority = Priority(i32::MAX);
}

/// Passed to the flush callback when a scheduled flush fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flush {
    /// Highest priority among the requests coalesced into this flush.
    pub priority: Priority,
    /// The instant the flush was due.
    pub target: Instant,
    /// The instant the worker actually fired it.
    pub fired_at: Instant,
}

/// Observable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No flush is scheduled.
    Idle,
    /// A flush is counting down.
    Pending,
    /// A flush was counting down and is frozen.
    Paused,
}

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minimum time between two flushes, in milliseconds.
    pub min_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: millis(DEFAULT_MIN_INTERVAL),
        }
    }
}

impl SchedulerConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval_ms = millis(interval);
        self
    }
}

type FlushCallback = Arc<dyn Fn(&Flush) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum State {
    Idle,
    Pending {
        target: Instant,
        priority: Priority,
        generation: u64,
    },
    Paused {
        remaining: Duration,
        priority: Priority,
    },
}

struct Inner {
    state: State,
    governor: RateGovernor,
    callback: Option<FlushCallback>,
    generation: u64,
    shutdown: bool,
}

impl Inner {
    fn arm(&mut self, target: Instant, priority: Priority) {
        self.generation += 1;
        self.state = State::Pending {
            target,
            priority,
            generation: self.generation,
        };
    }
}

struct Shared {
    inner: Mutex<Inner>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A cloneable handle to a running scheduler.
///
/// Handles stay valid after the owning [`Scheduler`] is dropped, but every
/// operation then does nothing.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Registers the callback invoked on every flush, replacing any earlier one.
    pub fn on_flush<F>(&self, callback: F)
    where
        F: Fn(&Flush) + Send + Sync + 'static,
    {
        self.shared.lock().callback = Some(Arc::new(callback));
    }

    /// Requests a flush `delay` from now.
    pub fn schedule_flush(&self, delay: Duration, priority: Priority) {
        self.schedule_at(deadline_after(delay), priority);
    }

    /// Requests a flush at `target`.
    pub fn schedule_at(&self, target: Instant, priority: Priority) {
        let mut inner = self.shared.lock();
        if inner.shutdown {
            return;
        }

        let candidate = inner.governor.clamp(target);

        match inner.state {
            State::Idle => {
                inner.arm(candidate, priority);
                log::debug!("flush armed for {:?} ({:?})", candidate, priority);
            }
            State::Pending {
                target: current,
                priority: current_priority,
                generation,
            } => {
                if wins(candidate, priority, current, current_priority) {
                    inner.arm(candidate, priority);
                    log::debug!("flush moved to {:?} ({:?})", candidate, priority);
                } else {
                    inner.state = State::Pending {
                        target: current,
                        priority: current_priority.max(priority),
                        generation,
                    };
                    log::debug!("flush request absorbed by pending {:?}", current);
                }
            }
            State::Paused {
                remaining,
                priority: current_priority,
            } => {
                // Compare as if the frozen timer were resumed right now.
                let now = Instant::now();
                let candidate_remaining = candidate.saturating_duration_since(now);
                inner.state = if candidate_remaining < remaining
                    || (candidate_remaining == remaining && priority > current_priority)
                {
                    State::Paused {
                        remaining: candidate_remaining,
                        priority,
                    }
                } else {
                    State::Paused {
                        remaining,
                        priority: current_priority.max(priority),
                    }
                };
            }
        }

        drop(inner);
        self.shared.wake.notify_all();
    }

    /// Requests a flush as soon as the rate limit allows.
    pub fn flush_now(&self) {
        self.schedule_at(Instant::now(), Priority::IMMEDIATE);
    }

    /// Freezes a pending flush, keeping its remaining time.
    pub fn pause(&self) {
        let mut inner = self.shared.lock();
        if let State::Pending {
            target, priority, ..
        } = inner.state
        {
            let remaining = target.saturating_duration_since(Instant::now());
            inner.state = State::Paused {
                remaining,
                priority,
            };
            log::debug!("flush paused with {:?} remaining", remaining);
            drop(inner);
            self.shared.wake.notify_all();
        }
    }

    /// Restarts a paused flush for exactly the time it had left.
    pub fn resume(&self) {
        let mut inner = self.shared.lock();
        if let State::Paused {
            remaining,
            priority,
        } = inner.state
        {
            inner.arm(deadline_after(remaining), priority);
            log::debug!("flush resumed, due in {:?}", remaining);
            drop(inner);
            self.shared.wake.notify_all();
        }
    }

    /// Drops any pending or paused flush without firing it.
    pub fn cancel(&self) {
        let mut inner = self.shared.lock();
        if !matches!(inner.state, State::Idle) {
            inner.state = State::Idle;
            log::debug!("flush cancelled");
            drop(inner);
            self.shared.wake.notify_all();
        }
    }

    /// Treats the recipient as having just been written to by someone else:
    /// no flush may fire within the next `window`.
    pub fn delay(&self, window: Duration) {
        let mut inner = self.shared.lock();
        let until = deadline_after(window);
        inner.governor.block_until(until);
        log::debug!("flushes blocked until {:?}", until);
    }

    pub fn state(&self) -> SchedulerState {
        match self.shared.lock().state {
            State::Idle => SchedulerState::Idle,
            State::Pending { .. } => SchedulerState::Pending,
            State::Paused { .. } => SchedulerState::Paused,
        }
    }

    /// When the last flush fired, if ever.
    pub fn last_flush(&self) -> Option<Instant> {
        self.shared.lock().governor.last_flush()
    }
}

impl std::fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("SchedulerHandle")
            .field("state", &inner.state)
            .field("governor", &inner.governor)
            .field("shutdown", &inner.shutdown)
            .finish_non_exhaustive()
    }
}

/// `now + delay`, saturating at a day out for durations `Instant` cannot hold.
fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

fn millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}

/// `candidate` replaces `current` if strictly earlier, or equally early and
/// strictly more important.
fn wins(candidate: Instant, priority: Priority, current: Instant, current_priority: Priority) -> bool {
    candidate < current || (candidate == current && priority > current_priority)
}

/// Owns the worker thread of one scheduler.
///
/// Dereferences to [`SchedulerHandle`] for all operations. Dropping the
/// scheduler stops the worker; a flush already running is allowed to finish.
pub struct Scheduler {
    handle: SchedulerHandle,
    worker: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Starts a scheduler with a worker thread named `hudtext-flush`.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        Self::with_name(config, DEFAULT_THREAD_NAME)
    }

    /// Starts a scheduler whose worker thread has the given name.
    pub fn with_name(config: SchedulerConfig, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: State::Idle,
                governor: RateGovernor::new(config.min_interval()),
                callback: None,
                generation: 0,
                shutdown: false,
            }),
            wake: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_worker(worker_shared))
            .map_err(|source| ScheduleError::Spawn { name, source })?;

        Ok(Self {
            handle: SchedulerHandle { shared },
            worker: Some(worker),
        })
    }

    /// Returns a cloneable handle, e.g. for use inside the flush callback.
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }
}

impl Deref for Scheduler {
    type Target = SchedulerHandle;

    fn deref(&self) -> &SchedulerHandle {
        &self.handle
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        {
            let mut inner = self.handle.shared.lock();
            inner.shutdown = true;
            inner.state = State::Idle;
        }
        self.handle.shared.wake.notify_all();

        if let Some(worker) = self.worker.take() {
            // Dropped from inside the callback: the worker exits on its own.
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

fn run_worker(shared: Arc<Shared>) {
    let mut inner = shared.lock();

    loop {
        if inner.shutdown {
            return;
        }

        let State::Pending {
            target,
            priority,
            generation,
        } = inner.state
        else {
            inner = shared
                .wake
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
            continue;
        };

        let now = Instant::now();
        if now < target {
            inner = shared
                .wake
                .wait_timeout(inner, target - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
            continue;
        }

        // The rate window may have moved since the request was clamped.
        let allowed = inner.governor.clamp(now);
        if allowed > now {
            log::debug!("flush #{} rate limited until {:?}", generation, allowed);
            inner.arm(allowed, priority);
            continue;
        }

        inner.state = State::Idle;
        inner.governor.record_flush(now);
        let callback = inner.callback.clone();
        drop(inner);

        let flush = Flush {
            priority,
            target,
            fired_at: now,
        };
        match callback {
            Some(callback) => {
                log::debug!("flush #{} firing ({:?})", generation, priority);
                if panic::catch_unwind(AssertUnwindSafe(|| callback(&flush))).is_err() {
                    log::error!("flush callback panicked");
                }
            }
            None => log::warn!("flush #{} fired with no callback registered", generation),
        }

        inner = shared.lock();
    }
}
