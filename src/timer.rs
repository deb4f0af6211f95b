//! Rest timer state machine.
//!
//! ```text
//! Idle --start--> Running --tick x N--> (Finished) --> Idle
//!                    |
//!                    +--stop--> Idle
//! ```
//!
//! One tokio task drives the ticks of a run. All state changes and event
//! emissions happen under a single mutex, and a tick only acts when the run
//! epoch it was spawned with is still current. A `stop` that takes the lock
//! first therefore suppresses every later decrement and the completion.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

const TICK: Duration = Duration::from_secs(1);
const EVENT_CAPACITY: usize = 64;

/// What `start` does while a countdown is already running.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RestartPolicy {
    /// Re-arm from the newly requested duration.
    #[default]
    Restart,
    /// Leave the running countdown alone.
    Ignore,
}

/// What a manual `stop` does to the remaining seconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StopPolicy {
    /// Keep the value the countdown had reached.
    #[default]
    Preserve,
    /// Drop remaining back to zero.
    Reset,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct TimerPolicy {
    pub restart: RestartPolicy,
    pub stop: StopPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerSnapshot {
    pub duration_seconds: u32,
    pub remaining_seconds: u32,
    pub is_running: bool,
}

impl TimerSnapshot {
    pub const fn phase(&self) -> TimerPhase {
        if self.is_running {
            TimerPhase::Running
        } else {
            TimerPhase::Idle
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Started { duration_seconds: u32 },
    Tick { remaining_seconds: u32 },
    /// Manual stop; `remaining_seconds` is the value after the stop policy applied.
    Stopped { remaining_seconds: u32 },
    /// Sent exactly once per run that reaches zero.
    Finished,
}

struct Inner {
    snapshot: TimerSnapshot,
    epoch: u64,
    task: Option<JoinHandle<()>>,
}

impl Inner {
    fn cancel_task(&mut self) {
        self.epoch += 1;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Shared {
    inner: Mutex<Inner>,
    state: watch::Sender<TimerSnapshot>,
    events: broadcast::Sender<TimerEvent>,
    policy: TimerPolicy,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State is plain data, a panic mid-update cannot leave it torn
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: TimerSnapshot) {
        self.state.send_replace(snapshot);
    }

    fn emit(&self, event: TimerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Cloneable handle to one countdown. Operations must be called from within a
/// tokio runtime.
#[derive(Clone)]
pub struct RestTimer {
    shared: Arc<Shared>,
}

impl RestTimer {
    pub fn new(policy: TimerPolicy) -> Self {
        let (state, _) = watch::channel(TimerSnapshot::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    snapshot: TimerSnapshot::default(),
                    epoch: 0,
                    task: None,
                }),
                state,
                events,
                policy,
            }),
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.shared.lock().snapshot
    }

    pub fn is_running(&self) -> bool {
        self.snapshot().is_running
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.shared.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<TimerEvent> {
        self.shared.events.subscribe()
    }

    /// Starts a countdown of `duration_seconds`. Returns whether a new run was
    /// armed: a zero duration is rejected, and a running timer is either
    /// re-armed or left alone depending on [`RestartPolicy`].
    pub fn start(&self, duration_seconds: u32) -> bool {
        if duration_seconds == 0 {
            warn!("Ignoring rest timer start with a zero-second duration");
            return false;
        }

        let mut inner = self.shared.lock();
        if inner.snapshot.is_running {
            match self.shared.policy.restart {
                RestartPolicy::Ignore => {
                    debug!(
                        remaining = inner.snapshot.remaining_seconds,
                        "Rest timer already running, start ignored"
                    );
                    return false;
                }
                RestartPolicy::Restart => {
                    debug!(
                        remaining = inner.snapshot.remaining_seconds,
                        "Re-arming running rest timer"
                    );
                    inner.cancel_task();
                }
            }
        }

        inner.epoch += 1;
        inner.snapshot = TimerSnapshot {
            duration_seconds,
            remaining_seconds: duration_seconds,
            is_running: true,
        };
        self.shared.publish(inner.snapshot);
        self.shared.emit(TimerEvent::Started { duration_seconds });

        let epoch = inner.epoch;
        inner.task = Some(tokio::spawn(run_ticks(Arc::clone(&self.shared), epoch)));
        info!(duration_seconds, "Rest timer started");
        true
    }

    /// Cancels a running countdown. Returns `false` if nothing was running.
    pub fn stop(&self) -> bool {
        let mut inner = self.shared.lock();
        if !inner.snapshot.is_running {
            debug!("Rest timer not running, stop ignored");
            return false;
        }

        inner.cancel_task();
        inner.snapshot.is_running = false;
        if self.shared.policy.stop == StopPolicy::Reset {
            inner.snapshot.remaining_seconds = 0;
        }
        let remaining_seconds = inner.snapshot.remaining_seconds;
        self.shared.publish(inner.snapshot);
        self.shared.emit(TimerEvent::Stopped { remaining_seconds });
        info!(remaining_seconds, "Rest timer stopped");
        true
    }

    /// Start/stop toggle. Returns whether the timer is running afterwards.
    pub fn toggle(&self, duration_seconds: u32) -> bool {
        if self.is_running() {
            self.stop();
            false
        } else {
            self.start(duration_seconds)
        }
    }
}

async fn run_ticks(shared: Arc<Shared>, epoch: u64) {
    let mut ticker = interval_at(Instant::now() + TICK, TICK);
    loop {
        ticker.tick().await;

        let mut inner = shared.lock();
        if inner.epoch != epoch || !inner.snapshot.is_running {
            return;
        }

        let remaining_seconds = inner.snapshot.remaining_seconds.saturating_sub(1);
        inner.snapshot.remaining_seconds = remaining_seconds;
        shared.emit(TimerEvent::Tick { remaining_seconds });

        if remaining_seconds == 0 {
            inner.snapshot.is_running = false;
            inner.task = None;
            shared.publish(inner.snapshot);
            shared.emit(TimerEvent::Finished);
            info!("Rest timer finished");
            return;
        }
        shared.publish(inner.snapshot);
    }
}
