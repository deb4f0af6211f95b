//! Blocking rest countdown surface.
//!
//! Runs its own one-second loop, independent of [`crate::timer::RestTimer`].
//! The finish and cancel callbacks live in one `Option` that is taken by
//! whichever of expiry, `confirm` or `dismiss` gets there first, so exactly
//! one of them runs per dialog.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    /// Counted down to zero; finish callback ran.
    Expired,
    /// User confirmed early; finish callback ran.
    Confirmed,
    /// User dismissed before expiry; cancel callback ran.
    Cancelled,
}

type Callback = Box<dyn FnOnce() + Send + 'static>;

struct Callbacks {
    on_finish: Callback,
    on_cancel: Callback,
}

struct Shared {
    callbacks: Mutex<Option<Callbacks>>,
    remaining: watch::Sender<u32>,
    outcome: watch::Sender<Option<DialogOutcome>>,
}

impl Shared {
    fn is_resolved(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    fn resolve(&self, outcome: DialogOutcome) -> bool {
        let taken = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(callbacks) = taken else {
            return false;
        };

        self.outcome.send_replace(Some(outcome));
        match outcome {
            DialogOutcome::Expired | DialogOutcome::Confirmed => (callbacks.on_finish)(),
            DialogOutcome::Cancelled => (callbacks.on_cancel)(),
        }
        true
    }
}

pub struct CountdownDialog {
    seconds: u32,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl CountdownDialog {
    /// Opens the dialog and starts counting down from `seconds`. Must be called
    /// from within a tokio runtime. A zero start finishes right away.
    ///
    /// Dropping the dialog does not stop the loop: it still expires and runs
    /// `on_finish` unless it was confirmed or dismissed first.
    pub fn open<F, C>(seconds: u32, on_finish: F, on_cancel: C) -> Self
    where
        F: FnOnce() + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let (remaining, _) = watch::channel(seconds);
        let (outcome, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            callbacks: Mutex::new(Some(Callbacks {
                on_finish: Box::new(on_finish),
                on_cancel: Box::new(on_cancel),
            })),
            remaining,
            outcome,
        });
        let task = tokio::spawn(run_countdown(Arc::clone(&shared), seconds));
        debug!(seconds, "Rest countdown opened");
        Self {
            seconds,
            shared,
            task,
        }
    }

    pub const fn starting_seconds(&self) -> u32 {
        self.seconds
    }

    pub fn remaining(&self) -> u32 {
        *self.shared.remaining.borrow()
    }

    pub fn watch_remaining(&self) -> watch::Receiver<u32> {
        self.shared.remaining.subscribe()
    }

    /// Fraction of the countdown still left, clamped to `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.seconds == 0 {
            return 0.0;
        }
        (f64::from(self.remaining()) / f64::from(self.seconds)).clamp(0.0, 1.0)
    }

    /// User tapped OK: finish now. Returns `false` if already resolved.
    pub fn confirm(&self) -> bool {
        let resolved = self.shared.resolve(DialogOutcome::Confirmed);
        if resolved {
            self.task.abort();
            info!(remaining = self.remaining(), "Rest countdown confirmed");
        }
        resolved
    }

    /// User tapped Cancel. Returns `false` if already resolved.
    pub fn dismiss(&self) -> bool {
        let resolved = self.shared.resolve(DialogOutcome::Cancelled);
        if resolved {
            self.task.abort();
            info!(remaining = self.remaining(), "Rest countdown cancelled");
        }
        resolved
    }

    pub fn outcome_now(&self) -> Option<DialogOutcome> {
        *self.shared.outcome.borrow()
    }

    /// Waits until the dialog has resolved one way or the other.
    pub async fn outcome(&self) -> DialogOutcome {
        let mut rx = self.shared.outcome.subscribe();
        let resolved = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => *outcome,
            // Sender lives in `self.shared`, cannot close while we hold it
            Err(_) => None,
        };
        resolved.unwrap_or(DialogOutcome::Cancelled)
    }
}

async fn run_countdown(shared: Arc<Shared>, seconds: u32) {
    let tick = Duration::from_secs(1);
    let mut ticker = interval_at(Instant::now() + tick, tick);
    let mut remaining = seconds;

    while remaining > 0 {
        ticker.tick().await;
        if shared.is_resolved() {
            return;
        }
        remaining -= 1;
        shared.remaining.send_replace(remaining);
        debug!(remaining, "Countdown tick");
    }

    if shared.resolve(DialogOutcome::Expired) {
        info!("Rest countdown expired");
    }
}
