//! Selection-driven workout pipeline.
//!
//! A single actor task owns the selection and the derived sets list and
//! publishes them as a [`SessionSnapshot`] through a `watch` channel. The
//! sets list is re-derived by a fresh store query whenever the selection or
//! the stored data changes. Each query carries a generation number and only
//! the result of the most recently started query is applied, so a slow
//! query for a workout the user already left can never overwrite the list.
//!
//! Store failures are logged and swallowed; validation rejections (blank
//! names, no selection, bad weights) are logged as warnings. Neither is
//! returned to the caller.

use crate::db::{DbError, Workout, WorkoutSet};
use crate::store::WorkoutStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    /// All workouts in creation order.
    pub workouts: Vec<Workout>,
    pub selected: Option<Workout>,
    /// Sets of `sets_workout_id`, oldest first.
    pub sets: Vec<WorkoutSet>,
    /// The workout `sets` was loaded for. `None` while nothing is selected or
    /// while the first query for a new selection is still in flight.
    pub sets_workout_id: Option<i64>,
    /// A sets query for the current selection is in flight.
    pub loading: bool,
    /// The latest sets query failed; `sets` holds whatever was there before.
    pub load_failed: bool,
}

impl SessionSnapshot {
    pub fn selected_id(&self) -> Option<i64> {
        self.selected.as_ref().map(|w| w.id)
    }

    /// True when no query is pending and `sets` belongs to the current
    /// selection (or both are empty).
    pub fn is_settled(&self) -> bool {
        !self.loading && self.selected_id() == self.sets_workout_id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SessionOptions {
    /// Select a workout right after it was added.
    pub auto_select_on_add: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            auto_select_on_add: true,
        }
    }
}

#[derive(Debug)]
enum Op {
    Select(Workout),
    ClearSelection,
    AddWorkout(String),
    RenameWorkout { id: i64, name: String },
    DeleteWorkout(i64),
    AddSet(f64),
    EditSet { id: i64, weight: f64 },
    DeleteSet(i64),
    Refresh,
}

struct Command {
    op: Op,
    ack: oneshot::Sender<()>,
}

struct SetsResult {
    generation: u64,
    workout_id: i64,
    sets: Result<Vec<WorkoutSet>, DbError>,
}

/// Handle to the pipeline actor. Cheap to clone; the actor stops once every
/// handle is dropped.
#[derive(Clone)]
pub struct WorkoutSession {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionSnapshot>,
}

impl WorkoutSession {
    /// Spawns the actor onto the current tokio runtime.
    pub fn spawn<S: WorkoutStore>(store: Arc<S>, options: SessionOptions) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SessionSnapshot::default());
        let revisions = store.subscribe();

        let actor = SessionActor {
            store,
            options,
            state: state_tx,
            revisions,
            store_live: true,
            generation: 0,
            results_tx,
        };
        tokio::spawn(actor.run(command_rx, results_rx));

        Self { commands, state }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Waits for a snapshot matching `pred`. `None` if the actor has stopped.
    pub async fn wait_until<F>(&self, mut pred: F) -> Option<SessionSnapshot>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut rx = self.state.clone();
        let snapshot = rx.wait_for(|s| pred(s)).await.ok()?.clone();
        Some(snapshot)
    }

    /// Waits until the sets list matches the current selection.
    pub async fn settled(&self) -> Option<SessionSnapshot> {
        self.wait_until(SessionSnapshot::is_settled).await
    }

    /// Selects `workout` without checking that it still exists; a stale
    /// selection is cleared on the next workout list change.
    pub async fn select(&self, workout: Workout) {
        self.send(Op::Select(workout)).await;
    }

    pub async fn clear_selection(&self) {
        self.send(Op::ClearSelection).await;
    }

    pub async fn add_workout(&self, name: &str) {
        self.send(Op::AddWorkout(name.to_string())).await;
    }

    pub async fn rename_workout(&self, id: i64, name: &str) {
        self.send(Op::RenameWorkout {
            id,
            name: name.to_string(),
        })
        .await;
    }

    pub async fn delete_workout(&self, id: i64) {
        self.send(Op::DeleteWorkout(id)).await;
    }

    /// Records a set of `weight` under the selected workout.
    pub async fn add_set(&self, weight: f64) {
        self.send(Op::AddSet(weight)).await;
    }

    pub async fn edit_set(&self, id: i64, weight: f64) {
        self.send(Op::EditSet { id, weight }).await;
    }

    pub async fn delete_set(&self, id: i64) {
        self.send(Op::DeleteSet(id)).await;
    }

    /// Re-reads workouts and the selected workout's sets from the store.
    pub async fn refresh(&self) {
        self.send(Op::Refresh).await;
    }

    // Returns once the actor has applied the operation.
    async fn send(&self, op: Op) {
        let (ack, done) = oneshot::channel();
        if self.commands.send(Command { op, ack }).is_err() {
            warn!("Workout session has shut down, operation dropped");
            return;
        }
        let _ = done.await;
    }
}

struct SessionActor<S> {
    store: Arc<S>,
    options: SessionOptions,
    state: watch::Sender<SessionSnapshot>,
    revisions: watch::Receiver<u64>,
    store_live: bool,
    generation: u64,
    results_tx: mpsc::UnboundedSender<SetsResult>,
}

impl<S: WorkoutStore> SessionActor<S> {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut results: mpsc::UnboundedReceiver<SetsResult>,
    ) {
        self.revisions.borrow_and_update();
        self.refresh_workouts().await;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command { op, ack }) => {
                        self.handle(op).await;
                        let _ = ack.send(());
                    }
                    None => break,
                },
                changed = self.revisions.changed(), if self.store_live => {
                    if changed.is_err() {
                        warn!("Store stopped publishing changes");
                        self.store_live = false;
                    } else {
                        self.revisions.borrow_and_update();
                        debug!("Store changed, re-reading");
                        self.on_store_changed().await;
                    }
                },
                Some(result) = results.recv() => self.apply_sets(result),
            }
        }
        debug!("Workout session stopped");
    }

    async fn handle(&mut self, op: Op) {
        match op {
            Op::Select(workout) => {
                debug!(id = workout.id, name = %workout.name, "Workout selected");
                self.set_selection(Some(workout));
            }
            Op::ClearSelection => self.set_selection(None),
            Op::AddWorkout(name) => self.add_workout(&name).await,
            Op::RenameWorkout { id, name } => {
                let trimmed = name.trim().to_string();
                if trimmed.is_empty() {
                    warn!(id, "Ignoring rename to a blank workout name");
                    return;
                }
                let new_name = trimmed.clone();
                if self
                    .run_store("rename workout", move |s| s.rename_workout(id, &new_name))
                    .await
                    .is_some()
                {
                    info!(id, name = %trimmed, "Renamed workout");
                    self.after_write().await;
                }
            }
            Op::DeleteWorkout(id) => {
                if self
                    .run_store("delete workout", move |s| s.delete_workout(id))
                    .await
                    .is_some()
                {
                    info!(id, "Deleted workout");
                    self.after_write().await;
                }
            }
            Op::AddSet(weight) => self.add_set(weight).await,
            Op::EditSet { id, weight } => {
                if !is_valid_weight(weight) {
                    warn!(id, weight, "Ignoring set edit with an invalid weight");
                    return;
                }
                if self
                    .run_store("edit set", move |s| s.update_set_weight(id, weight))
                    .await
                    .is_some()
                {
                    info!(id, weight, "Updated set");
                    self.after_write().await;
                }
            }
            Op::DeleteSet(id) => {
                if self
                    .run_store("delete set", move |s| s.delete_set(id))
                    .await
                    .is_some()
                {
                    info!(id, "Deleted set");
                    self.after_write().await;
                }
            }
            Op::Refresh => {
                self.revisions.borrow_and_update();
                self.on_store_changed().await;
            }
        }
    }

    async fn add_workout(&mut self, name: &str) {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            warn!("Ignoring workout with a blank name");
            return;
        }

        let owned = trimmed.to_string();
        let Some(id) = self
            .run_store("add workout", move |s| s.insert_workout(&owned))
            .await
        else {
            return;
        };
        info!(id, name = trimmed, "Added workout");
        self.after_write().await;

        if self.options.auto_select_on_add {
            let added = self
                .state
                .borrow()
                .workouts
                .iter()
                .find(|w| w.id == id)
                .cloned();
            match added {
                Some(workout) => {
                    debug!(id, "Auto-selecting added workout");
                    self.set_selection(Some(workout));
                }
                None => warn!(id, "Workout added but not found in list"),
            }
        }
    }

    async fn add_set(&mut self, weight: f64) {
        if !is_valid_weight(weight) {
            warn!(weight, "Ignoring set with an invalid weight");
            return;
        }
        let Some(selected) = self.state.borrow().selected.clone() else {
            warn!("Cannot add set: no workout selected");
            return;
        };

        let workout_id = selected.id;
        if let Some(id) = self
            .run_store("add set", move |s| s.insert_set(workout_id, weight))
            .await
        {
            info!(id, workout = %selected.name, weight, "Added set");
            self.after_write().await;
        }
    }

    /// Replaces the selection and re-subscribes the sets list to it.
    fn set_selection(&mut self, selected: Option<Workout>) {
        let workout_id = selected.as_ref().map(|w| w.id);
        self.state.send_modify(|s| {
            s.selected = selected;
            s.sets.clear();
            s.sets_workout_id = None;
            s.load_failed = false;
        });
        self.resubscribe_sets(workout_id);
    }

    /// Starts a new sets query and makes every older one stale.
    fn resubscribe_sets(&mut self, workout_id: Option<i64>) {
        self.generation += 1;
        self.state.send_modify(|s| s.loading = workout_id.is_some());
        let Some(workout_id) = workout_id else {
            return;
        };

        let generation = self.generation;
        let store = Arc::clone(&self.store);
        let results = self.results_tx.clone();
        tokio::task::spawn_blocking(move || {
            let sets = store.list_sets(workout_id);
            // Actor gone means nobody cares about the result
            let _ = results.send(SetsResult {
                generation,
                workout_id,
                sets,
            });
        });
    }

    fn apply_sets(&mut self, result: SetsResult) {
        if result.generation != self.generation {
            debug!(
                workout_id = result.workout_id,
                generation = result.generation,
                latest = self.generation,
                "Discarding superseded sets result"
            );
            return;
        }
        match result.sets {
            Ok(sets) => self.state.send_modify(|s| {
                s.sets = sets;
                s.sets_workout_id = Some(result.workout_id);
                s.loading = false;
                s.load_failed = false;
            }),
            Err(e) => {
                error!(workout_id = result.workout_id, error = %e, "Failed to load sets");
                // Settle on the old list so waiters are released
                self.state.send_modify(|s| {
                    s.sets_workout_id = Some(result.workout_id);
                    s.loading = false;
                    s.load_failed = true;
                });
            }
        }
    }

    async fn after_write(&mut self) {
        // Our own write already bumped the revision, skip the echo
        self.revisions.borrow_and_update();
        self.on_store_changed().await;
    }

    async fn on_store_changed(&mut self) {
        self.refresh_workouts().await;
        let selected = self.state.borrow().selected_id();
        if selected.is_some() {
            self.resubscribe_sets(selected);
        }
    }

    async fn refresh_workouts(&mut self) {
        let Some(workouts) = self.run_store("load workouts", |s| s.list_workouts()).await else {
            return;
        };

        let mut vanished = None;
        self.state.send_modify(|s| {
            if let Some(current) = &s.selected {
                match workouts.iter().find(|w| w.id == current.id) {
                    Some(fresh) => s.selected = Some(fresh.clone()),
                    None => {
                        vanished = Some(current.id);
                        s.selected = None;
                        s.sets.clear();
                        s.sets_workout_id = None;
                        s.load_failed = false;
                    }
                }
            }
            s.workouts = workouts;
        });

        if let Some(id) = vanished {
            debug!(id, "Selected workout no longer exists, selection cleared");
            self.resubscribe_sets(None);
        }
    }

    /// Runs a blocking store call off the actor. Failures are logged and
    /// turned into `None`.
    async fn run_store<T, F>(&self, what: &str, f: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> Result<T, DbError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || f(store.as_ref())).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                error!(error = %e, "Failed to {}", what);
                None
            }
            Err(e) => {
                error!(error = %e, "Store task failed during {}", what);
                None
            }
        }
    }
}

fn is_valid_weight(weight: f64) -> bool {
    weight.is_finite() && weight >= 0.0
}
