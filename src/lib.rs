use anyhow::{bail, Context, Result};
use comfy_table::Color;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// --- Declare modules ---
mod config;
pub mod countdown;
pub mod db;
pub mod hydration;
pub mod rest;
pub mod session;
pub mod store;
pub mod timer;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util, load as load_config_util, parse_color,
    save as save_config_util, Config, ConfigError, RestDefaults, StandardColor, Theme,
};
pub use countdown::{CountdownDialog, DialogOutcome};
pub use db::{get_db_path as get_db_path_util, DbError, Workout, WorkoutSet};
pub use hydration::HydrationTracker;
pub use rest::{parse_seconds, parse_weight, RestSettings};
pub use session::{SessionOptions, SessionSnapshot, WorkoutSession};
pub use store::{SqliteStore, WorkoutStore};
pub use timer::{
    RestTimer, RestartPolicy, StopPolicy, TimerEvent, TimerPhase, TimerPolicy, TimerSnapshot,
};

/// Wires configuration, storage and the workout session together for the
/// command-line front end.
pub struct AppService {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub session: WorkoutSession,
    pub rest: RestSettings,
    pub hydration: HydrationTracker,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl AppService {
    /// Loads config, opens the database and spawns the workout session.
    /// Must be called from within a tokio runtime.
    /// # Errors
    /// Returns `anyhow::Error` if config/db path determination, loading, or initialization fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;

        let db_path = db::get_db_path().context("Failed to determine database path")?;
        let store = SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database at {db_path:?}"))?;

        Ok(Self::with_store(config, Arc::new(store), db_path, config_path))
    }

    /// Builds the service around an already opened store.
    pub fn with_store(
        config: Config,
        store: Arc<SqliteStore>,
        db_path: PathBuf,
        config_path: PathBuf,
    ) -> Self {
        let session = WorkoutSession::spawn(Arc::clone(&store), config.session);
        let rest = RestSettings::from_defaults(&config.rest);
        let hydration = HydrationTracker::new(Arc::clone(&store));
        Self {
            config,
            store,
            session,
            rest,
            hydration,
            db_path,
            config_path,
        }
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    /// Header colour from the theme, falling back to green on a bad name.
    pub fn header_color(&self) -> Color {
        match parse_color(&self.config.theme.header_color) {
            Ok(color) => color.into(),
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to default header colour");
                Color::Green
            }
        }
    }

    /// A rest timer using the configured start/stop policies.
    pub fn rest_timer(&self) -> RestTimer {
        RestTimer::new(self.config.timer)
    }

    /// Looks a workout up in the session's live list.
    /// # Errors
    /// Returns an error if no workout has that ID.
    pub async fn find_workout(&self, id: i64) -> Result<Workout> {
        self.session.refresh().await;
        match self
            .session
            .snapshot()
            .workouts
            .into_iter()
            .find(|w| w.id == id)
        {
            Some(workout) => Ok(workout),
            None => bail!(DbError::WorkoutNotFound(id)),
        }
    }

    /// Selects a workout by ID and waits until its sets are loaded.
    /// # Errors
    /// Returns an error if no workout has that ID, its sets could not be
    /// read, or the session stopped.
    pub async fn select_workout(&self, id: i64) -> Result<SessionSnapshot> {
        let workout = self.find_workout(id).await?;
        self.session.select(workout).await;
        let snapshot = self
            .session
            .wait_until(|s| s.selected_id() == Some(id) && s.is_settled())
            .await
            .context("Workout session stopped before the sets were loaded")?;
        if snapshot.load_failed {
            bail!("Failed to load sets for workout ID {}", id);
        }
        Ok(snapshot)
    }
}
