use anyhow::Result;
use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use rest_athlete_lib::{
    db, load_config_util, save_config_util, AppService, Config, DbError, HydrationTracker,
    RestartPolicy, SessionOptions, SessionSnapshot, SqliteStore, StopPolicy, Workout,
    WorkoutSession, WorkoutSet, WorkoutStore,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

// Helper function to create a test store with an in-memory database
fn create_test_store() -> Result<Arc<SqliteStore>> {
    Ok(Arc::new(SqliteStore::open_in_memory()?))
}

fn spawn_session(store: &Arc<SqliteStore>, auto_select_on_add: bool) -> WorkoutSession {
    WorkoutSession::spawn(Arc::clone(store), SessionOptions { auto_select_on_add })
}

async fn wait_for<F>(session: &WorkoutSession, pred: F) -> Result<SessionSnapshot>
where
    F: FnMut(&SessionSnapshot) -> bool,
{
    let snapshot = timeout(WAIT, session.wait_until(pred))
        .await?
        .ok_or_else(|| anyhow::anyhow!("session stopped"))?;
    Ok(snapshot)
}

async fn settled(session: &WorkoutSession) -> Result<SessionSnapshot> {
    wait_for(session, SessionSnapshot::is_settled).await
}

/// Delegates to SQLite but holds `list_sets` for some workouts on the
/// blocking pool, so queries can be made to finish out of order.
struct SlowStore {
    inner: Arc<SqliteStore>,
    delays: HashMap<i64, Duration>,
}

impl WorkoutStore for SlowStore {
    fn list_workouts(&self) -> Result<Vec<Workout>, DbError> {
        self.inner.list_workouts()
    }

    fn list_sets(&self, workout_id: i64) -> Result<Vec<WorkoutSet>, DbError> {
        if let Some(delay) = self.delays.get(&workout_id) {
            std::thread::sleep(*delay);
        }
        self.inner.list_sets(workout_id)
    }

    fn insert_workout(&self, name: &str) -> Result<i64, DbError> {
        self.inner.insert_workout(name)
    }

    fn rename_workout(&self, id: i64, name: &str) -> Result<(), DbError> {
        self.inner.rename_workout(id, name)
    }

    fn delete_workout(&self, id: i64) -> Result<(), DbError> {
        self.inner.delete_workout(id)
    }

    fn insert_set(&self, workout_id: i64, weight: f64) -> Result<i64, DbError> {
        self.inner.insert_set(workout_id, weight)
    }

    fn update_set_weight(&self, id: i64, weight: f64) -> Result<(), DbError> {
        self.inner.update_set_weight(id, weight)
    }

    fn delete_set(&self, id: i64) -> Result<(), DbError> {
        self.inner.delete_set(id)
    }

    fn subscribe(&self) -> tokio::sync::watch::Receiver<u64> {
        self.inner.subscribe()
    }
}

/// Delegates to SQLite but can be switched into failing reads or writes.
struct FlakyStore {
    inner: Arc<SqliteStore>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn new(inner: Arc<SqliteStore>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn check_write(&self) -> Result<(), DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::LockPoisoned);
        }
        Ok(())
    }
}

impl WorkoutStore for FlakyStore {
    fn list_workouts(&self) -> Result<Vec<Workout>, DbError> {
        self.inner.list_workouts()
    }

    fn list_sets(&self, workout_id: i64) -> Result<Vec<WorkoutSet>, DbError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DbError::LockPoisoned);
        }
        self.inner.list_sets(workout_id)
    }

    fn insert_workout(&self, name: &str) -> Result<i64, DbError> {
        self.check_write()?;
        self.inner.insert_workout(name)
    }

    fn rename_workout(&self, id: i64, name: &str) -> Result<(), DbError> {
        self.check_write()?;
        self.inner.rename_workout(id, name)
    }

    fn delete_workout(&self, id: i64) -> Result<(), DbError> {
        self.check_write()?;
        self.inner.delete_workout(id)
    }

    fn insert_set(&self, workout_id: i64, weight: f64) -> Result<i64, DbError> {
        self.check_write()?;
        self.inner.insert_set(workout_id, weight)
    }

    fn update_set_weight(&self, id: i64, weight: f64) -> Result<(), DbError> {
        self.check_write()?;
        self.inner.update_set_weight(id, weight)
    }

    fn delete_set(&self, id: i64) -> Result<(), DbError> {
        self.check_write()?;
        self.inner.delete_set(id)
    }

    fn subscribe(&self) -> tokio::sync::watch::Receiver<u64> {
        self.inner.subscribe()
    }
}

// ---- Database ----

#[test]
fn test_delete_workout_cascades_to_sets() -> Result<()> {
    let store = create_test_store()?;
    let squat = store.insert_workout("Squat")?;
    let bench = store.insert_workout("Bench")?;
    store.insert_set(squat, 100.0)?;
    store.insert_set(squat, 105.0)?;
    store.insert_set(bench, 60.0)?;

    store.delete_workout(squat)?;

    assert!(store.list_sets(squat)?.is_empty());
    assert_eq!(store.list_sets(bench)?.len(), 1);
    let orphans: i64 = store.with_conn(|conn| {
        conn.query_row(
            "SELECT COUNT(*) FROM sets WHERE workout_id = ?1",
            [squat],
            |row| row.get(0),
        )
        .map_err(DbError::QueryFailed)
    })?;
    assert_eq!(orphans, 0);
    assert_eq!(store.list_workouts()?.len(), 1);

    Ok(())
}

#[test]
fn test_sets_are_ordered_by_timestamp() -> Result<()> {
    let store = create_test_store()?;
    let squat = store.insert_workout("Squat")?;
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

    store.with_conn(|conn| {
        db::add_set(conn, squat, 3.0, base + ChronoDuration::minutes(10))?;
        db::add_set(conn, squat, 1.0, base)?;
        db::add_set(conn, squat, 2.0, base + ChronoDuration::minutes(5))?;
        Ok(())
    })?;

    let weights: Vec<f64> = store.list_sets(squat)?.iter().map(|s| s.weight).collect();
    assert_eq!(weights, vec![1.0, 2.0, 3.0]);

    let first = &store.list_sets(squat)?[0];
    assert_eq!(first.timestamp, base);
    assert_eq!(first.workout_id, squat);

    Ok(())
}

#[test]
fn test_workout_not_found() -> Result<()> {
    let store = create_test_store()?;

    let result = store.rename_workout(999, "Nope");
    assert!(matches!(result, Err(DbError::WorkoutNotFound(999))));

    let result = store.delete_workout(999);
    assert!(matches!(result, Err(DbError::WorkoutNotFound(999))));

    let result = store.insert_set(999, 50.0);
    assert!(matches!(result, Err(DbError::WorkoutNotFound(999))));

    Ok(())
}

#[test]
fn test_set_not_found() -> Result<()> {
    let store = create_test_store()?;

    let result = store.update_set_weight(42, 50.0);
    assert!(matches!(result, Err(DbError::SetNotFound(42))));

    let result = store.delete_set(42);
    assert!(matches!(result, Err(DbError::SetNotFound(42))));

    Ok(())
}

#[test]
fn test_writes_bump_revision() -> Result<()> {
    let store = create_test_store()?;
    assert_eq!(store.revision(), 0);

    let squat = store.insert_workout("Squat")?;
    let set = store.insert_set(squat, 80.0)?;
    store.update_set_weight(set, 85.0)?;
    assert_eq!(store.revision(), 3);

    // Failed writes and reads leave it alone
    assert!(store.delete_set(set + 100).is_err());
    store.list_sets(squat)?;
    assert_eq!(store.revision(), 3);

    Ok(())
}

// ---- Hydration ----

#[test]
fn test_hydration_counts_per_day() -> Result<()> {
    let tracker = HydrationTracker::new(create_test_store()?);
    let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    let tuesday = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

    assert_eq!(tracker.count_on(monday)?, 0);
    assert_eq!(tracker.drink_on(monday)?, 1);
    assert_eq!(tracker.drink_on(monday)?, 2);
    assert_eq!(tracker.drink_on(tuesday)?, 1);
    assert_eq!(tracker.count_on(monday)?, 2);

    tracker.reset_on(monday)?;
    assert_eq!(tracker.count_on(monday)?, 0);
    assert_eq!(tracker.count_on(tuesday)?, 1);

    Ok(())
}

#[test]
fn test_hydration_undo_stops_at_zero() -> Result<()> {
    let tracker = HydrationTracker::new(create_test_store()?);
    let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

    assert_eq!(tracker.undo_on(day)?, 0);
    tracker.drink_on(day)?;
    assert_eq!(tracker.undo_on(day)?, 0);
    assert_eq!(tracker.undo_on(day)?, 0);

    Ok(())
}

// ---- Config ----

#[test]
fn test_config_operations() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.toml");

    // Missing file gets written with defaults
    let config = load_config_util(&path)?;
    assert_eq!(config, Config::default());
    assert!(path.exists());
    assert_eq!(config.rest.between_sets_secs, 60);
    assert_eq!(config.rest.between_workouts_secs, 120);
    assert!(config.session.auto_select_on_add);
    assert_eq!(config.timer.restart, RestartPolicy::Restart);
    assert_eq!(config.timer.stop, StopPolicy::Preserve);

    let mut changed = config.clone();
    changed.rest.between_sets_secs = 90;
    changed.timer.stop = StopPolicy::Reset;
    changed.session.auto_select_on_add = false;
    changed.theme.header_color = "Cyan".to_string();
    save_config_util(&path, &changed)?;

    assert_eq!(load_config_util(&path)?, changed);

    Ok(())
}

#[test]
fn test_config_missing_keys_use_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[rest]\nbetween_sets_secs = 45\n\n[timer]\nrestart = \"ignore\"\n")?;

    let config = load_config_util(&path)?;
    assert_eq!(config.rest.between_sets_secs, 45);
    assert_eq!(config.rest.between_workouts_secs, 120);
    assert_eq!(config.timer.restart, RestartPolicy::Ignore);
    assert_eq!(config.timer.stop, StopPolicy::Preserve);
    assert_eq!(config.theme.header_color, "Green");

    Ok(())
}

// ---- Session ----

#[tokio::test]
async fn test_session_loads_existing_workouts() -> Result<()> {
    let store = create_test_store()?;
    store.insert_workout("Squat")?;
    store.insert_workout("Bench")?;

    let session = spawn_session(&store, true);
    let snapshot = wait_for(&session, |s| s.workouts.len() == 2).await?;
    let names: Vec<&str> = snapshot.workouts.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["Squat", "Bench"]);
    assert!(snapshot.selected.is_none());
    assert!(snapshot.sets.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_add_workout_auto_selects() -> Result<()> {
    let store = create_test_store()?;
    let session = spawn_session(&store, true);

    session.add_workout("  Squat  ").await;
    let snapshot = settled(&session).await?;
    assert_eq!(snapshot.workouts.len(), 1);
    assert_eq!(snapshot.workouts[0].name, "Squat");
    assert_eq!(snapshot.selected.as_ref(), Some(&snapshot.workouts[0]));
    assert_eq!(snapshot.sets_workout_id, snapshot.selected_id());
    assert!(snapshot.sets.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_add_workout_without_auto_select() -> Result<()> {
    let store = create_test_store()?;
    let session = spawn_session(&store, false);

    session.add_workout("Squat").await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.workouts.len(), 1);
    assert!(snapshot.selected.is_none());

    Ok(())
}

#[tokio::test]
async fn test_blank_workout_name_is_ignored() -> Result<()> {
    let store = create_test_store()?;
    let session = spawn_session(&store, true);

    session.add_workout("   ").await;
    session.add_workout("").await;

    assert!(session.snapshot().workouts.is_empty());
    assert!(store.list_workouts()?.is_empty());
    assert_eq!(store.revision(), 0);

    Ok(())
}

#[tokio::test]
async fn test_add_set_without_selection_is_ignored() -> Result<()> {
    let store = create_test_store()?;
    let squat = store.insert_workout("Squat")?;
    let session = spawn_session(&store, true);
    session.refresh().await;
    let revision = store.revision();

    session.add_set(100.0).await;

    assert!(store.list_sets(squat)?.is_empty());
    assert_eq!(store.revision(), revision);
    assert!(session.snapshot().sets.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_invalid_weight_is_ignored() -> Result<()> {
    let store = create_test_store()?;
    let session = spawn_session(&store, true);
    session.add_workout("Squat").await;
    let snapshot = settled(&session).await?;
    let squat = snapshot.selected_id().unwrap();

    session.add_set(-5.0).await;
    session.add_set(f64::NAN).await;

    assert!(store.list_sets(squat)?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_sets_follow_selection() -> Result<()> {
    let store = create_test_store()?;
    let squat = store.insert_workout("Squat")?;
    let bench = store.insert_workout("Bench")?;
    store.insert_set(squat, 100.0)?;
    store.insert_set(squat, 110.0)?;
    store.insert_set(bench, 60.0)?;

    let session = spawn_session(&store, true);
    let snapshot = wait_for(&session, |s| s.workouts.len() == 2).await?;

    session.select(snapshot.workouts[0].clone()).await;
    let snapshot = settled(&session).await?;
    assert_eq!(snapshot.sets_workout_id, Some(squat));
    assert_eq!(snapshot.sets.len(), 2);
    assert!(snapshot.sets.iter().all(|s| s.workout_id == squat));

    session.select(snapshot.workouts[1].clone()).await;
    let snapshot = settled(&session).await?;
    assert_eq!(snapshot.sets_workout_id, Some(bench));
    assert_eq!(snapshot.sets.len(), 1);
    assert_eq!(snapshot.sets[0].weight, 60.0);

    session.clear_selection().await;
    let snapshot = settled(&session).await?;
    assert!(snapshot.selected.is_none());
    assert!(snapshot.sets.is_empty());
    assert_eq!(snapshot.sets_workout_id, None);

    Ok(())
}

#[tokio::test]
async fn test_added_set_appears_in_list() -> Result<()> {
    let store = create_test_store()?;
    let session = spawn_session(&store, true);
    session.add_workout("Squat").await;
    settled(&session).await?;

    session.add_set(100.0).await;
    let snapshot = settled(&session).await?;
    assert_eq!(snapshot.sets.len(), 1);
    assert_eq!(snapshot.sets[0].weight, 100.0);

    session.add_set(102.5).await;
    let snapshot = settled(&session).await?;
    let weights: Vec<f64> = snapshot.sets.iter().map(|s| s.weight).collect();
    assert_eq!(weights, vec![100.0, 102.5]);

    Ok(())
}

#[tokio::test]
async fn test_stale_sets_result_is_discarded() -> Result<()> {
    let sqlite = create_test_store()?;
    let slow = sqlite.insert_workout("Slow")?;
    let fast = sqlite.insert_workout("Fast")?;
    sqlite.insert_set(slow, 1.0)?;
    sqlite.insert_set(fast, 2.0)?;
    sqlite.insert_set(fast, 3.0)?;

    let store = Arc::new(SlowStore {
        inner: Arc::clone(&sqlite),
        delays: HashMap::from([(slow, Duration::from_millis(300))]),
    });
    let session = WorkoutSession::spawn(store, SessionOptions::default());
    let snapshot = wait_for(&session, |s| s.workouts.len() == 2).await?;

    session.select(snapshot.workouts[0].clone()).await;
    session.select(snapshot.workouts[1].clone()).await;
    let snapshot = settled(&session).await?;
    assert_eq!(snapshot.sets_workout_id, Some(fast));
    assert_eq!(snapshot.sets.len(), 2);

    // Let the slow query finish; it must not replace the list
    tokio::time::sleep(Duration::from_millis(600)).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.selected_id(), Some(fast));
    assert_eq!(snapshot.sets_workout_id, Some(fast));
    assert!(snapshot.sets.iter().all(|s| s.workout_id == fast));

    Ok(())
}

#[tokio::test]
async fn test_reselecting_waits_for_latest_query() -> Result<()> {
    let sqlite = create_test_store()?;
    let first = sqlite.insert_workout("First")?;
    let second = sqlite.insert_workout("Second")?;
    sqlite.insert_set(first, 10.0)?;
    sqlite.insert_set(second, 20.0)?;

    let store = Arc::new(SlowStore {
        inner: Arc::clone(&sqlite),
        delays: HashMap::from([(first, Duration::from_millis(200))]),
    });
    let session = WorkoutSession::spawn(store, SessionOptions::default());
    let snapshot = wait_for(&session, |s| s.workouts.len() == 2).await?;
    let (w1, w2) = (snapshot.workouts[0].clone(), snapshot.workouts[1].clone());

    session.select(w1.clone()).await;
    session.select(w2).await;
    session.select(w1).await;

    let snapshot = settled(&session).await?;
    assert_eq!(snapshot.sets_workout_id, Some(first));
    assert_eq!(snapshot.sets.len(), 1);
    assert_eq!(snapshot.sets[0].weight, 10.0);

    Ok(())
}

#[tokio::test]
async fn test_failed_writes_leave_snapshot_unchanged() -> Result<()> {
    let sqlite = create_test_store()?;
    let squat = sqlite.insert_workout("Squat")?;
    let set = sqlite.insert_set(squat, 100.0)?;
    let store = Arc::new(FlakyStore::new(Arc::clone(&sqlite)));
    let session = WorkoutSession::spawn(Arc::clone(&store), SessionOptions::default());

    let snapshot = wait_for(&session, |s| s.workouts.len() == 1).await?;
    session.select(snapshot.workouts[0].clone()).await;
    let before = settled(&session).await?;
    assert_eq!(before.sets.len(), 1);

    store.fail_writes.store(true, Ordering::SeqCst);
    session.add_workout("Bench").await;
    session.add_set(110.0).await;
    session.rename_workout(squat, "Front Squat").await;
    session.edit_set(set, 120.0).await;
    session.delete_set(set).await;
    session.delete_workout(squat).await;

    assert_eq!(session.snapshot(), before);
    assert_eq!(sqlite.list_workouts()?.len(), 1);
    assert_eq!(sqlite.list_sets(squat)?[0].weight, 100.0);

    Ok(())
}

#[tokio::test]
async fn test_failed_sets_query_still_settles() -> Result<()> {
    let sqlite = create_test_store()?;
    let squat = sqlite.insert_workout("Squat")?;
    sqlite.insert_set(squat, 100.0)?;
    let store = Arc::new(FlakyStore::new(Arc::clone(&sqlite)));
    let session = WorkoutSession::spawn(Arc::clone(&store), SessionOptions::default());
    let snapshot = wait_for(&session, |s| s.workouts.len() == 1).await?;

    store.fail_reads.store(true, Ordering::SeqCst);
    session.select(snapshot.workouts[0].clone()).await;
    let snapshot = settled(&session).await?;
    assert!(snapshot.load_failed);
    assert_eq!(snapshot.selected_id(), Some(squat));
    assert_eq!(snapshot.sets_workout_id, Some(squat));
    assert!(snapshot.sets.is_empty());

    // Next successful query clears the failure
    store.fail_reads.store(false, Ordering::SeqCst);
    session.refresh().await;
    let snapshot = settled(&session).await?;
    assert!(!snapshot.load_failed);
    assert_eq!(snapshot.sets.len(), 1);

    // A failing re-query keeps the list it already had
    store.fail_reads.store(true, Ordering::SeqCst);
    session.refresh().await;
    let snapshot = settled(&session).await?;
    assert!(snapshot.load_failed);
    assert_eq!(snapshot.sets.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_external_delete_clears_selection() -> Result<()> {
    let store = create_test_store()?;
    let squat = store.insert_workout("Squat")?;
    store.insert_set(squat, 100.0)?;
    let bench = store.insert_workout("Bench")?;

    let session = spawn_session(&store, true);
    let snapshot = wait_for(&session, |s| s.workouts.len() == 2).await?;
    session.select(snapshot.workouts[0].clone()).await;
    let snapshot = settled(&session).await?;
    assert_eq!(snapshot.sets.len(), 1);

    // Written behind the session's back
    store.delete_workout(squat)?;

    let snapshot = wait_for(&session, |s| s.workouts.len() == 1 && s.is_settled()).await?;
    assert!(snapshot.selected.is_none());
    assert!(snapshot.sets.is_empty());
    assert_eq!(snapshot.workouts[0].id, bench);

    Ok(())
}

#[tokio::test]
async fn test_external_set_insert_is_picked_up() -> Result<()> {
    let store = create_test_store()?;
    let session = spawn_session(&store, true);
    session.add_workout("Squat").await;
    let squat = settled(&session).await?.selected_id().unwrap();

    store.insert_set(squat, 90.0)?;

    let snapshot = wait_for(&session, |s| s.is_settled() && s.sets.len() == 1).await?;
    assert_eq!(snapshot.sets[0].weight, 90.0);

    Ok(())
}

#[tokio::test]
async fn test_rename_workout_updates_selection() -> Result<()> {
    let store = create_test_store()?;
    let session = spawn_session(&store, true);
    session.add_workout("Squat").await;
    let id = settled(&session).await?.selected_id().unwrap();

    session.rename_workout(id, " Front Squat ").await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.workouts[0].name, "Front Squat");
    assert_eq!(snapshot.selected.map(|w| w.name), Some("Front Squat".to_string()));

    // Blank rename keeps the old name
    session.rename_workout(id, "  ").await;
    assert_eq!(session.snapshot().workouts[0].name, "Front Squat");

    Ok(())
}

#[tokio::test]
async fn test_edit_and_delete_set() -> Result<()> {
    let store = create_test_store()?;
    let session = spawn_session(&store, true);
    session.add_workout("Squat").await;
    settled(&session).await?;
    session.add_set(100.0).await;
    let snapshot = settled(&session).await?;
    let set_id = snapshot.sets[0].id;

    session.edit_set(set_id, 105.0).await;
    let snapshot = settled(&session).await?;
    assert_eq!(snapshot.sets.len(), 1);
    assert_eq!(snapshot.sets[0].weight, 105.0);

    session.delete_set(set_id).await;
    let snapshot = settled(&session).await?;
    assert!(snapshot.sets.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_delete_selected_workout_through_session() -> Result<()> {
    let store = create_test_store()?;
    let session = spawn_session(&store, true);
    session.add_workout("Squat").await;
    let id = settled(&session).await?.selected_id().unwrap();
    session.add_set(100.0).await;
    settled(&session).await?;

    session.delete_workout(id).await;
    let snapshot = settled(&session).await?;
    assert!(snapshot.workouts.is_empty());
    assert!(snapshot.selected.is_none());
    assert!(snapshot.sets.is_empty());
    assert!(store.list_sets(id)?.is_empty());

    Ok(())
}

// ---- Service ----

#[tokio::test]
async fn test_service_select_workout() -> Result<()> {
    let store = create_test_store()?;
    let squat = store.insert_workout("Squat")?;
    store.insert_set(squat, 100.0)?;
    let service = AppService::with_store(
        Config::default(),
        store,
        ":memory:".into(),
        "test_config.toml".into(),
    );

    let snapshot = service.select_workout(squat).await?;
    assert_eq!(snapshot.selected_id(), Some(squat));
    assert_eq!(snapshot.sets.len(), 1);

    let missing = service.find_workout(squat + 1).await;
    assert!(missing.is_err());
    assert_eq!(service.rest.active_duration(), 60);

    Ok(())
}
