//! Live-query boundary between the session pipeline and persistence.
//!
//! Queries are blocking (rusqlite); the session runs them on tokio's
//! blocking pool. Every successful write bumps a revision counter that
//! subscribers watch to know when to re-read.

use crate::db::{self, DbError, Workout, WorkoutSet};
use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

pub trait WorkoutStore: Send + Sync + 'static {
    fn list_workouts(&self) -> Result<Vec<Workout>, DbError>;
    /// Sets of one workout, ascending by creation timestamp.
    fn list_sets(&self, workout_id: i64) -> Result<Vec<WorkoutSet>, DbError>;

    fn insert_workout(&self, name: &str) -> Result<i64, DbError>;
    fn rename_workout(&self, id: i64, name: &str) -> Result<(), DbError>;
    /// Must also remove every set owned by the workout.
    fn delete_workout(&self, id: i64) -> Result<(), DbError>;

    fn insert_set(&self, workout_id: i64, weight: f64) -> Result<i64, DbError>;
    fn update_set_weight(&self, id: i64, weight: f64) -> Result<(), DbError>;
    fn delete_set(&self, id: i64) -> Result<(), DbError>;

    /// Revision counter, incremented after each successful write.
    fn subscribe(&self) -> watch::Receiver<u64>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
    revision: watch::Sender<u64>,
}

impl SqliteStore {
    /// Wraps an open connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self, DbError> {
        db::init_db(&conn)?;
        let (revision, _) = watch::channel(0);
        Ok(Self {
            conn: Mutex::new(conn),
            revision,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        Self::new(db::open_db(path)?)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::new(Connection::open_in_memory()?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    /// Runs `f` against the connection without touching the revision.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let conn = self.lock()?;
        f(&conn)
    }

    fn write<T>(&self, f: impl FnOnce(&Connection) -> Result<T, DbError>) -> Result<T, DbError> {
        let out = self.with_conn(f)?;
        self.revision.send_modify(|rev| *rev += 1);
        Ok(out)
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }
}

impl WorkoutStore for SqliteStore {
    fn list_workouts(&self) -> Result<Vec<Workout>, DbError> {
        self.with_conn(db::list_workouts)
    }

    fn list_sets(&self, workout_id: i64) -> Result<Vec<WorkoutSet>, DbError> {
        self.with_conn(|conn| db::list_sets_for_workout(conn, workout_id))
    }

    fn insert_workout(&self, name: &str) -> Result<i64, DbError> {
        self.write(|conn| db::create_workout(conn, name))
    }

    fn rename_workout(&self, id: i64, name: &str) -> Result<(), DbError> {
        self.write(|conn| db::rename_workout(conn, id, name))
    }

    fn delete_workout(&self, id: i64) -> Result<(), DbError> {
        self.write(|conn| db::delete_workout(conn, id))
    }

    fn insert_set(&self, workout_id: i64, weight: f64) -> Result<i64, DbError> {
        self.write(|conn| db::add_set(conn, workout_id, weight, Utc::now()))
    }

    fn update_set_weight(&self, id: i64, weight: f64) -> Result<(), DbError> {
        self.write(|conn| db::update_set_weight(conn, id, weight))
    }

    fn delete_set(&self, id: i64) -> Result<(), DbError> {
        self.write(|conn| db::delete_set(conn, id))
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
