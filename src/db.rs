//src/db.rs
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutSet {
    pub id: i64,
    pub workout_id: i64, // FK to workouts.id, cascades on delete
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
}

// Custom Error type for DB operations
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection failed")]
    Connection(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing database file")]
    Io(#[from] std::io::Error),
    #[error("Workout not found: ID {0}")]
    WorkoutNotFound(i64),
    #[error("Set not found: ID {0}")]
    SetNotFound(i64),
    #[error("Database query failed: {0}")]
    QueryFailed(rusqlite::Error),
    #[error("Database update failed: {0}")]
    UpdateFailed(rusqlite::Error),
    #[error("Database insert failed: {0}")]
    InsertFailed(rusqlite::Error),
    #[error("Database delete failed: {0}")]
    DeleteFailed(rusqlite::Error),
    #[error("Database connection lock was poisoned")]
    LockPoisoned,
}

const DB_FILE_NAME: &str = "rest.sqlite";
const APP_DATA_DIR: &str = "rest-athlete";

/// Gets the path to the SQLite database file within the app's data directory.
/// Creates the directory if it doesn't exist.
pub fn get_db_path() -> Result<PathBuf, DbError> {
    let data_dir = dirs::data_dir().ok_or(DbError::DataDir)?;
    let app_dir = data_dir.join(APP_DATA_DIR);
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

/// Opens a connection to the SQLite database.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Connection, DbError> {
    Connection::open(path).map_err(DbError::Connection)
}

/// Initializes the database tables if they don't exist and turns on
/// foreign key enforcement for this connection (needed for the cascade).
pub fn init_db(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(DbError::Connection)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS workouts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )",
        [],
    )
    .map_err(DbError::Connection)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workout_id INTEGER NOT NULL REFERENCES workouts(id) ON DELETE CASCADE,
            weight REAL NOT NULL,
            timestamp TEXT NOT NULL -- fixed-width RFC3339 (micros, Z) so text order is time order
        )",
        [],
    )
    .map_err(DbError::Connection)?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sets_workout_id ON sets(workout_id)",
        [],
    )
    .map_err(DbError::Connection)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS hydration (
            day TEXT PRIMARY KEY, -- YYYY-MM-DD, local calendar day
            count INTEGER NOT NULL DEFAULT 0 CHECK(count >= 0)
        )",
        [],
    )
    .map_err(DbError::Connection)?;

    Ok(())
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---- Workouts ----

/// Inserts a workout and returns the generated ID. The caller is expected to
/// have trimmed and validated the name.
pub fn create_workout(conn: &Connection, name: &str) -> Result<i64, DbError> {
    conn.execute("INSERT INTO workouts (name) VALUES (?1)", params![name])
        .map_err(DbError::InsertFailed)?;
    Ok(conn.last_insert_rowid())
}

/// Renames a workout by ID.
pub fn rename_workout(conn: &Connection, id: i64, new_name: &str) -> Result<(), DbError> {
    let rows_affected = conn
        .execute(
            "UPDATE workouts SET name = ?1 WHERE id = ?2",
            params![new_name, id],
        )
        .map_err(DbError::UpdateFailed)?;

    if rows_affected == 0 {
        Err(DbError::WorkoutNotFound(id))
    } else {
        Ok(())
    }
}

/// Deletes a workout by ID. Its sets go with it via ON DELETE CASCADE.
pub fn delete_workout(conn: &Connection, id: i64) -> Result<(), DbError> {
    let rows_affected = conn
        .execute("DELETE FROM workouts WHERE id = ?1", params![id])
        .map_err(DbError::DeleteFailed)?;

    if rows_affected == 0 {
        Err(DbError::WorkoutNotFound(id))
    } else {
        Ok(())
    }
}

fn map_row_to_workout(row: &Row) -> Result<Workout, rusqlite::Error> {
    Ok(Workout {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

/// Lists all workouts in creation order.
pub fn list_workouts(conn: &Connection) -> Result<Vec<Workout>, DbError> {
    let mut stmt = conn
        .prepare("SELECT id, name FROM workouts ORDER BY id ASC")
        .map_err(DbError::QueryFailed)?;
    let workout_iter = stmt
        .query_map([], map_row_to_workout)
        .map_err(DbError::QueryFailed)?;

    workout_iter
        .collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)
}

// ---- Sets ----

/// Inserts a set under `workout_id`. Returns the new set ID.
pub fn add_set(
    conn: &Connection,
    workout_id: i64,
    weight: f64,
    timestamp: DateTime<Utc>,
) -> Result<i64, DbError> {
    let result = conn.execute(
        "INSERT INTO sets (workout_id, weight, timestamp) VALUES (?1, ?2, ?3)",
        params![workout_id, weight, format_timestamp(&timestamp)],
    );

    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(ref err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            // Only constraint on insert is the FK to workouts
            Err(DbError::WorkoutNotFound(workout_id))
        }
        Err(e) => Err(DbError::InsertFailed(e)),
    }
}

/// Changes the weight of an existing set.
pub fn update_set_weight(conn: &Connection, id: i64, weight: f64) -> Result<(), DbError> {
    let rows_affected = conn
        .execute(
            "UPDATE sets SET weight = ?1 WHERE id = ?2",
            params![weight, id],
        )
        .map_err(DbError::UpdateFailed)?;

    if rows_affected == 0 {
        Err(DbError::SetNotFound(id))
    } else {
        Ok(())
    }
}

pub fn delete_set(conn: &Connection, id: i64) -> Result<(), DbError> {
    let rows_affected = conn
        .execute("DELETE FROM sets WHERE id = ?1", params![id])
        .map_err(DbError::DeleteFailed)?;

    if rows_affected == 0 {
        Err(DbError::SetNotFound(id))
    } else {
        Ok(())
    }
}

// Helper function to map a database row to a WorkoutSet struct
fn map_row_to_set(row: &Row) -> Result<WorkoutSet, rusqlite::Error> {
    let id: i64 = row.get(0)?;
    let workout_id: i64 = row.get(1)?;
    let weight: f64 = row.get(2)?;
    let timestamp_str: String = row.get(3)?;

    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(WorkoutSet {
        id,
        workout_id,
        weight,
        timestamp,
    })
}

/// Lists the sets of one workout, oldest first.
pub fn list_sets_for_workout(
    conn: &Connection,
    workout_id: i64,
) -> Result<Vec<WorkoutSet>, DbError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, workout_id, weight, timestamp FROM sets
             WHERE workout_id = ?1
             ORDER BY timestamp ASC, id ASC",
        )
        .map_err(DbError::QueryFailed)?;
    let set_iter = stmt
        .query_map(params![workout_id], map_row_to_set)
        .map_err(DbError::QueryFailed)?;

    set_iter
        .collect::<Result<Vec<_>, _>>()
        .map_err(DbError::QueryFailed)
}

// ---- Hydration ----

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Water count for a calendar day; days without a row count as zero.
pub fn get_water_count(conn: &Connection, day: NaiveDate) -> Result<u32, DbError> {
    let count: Option<i64> = conn
        .query_row(
            "SELECT count FROM hydration WHERE day = ?1",
            params![day_key(day)],
            |row| row.get(0),
        )
        .optional()
        .map_err(DbError::QueryFailed)?;
    Ok(count.map_or(0, |c| u32::try_from(c).unwrap_or(0)))
}

pub fn set_water_count(conn: &Connection, day: NaiveDate, count: u32) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO hydration (day, count) VALUES (?1, ?2)
         ON CONFLICT(day) DO UPDATE SET count = excluded.count",
        params![day_key(day), count],
    )
    .map_err(DbError::UpdateFailed)?;
    Ok(())
}
