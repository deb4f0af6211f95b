//! Daily water counter.
//!
//! Counts are stored per local calendar day, so a new day starts at zero
//! without any scheduled reset job.

use crate::db::{self, DbError};
use crate::store::SqliteStore;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tracing::debug;

pub struct HydrationTracker {
    store: Arc<SqliteStore>,
}

impl HydrationTracker {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    pub fn count(&self) -> Result<u32, DbError> {
        self.count_on(Self::today())
    }

    pub fn count_on(&self, day: NaiveDate) -> Result<u32, DbError> {
        self.store.with_conn(|conn| db::get_water_count(conn, day))
    }

    /// One more glass today. Returns the new count.
    pub fn drink(&self) -> Result<u32, DbError> {
        self.drink_on(Self::today())
    }

    pub fn drink_on(&self, day: NaiveDate) -> Result<u32, DbError> {
        let count = self.store.with_conn(|conn| {
            let count = db::get_water_count(conn, day)?.saturating_add(1);
            db::set_water_count(conn, day, count)?;
            Ok(count)
        })?;
        debug!(count, "Hydration count incremented");
        Ok(count)
    }

    /// Takes back one glass, never going below zero. Returns the new count.
    pub fn undo(&self) -> Result<u32, DbError> {
        self.undo_on(Self::today())
    }

    pub fn undo_on(&self, day: NaiveDate) -> Result<u32, DbError> {
        let count = self.store.with_conn(|conn| {
            let count = db::get_water_count(conn, day)?.saturating_sub(1);
            db::set_water_count(conn, day, count)?;
            Ok(count)
        })?;
        debug!(count, "Hydration count decremented");
        Ok(count)
    }

    pub fn reset(&self) -> Result<(), DbError> {
        self.reset_on(Self::today())
    }

    pub fn reset_on(&self, day: NaiveDate) -> Result<(), DbError> {
        self.store.with_conn(|conn| db::set_water_count(conn, day, 0))?;
        debug!("Hydration count reset to 0");
        Ok(())
    }
}
