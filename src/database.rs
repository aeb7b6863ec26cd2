// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Database Management
//!
//! SQLite-backed persistence for the booking core. The schema carries the
//! invariants the engine relies on: non-negative credit balances, unique
//! (date, time) slot identity for idempotent materialization, unique
//! (slot, member) participations, and an AUTOINCREMENT participation
//! sequence that makes waitlist FIFO order insertion order.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::limits;

/// Attendance tracking database operations
pub mod attendance;
/// Booking engine, cancellation, and waitlist promotion
pub mod bookings;
/// Credit ledger operations
pub mod ledger;
/// Member storage operations
pub mod members;
/// Slot directory and template materialization
pub mod slots;
/// Weekly template storage and bulk flush
pub mod templates;

/// Database manager holding the shared connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection pool and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the file cannot be created,
    /// or schema migration fails.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(limits::DB_BUSY_TIMEOUT_SECS))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(limits::DB_MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Wrap an existing pool; used by tests that manage their own pool
    #[must_use]
    pub const fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Access the underlying connection pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if table or index creation fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS members (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'member' CHECK (role IN ('member', 'coach')),
                credits INTEGER NOT NULL DEFAULT 0 CHECK (credits >= 0),
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS weekly_templates (
                id TEXT PRIMARY KEY,
                day_of_week INTEGER NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
                start_time TEXT NOT NULL,
                title TEXT NOT NULL,
                capacity_main INTEGER NOT NULL CHECK (capacity_main >= 0),
                capacity_wait INTEGER NOT NULL CHECK (capacity_wait >= 0),
                enabled INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (day_of_week, start_time)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS slots (
                id TEXT PRIMARY KEY,
                slot_date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                title TEXT NOT NULL,
                capacity_main INTEGER NOT NULL CHECK (capacity_main >= 0),
                capacity_wait INTEGER NOT NULL CHECK (capacity_wait >= 0),
                created_at TEXT NOT NULL,
                UNIQUE (slot_date, start_time)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // seq is AUTOINCREMENT so insertion order is total and never reused;
        // the waitlist promotes strictly by seq.
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS participations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                slot_id TEXT NOT NULL REFERENCES slots(id) ON DELETE CASCADE,
                member_id TEXT NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                slot_date TEXT NOT NULL,
                list_type TEXT NOT NULL CHECK (list_type IN ('main', 'wait')),
                created_at TEXT NOT NULL,
                UNIQUE (slot_id, member_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS attendance (
                slot_id TEXT NOT NULL REFERENCES slots(id) ON DELETE CASCADE,
                member_id TEXT NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                attended INTEGER NOT NULL DEFAULT 0,
                attended_at TEXT,
                credit_charged INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (slot_id, member_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_participations_member_date
             ON participations(member_id, slot_date)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_participations_slot_list
             ON participations(slot_id, list_type)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_slots_date ON slots(slot_date)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_templates_day
             ON weekly_templates(day_of_week, enabled)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
