// ABOUTME: Shared test helpers - database setup and raw-SQL seeders
// ABOUTME: In-memory single-connection pools for unit-style tests, tempfile DBs for concurrency
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

#![allow(dead_code)]

use boxbook::database::Database;
use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Row;
use uuid::Uuid;

/// In-memory database on a single connection.
///
/// `sqlite::memory:` gives each connection its own database, so the pool is
/// pinned to one connection. Fine for sequential tests; concurrency tests
/// need `file_db`.
pub async fn test_db() -> Database {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    let db = Database::from_pool(pool);
    db.migrate().await.expect("migrate");
    db
}

/// File-backed database for tests that exercise concurrent writers.
///
/// The `TempDir` must stay alive for the duration of the test.
pub async fn file_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite:{}", dir.path().join("test.db").display());
    let db = Database::new(&url).await.expect("file db");
    (db, dir)
}

pub async fn create_member(db: &Database, display_name: &str, role: &str, credits: i64) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO members (id, display_name, role, credits, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(id.to_string())
    .bind(display_name)
    .bind(role)
    .bind(credits)
    .bind(Utc::now().to_rfc3339())
    .execute(db.pool())
    .await
    .expect("insert member");
    id
}

pub async fn create_slot(
    db: &Database,
    date: &str,
    time: &str,
    capacity_main: i64,
    capacity_wait: i64,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO slots (id, slot_date, start_time, title, capacity_main, capacity_wait, created_at)
         VALUES (?1, ?2, ?3, 'WOD', ?4, ?5, ?6)",
    )
    .bind(id.to_string())
    .bind(date)
    .bind(time)
    .bind(capacity_main)
    .bind(capacity_wait)
    .bind(Utc::now().to_rfc3339())
    .execute(db.pool())
    .await
    .expect("insert slot");
    id
}

/// A slot starting the given number of minutes from now, in UTC (the
/// default facility offset).
pub async fn slot_starting_in(
    db: &Database,
    minutes: i64,
    capacity_main: i64,
    capacity_wait: i64,
) -> Uuid {
    let start = Utc::now() + Duration::minutes(minutes);
    create_slot(
        db,
        &start.format("%Y-%m-%d").to_string(),
        &start.format("%H:%M").to_string(),
        capacity_main,
        capacity_wait,
    )
    .await
}

pub async fn insert_participation(
    db: &Database,
    slot_id: Uuid,
    member_id: Uuid,
    slot_date: &str,
    list_type: &str,
) {
    sqlx::query(
        "INSERT INTO participations (slot_id, member_id, slot_date, list_type, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(slot_id.to_string())
    .bind(member_id.to_string())
    .bind(slot_date)
    .bind(list_type)
    .bind(Utc::now().to_rfc3339())
    .execute(db.pool())
    .await
    .expect("insert participation");
}

pub async fn credits(db: &Database, member_id: Uuid) -> i64 {
    sqlx::query("SELECT credits FROM members WHERE id = ?1")
        .bind(member_id.to_string())
        .fetch_one(db.pool())
        .await
        .expect("member row")
        .try_get("credits")
        .expect("credits column")
}

pub async fn list_count(db: &Database, slot_id: Uuid, list_type: &str) -> i64 {
    sqlx::query(
        "SELECT COUNT(*) AS n FROM participations WHERE slot_id = ?1 AND list_type = ?2",
    )
    .bind(slot_id.to_string())
    .bind(list_type)
    .fetch_one(db.pool())
    .await
    .expect("count")
    .try_get("n")
    .expect("count column")
}

pub async fn slot_date_of(db: &Database, slot_id: Uuid) -> String {
    sqlx::query("SELECT slot_date FROM slots WHERE id = ?1")
        .bind(slot_id.to_string())
        .fetch_one(db.pool())
        .await
        .expect("slot row")
        .try_get("slot_date")
        .expect("slot_date column")
}

pub async fn member_list(db: &Database, slot_id: Uuid, member_id: Uuid) -> Option<String> {
    sqlx::query("SELECT list_type FROM participations WHERE slot_id = ?1 AND member_id = ?2")
        .bind(slot_id.to_string())
        .bind(member_id.to_string())
        .fetch_optional(db.pool())
        .await
        .expect("query")
        .map(|row| row.try_get("list_type").expect("list_type column"))
}
