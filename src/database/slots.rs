// ABOUTME: Slot directory - lazy materialization of concrete class slots from the weekly template
// ABOUTME: Idempotent under concurrent first access via the (slot_date, start_time) unique key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Slot directory.
//!
//! Concrete per-date slots are materialized lazily from the weekly template
//! on first access. Once a date has concrete rows they are returned
//! verbatim: coach edits win and the template is never re-applied.

use crate::errors::{AppError, AppResult};
use crate::models::{format_date, parse_date, parse_time, parse_timestamp, Slot, SlotWithCounts};
use chrono::{Datelike, NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Manager for concrete slot rows
#[derive(Clone)]
pub struct SlotDirectory {
    pool: SqlitePool,
}

impl SlotDirectory {
    /// Create a new directory backed by the given pool
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Return the day's slots with live counts, materializing from the
    /// weekly template when the date has no concrete rows yet.
    ///
    /// No enabled template rows for the weekday is a configuration state,
    /// not a fault: the result is an empty list.
    pub async fn day_schedule(&self, date: NaiveDate) -> AppResult<Vec<SlotWithCounts>> {
        let existing = self.slots_for_date(date).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let weekday = i64::from(date.weekday().num_days_from_sunday());
        let templates = sqlx::query(
            "SELECT start_time, title, capacity_main, capacity_wait
             FROM weekly_templates
             WHERE day_of_week = ?1 AND enabled = 1
             ORDER BY start_time",
        )
        .bind(weekday)
        .fetch_all(&self.pool)
        .await?;

        if templates.is_empty() {
            return Ok(Vec::new());
        }

        // A concurrent first access may be materializing the same date;
        // the unique (slot_date, start_time) key makes the insert a no-op
        // for rows that already landed, and the re-read below returns one
        // consistent set either way.
        let now = Utc::now().to_rfc3339();
        for template in &templates {
            let start_time: String = template.try_get("start_time")?;
            let title: String = template.try_get("title")?;
            let capacity_main: i64 = template.try_get("capacity_main")?;
            let capacity_wait: i64 = template.try_get("capacity_wait")?;
            sqlx::query(
                "INSERT OR IGNORE INTO slots
                 (id, slot_date, start_time, title, capacity_main, capacity_wait, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(format_date(date))
            .bind(start_time)
            .bind(title)
            .bind(capacity_main)
            .bind(capacity_wait)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        }

        self.slots_for_date(date).await
    }

    /// Concrete slots for a date with live roster counts, no materialization
    pub async fn slots_for_date(&self, date: NaiveDate) -> AppResult<Vec<SlotWithCounts>> {
        let rows = sqlx::query(
            "SELECT s.id, s.slot_date, s.start_time, s.title, s.capacity_main,
                    s.capacity_wait, s.created_at,
                    (SELECT COUNT(*) FROM participations p
                     WHERE p.slot_id = s.id AND p.list_type = 'main') AS main_count,
                    (SELECT COUNT(*) FROM participations p
                     WHERE p.slot_id = s.id AND p.list_type = 'wait') AS wait_count
             FROM slots s
             WHERE s.slot_date = ?1
             ORDER BY s.start_time",
        )
        .bind(format_date(date))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SlotWithCounts {
                    slot: slot_from_row(row)?,
                    main_count: row.try_get("main_count")?,
                    wait_count: row.try_get("wait_count")?,
                })
            })
            .collect()
    }

    /// Look up a slot by id
    pub async fn get(&self, slot_id: Uuid) -> AppResult<Option<Slot>> {
        let row = sqlx::query(
            "SELECT id, slot_date, start_time, title, capacity_main, capacity_wait, created_at
             FROM slots WHERE id = ?1",
        )
        .bind(slot_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| slot_from_row(&r)).transpose()
    }

    /// Look up a slot by id, failing with `NotFound` if absent
    pub async fn get_required(&self, slot_id: Uuid) -> AppResult<Slot> {
        self.get(slot_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("slot {slot_id}")))
    }

    /// Live (main, wait) occupancy for a slot
    pub async fn live_counts(&self, slot_id: Uuid) -> AppResult<(i64, i64)> {
        let row = sqlx::query(
            "SELECT
                 SUM(CASE WHEN list_type = 'main' THEN 1 ELSE 0 END) AS main_count,
                 SUM(CASE WHEN list_type = 'wait' THEN 1 ELSE 0 END) AS wait_count
             FROM participations WHERE slot_id = ?1",
        )
        .bind(slot_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        let main_count: Option<i64> = row.try_get("main_count")?;
        let wait_count: Option<i64> = row.try_get("wait_count")?;
        Ok((main_count.unwrap_or(0), wait_count.unwrap_or(0)))
    }
}

/// Map a slots row into the domain type
pub(crate) fn slot_from_row(row: &SqliteRow) -> AppResult<Slot> {
    let id: String = row.try_get("id")?;
    let slot_date: String = row.try_get("slot_date")?;
    let start_time: String = row.try_get("start_time")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Slot {
        id: Uuid::parse_str(&id)
            .map_err(|e| AppError::internal(format!("corrupt slot id {id}: {e}")))?,
        slot_date: parse_date(&slot_date)
            .map_err(|_| AppError::internal(format!("corrupt slot date: {slot_date}")))?,
        start_time: parse_time(&start_time)
            .map_err(|_| AppError::internal(format!("corrupt slot time: {start_time}")))?,
        title: row.try_get("title")?,
        capacity_main: row.try_get("capacity_main")?,
        capacity_wait: row.try_get("capacity_wait")?,
        created_at: parse_timestamp(&created_at)?,
    })
}
