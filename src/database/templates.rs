// ABOUTME: Weekly template storage and the bulk flush of future slots
// ABOUTME: Flush refunds every main participant, removes participations, and deletes slot rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Weekly templates and bulk flush.
//!
//! Templates are ordinary persisted configuration rows, never in-memory
//! global state, so materialization stays reproducible. Flush is the bulk
//! cancellation a coach runs after editing the recurring template: every
//! matching future slot loses its roster, main participants get one credit
//! back, and the slot rows themselves are deleted so the next day-schedule
//! read re-materializes from the edited template.

use crate::config::environment::BookingPolicy;
use crate::errors::{AppError, AppResult};
use crate::models::{format_date, format_time, parse_time, parse_timestamp, WeeklyTemplate};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Which future slots a flush targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushScope {
    /// Every future slot
    AllFuture,
    /// Future slots on a given weekday (0 = Sunday .. 6 = Saturday)
    AllFutureByWeekday(u8),
    /// Future slots on the listed dates
    ExplicitDates(Vec<NaiveDate>),
}

/// Counts reported by a flush
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FlushSummary {
    /// Slot rows deleted
    pub flushed_slots: u64,
    /// Credits refunded (main seats plus held attendance charges)
    pub refunded_credits: u64,
    /// Participation rows removed
    pub removed_participations: u64,
}

/// Fields for creating or updating a template row
#[derive(Debug, Clone)]
pub struct UpsertTemplateRequest {
    /// Day of week, 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    /// Local start time
    pub start_time: NaiveTime,
    /// Class title
    pub title: String,
    /// Main-list capacity
    pub capacity_main: i64,
    /// Waitlist capacity
    pub capacity_wait: i64,
    /// Whether materialization should pick this row up
    pub enabled: bool,
}

/// Manager for weekly template rows and bulk flush
#[derive(Clone)]
pub struct TemplateManager {
    pool: SqlitePool,
    policy: BookingPolicy,
}

impl TemplateManager {
    /// Create a new manager with the facility's booking policy
    #[must_use]
    pub const fn new(pool: SqlitePool, policy: BookingPolicy) -> Self {
        Self { pool, policy }
    }

    /// List all template rows, ordered by weekday and time
    pub async fn list(&self) -> AppResult<Vec<WeeklyTemplate>> {
        let rows = sqlx::query(
            "SELECT id, day_of_week, start_time, title, capacity_main, capacity_wait,
                    enabled, created_at, updated_at
             FROM weekly_templates
             ORDER BY day_of_week, start_time",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(template_from_row).collect()
    }

    /// Create or update the template row for (weekday, time).
    ///
    /// Already-materialized dates are not touched; a coach who wants the
    /// edit applied to existing bookings runs a flush afterwards.
    pub async fn upsert(&self, request: &UpsertTemplateRequest) -> AppResult<WeeklyTemplate> {
        if request.day_of_week > 6 {
            return Err(AppError::invalid_input("day_of_week must be 0..=6"));
        }
        if request.title.trim().is_empty() {
            return Err(AppError::invalid_input("title must not be empty"));
        }
        if request.capacity_main < 0 || request.capacity_wait < 0 {
            return Err(AppError::invalid_input("capacities must be >= 0"));
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO weekly_templates
                 (id, day_of_week, start_time, title, capacity_main, capacity_wait,
                  enabled, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT (day_of_week, start_time) DO UPDATE
                 SET title = excluded.title,
                     capacity_main = excluded.capacity_main,
                     capacity_wait = excluded.capacity_wait,
                     enabled = excluded.enabled,
                     updated_at = excluded.updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(i64::from(request.day_of_week))
        .bind(format_time(request.start_time))
        .bind(&request.title)
        .bind(request.capacity_main)
        .bind(request.capacity_wait)
        .bind(i64::from(request.enabled))
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT id, day_of_week, start_time, title, capacity_main, capacity_wait,
                    enabled, created_at, updated_at
             FROM weekly_templates WHERE day_of_week = ?1 AND start_time = ?2",
        )
        .bind(i64::from(request.day_of_week))
        .bind(format_time(request.start_time))
        .fetch_one(&self.pool)
        .await?;
        template_from_row(&row)
    }

    /// Bulk-cancel matching future slots.
    ///
    /// For each target slot: one credit back to every main participant and
    /// to every held attendance charge, all participations and attendance
    /// rows removed, then the slot row deleted. One transaction; nothing is
    /// applied if any step fails.
    pub async fn flush(&self, scope: &FlushScope) -> AppResult<FlushSummary> {
        let slot_ids = self.resolve_targets(scope).await?;
        if slot_ids.is_empty() {
            return Ok(FlushSummary::default());
        }

        let mut summary = FlushSummary::default();
        let mut tx = self.pool.begin().await?;

        for slot_id in &slot_ids {
            let main_refunds = sqlx::query(
                "UPDATE members SET credits = credits + 1
                 WHERE id IN (SELECT member_id FROM participations
                              WHERE slot_id = ?1 AND list_type = 'main')",
            )
            .bind(slot_id)
            .execute(&mut *tx)
            .await?;

            let attendance_refunds = sqlx::query(
                "UPDATE members SET credits = credits + 1
                 WHERE id IN (SELECT member_id FROM attendance
                              WHERE slot_id = ?1 AND credit_charged = 1)",
            )
            .bind(slot_id)
            .execute(&mut *tx)
            .await?;

            let participations = sqlx::query("DELETE FROM participations WHERE slot_id = ?1")
                .bind(slot_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM attendance WHERE slot_id = ?1")
                .bind(slot_id)
                .execute(&mut *tx)
                .await?;

            let slots = sqlx::query("DELETE FROM slots WHERE id = ?1")
                .bind(slot_id)
                .execute(&mut *tx)
                .await?;

            summary.refunded_credits +=
                main_refunds.rows_affected() + attendance_refunds.rows_affected();
            summary.removed_participations += participations.rows_affected();
            summary.flushed_slots += slots.rows_affected();
        }

        tx.commit().await?;
        Ok(summary)
    }

    /// Ids of future slots matching the scope, in facility-local "future"
    async fn resolve_targets(&self, scope: &FlushScope) -> AppResult<Vec<String>> {
        let now_local = Utc::now().with_timezone(&self.policy.utc_offset());
        let today = format_date(now_local.date_naive());
        let time_now = format_time(now_local.time());

        let rows = match scope {
            FlushScope::AllFuture => {
                sqlx::query(
                    "SELECT id FROM slots
                     WHERE slot_date > ?1 OR (slot_date = ?1 AND start_time > ?2)",
                )
                .bind(&today)
                .bind(&time_now)
                .fetch_all(&self.pool)
                .await?
            }
            FlushScope::AllFutureByWeekday(weekday) => {
                if *weekday > 6 {
                    return Err(AppError::invalid_input("weekday must be 0..=6"));
                }
                sqlx::query(
                    "SELECT id FROM slots
                     WHERE (slot_date > ?1 OR (slot_date = ?1 AND start_time > ?2))
                       AND CAST(strftime('%w', slot_date) AS INTEGER) = ?3",
                )
                .bind(&today)
                .bind(&time_now)
                .bind(i64::from(*weekday))
                .fetch_all(&self.pool)
                .await?
            }
            FlushScope::ExplicitDates(dates) => {
                if dates.is_empty() {
                    return Err(AppError::invalid_input("dates must not be empty"));
                }
                let mut collected = Vec::new();
                for date in dates {
                    let mut rows = sqlx::query(
                        "SELECT id FROM slots
                         WHERE slot_date = ?1
                           AND (slot_date > ?2 OR (slot_date = ?2 AND start_time > ?3))",
                    )
                    .bind(format_date(*date))
                    .bind(&today)
                    .bind(&time_now)
                    .fetch_all(&self.pool)
                    .await?;
                    collected.append(&mut rows);
                }
                collected
            }
        };

        rows.iter()
            .map(|row| Ok(row.try_get::<String, _>("id")?))
            .collect()
    }
}

/// Map a template row into the domain type
fn template_from_row(row: &SqliteRow) -> AppResult<WeeklyTemplate> {
    let id: String = row.try_get("id")?;
    let day_of_week: i64 = row.try_get("day_of_week")?;
    let start_time: String = row.try_get("start_time")?;
    let enabled: i64 = row.try_get("enabled")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(WeeklyTemplate {
        id: Uuid::parse_str(&id)
            .map_err(|e| AppError::internal(format!("corrupt template id {id}: {e}")))?,
        day_of_week: u8::try_from(day_of_week)
            .map_err(|_| AppError::internal(format!("corrupt weekday: {day_of_week}")))?,
        start_time: parse_time(&start_time)
            .map_err(|_| AppError::internal(format!("corrupt template time: {start_time}")))?,
        title: row.try_get("title")?,
        capacity_main: row.try_get("capacity_main")?,
        capacity_wait: row.try_get("capacity_wait")?,
        enabled: enabled != 0,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
