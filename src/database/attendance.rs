// ABOUTME: Attendance tracker - coach-driven presence marking with ledger charges
// ABOUTME: Walk-in seating respects capacity; toggles are idempotent via the credit_charged flag
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Attendance tracking.
//!
//! Attendance rows are independent of participations; the two are joined at
//! read time. Each row carries a `credit_charged` flag so marking the same
//! member present twice charges once, and un-marking refunds at most what
//! was charged. The attendance debit is clamped at zero: a coach's workflow
//! is never blocked by an empty balance.

use crate::database::ledger::{debit_clamped_tx, refund_tx};
use crate::database::slots::SlotDirectory;
use crate::errors::{AppError, AppResult};
use crate::models::{format_date, parse_timestamp, AttendanceRecord, ListType, Slot};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

/// A roster entry combining participation and attendance state
#[derive(Debug, Clone, serde::Serialize)]
pub struct RosterEntry {
    /// Member on the roster
    pub member_id: Uuid,
    /// Member display name
    pub display_name: String,
    /// Main roster or waitlist
    pub list_type: ListType,
    /// Whether the member was marked present
    pub attended: bool,
}

/// Manager for attendance rows
#[derive(Clone)]
pub struct AttendanceManager {
    pool: SqlitePool,
}

impl AttendanceManager {
    /// Create a new manager backed by the given pool
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Seat a walk-in on the main roster and mark them present.
    ///
    /// Walk-ins respect capacity like any booking, but not the booking
    /// window or the one-per-day rule: they happen at class time with the
    /// coach in the room. A waitlisted member walking in is upgraded in
    /// place. Exactly one credit is charged, through the attendance flag.
    pub async fn mark_walk_in(&self, slot_id: Uuid, member_id: Uuid) -> AppResult<AttendanceRecord> {
        let slots = SlotDirectory::new(self.pool.clone());
        let slot = slots.get_required(slot_id).await?;
        self.ensure_member_exists(member_id).await?;

        let mut tx = self.pool.begin().await?;
        self.seat_walk_in_tx(&mut tx, &slot, member_id).await?;
        let record = upsert_attended_tx(&mut tx, slot_id, member_id, true).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Set or clear a member's attendance on a slot.
    ///
    /// Marking present charges one clamped credit unless this row already
    /// holds a charge; marking absent refunds only a held charge. Repeated
    /// calls with the same value do not move the ledger.
    pub async fn toggle(
        &self,
        slot_id: Uuid,
        member_id: Uuid,
        attended: bool,
    ) -> AppResult<AttendanceRecord> {
        let slots = SlotDirectory::new(self.pool.clone());
        slots.get_required(slot_id).await?;
        self.ensure_member_exists(member_id).await?;

        let mut tx = self.pool.begin().await?;
        let record = upsert_attended_tx(&mut tx, slot_id, member_id, attended).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// The slot's roster: participations joined with attendance state
    pub async fn roster(&self, slot_id: Uuid) -> AppResult<Vec<RosterEntry>> {
        let rows = sqlx::query(
            "SELECT p.member_id, m.display_name, p.list_type,
                    COALESCE(a.attended, 0) AS attended
             FROM participations p
             JOIN members m ON m.id = p.member_id
             LEFT JOIN attendance a
                    ON a.slot_id = p.slot_id AND a.member_id = p.member_id
             WHERE p.slot_id = ?1
             ORDER BY p.list_type, p.seq",
        )
        .bind(slot_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let member_id: String = row.try_get("member_id")?;
                let list_type: String = row.try_get("list_type")?;
                let attended: i64 = row.try_get("attended")?;
                Ok(RosterEntry {
                    member_id: Uuid::parse_str(&member_id).map_err(|e| {
                        AppError::internal(format!("corrupt member id {member_id}: {e}"))
                    })?,
                    display_name: row.try_get("display_name")?,
                    list_type: ListType::parse(&list_type),
                    attended: attended != 0,
                })
            })
            .collect()
    }

    async fn ensure_member_exists(&self, member_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query("SELECT 1 FROM members WHERE id = ?1")
            .bind(member_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::not_found(format!("member {member_id}")));
        }
        Ok(())
    }

    /// Ensure a main participation exists for the walk-in, capacity-guarded.
    ///
    /// The OR IGNORE insert is the first write of the transaction. A zero
    /// row count means either the capacity guard failed or the member is
    /// already on the slot, so the existing row decides what happens next.
    async fn seat_walk_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        slot: &Slot,
        member_id: Uuid,
    ) -> AppResult<()> {
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO participations
                 (slot_id, member_id, slot_date, list_type, created_at)
             SELECT ?1, ?2, ?3, 'main', ?4
             WHERE (SELECT COUNT(*) FROM participations
                    WHERE slot_id = ?1 AND list_type = 'main') < ?5",
        )
        .bind(slot.id.to_string())
        .bind(member_id.to_string())
        .bind(format_date(slot.slot_date))
        .bind(Utc::now().to_rfc3339())
        .bind(slot.capacity_main)
        .execute(&mut **tx)
        .await?;

        if inserted.rows_affected() == 1 {
            return Ok(());
        }

        let existing = sqlx::query(
            "SELECT list_type FROM participations WHERE slot_id = ?1 AND member_id = ?2",
        )
        .bind(slot.id.to_string())
        .bind(member_id.to_string())
        .fetch_optional(&mut **tx)
        .await?;

        match existing {
            None => Err(AppError::slot_full("main list is full")),
            Some(row) => {
                let list_type = ListType::parse(&row.try_get::<String, _>("list_type")?);
                if list_type == ListType::Main {
                    return Ok(());
                }
                let upgraded = sqlx::query(
                    "UPDATE participations SET list_type = 'main'
                     WHERE slot_id = ?1 AND member_id = ?2
                       AND (SELECT COUNT(*) FROM participations
                            WHERE slot_id = ?1 AND list_type = 'main') < ?3",
                )
                .bind(slot.id.to_string())
                .bind(member_id.to_string())
                .bind(slot.capacity_main)
                .execute(&mut **tx)
                .await?;
                if upgraded.rows_affected() == 0 {
                    return Err(AppError::slot_full("main list is full"));
                }
                Ok(())
            }
        }
    }
}

/// Upsert the attendance row and settle the ledger against the charge flag.
///
/// Runs inside the caller's transaction; the upsert is a write, so the lock
/// is held before the flag is read.
async fn upsert_attended_tx(
    tx: &mut Transaction<'_, Sqlite>,
    slot_id: Uuid,
    member_id: Uuid,
    attended: bool,
) -> AppResult<AttendanceRecord> {
    let now = Utc::now().to_rfc3339();
    if attended {
        sqlx::query(
            "INSERT INTO attendance
                 (slot_id, member_id, attended, attended_at, credit_charged, updated_at)
             VALUES (?1, ?2, 1, ?3, 0, ?3)
             ON CONFLICT (slot_id, member_id) DO UPDATE
                 SET attended = 1, attended_at = excluded.attended_at,
                     updated_at = excluded.updated_at",
        )
        .bind(slot_id.to_string())
        .bind(member_id.to_string())
        .bind(&now)
        .execute(&mut **tx)
        .await?;
    } else {
        sqlx::query(
            "INSERT INTO attendance
                 (slot_id, member_id, attended, attended_at, credit_charged, updated_at)
             VALUES (?1, ?2, 0, NULL, 0, ?3)
             ON CONFLICT (slot_id, member_id) DO UPDATE
                 SET attended = 0, attended_at = NULL,
                     updated_at = excluded.updated_at",
        )
        .bind(slot_id.to_string())
        .bind(member_id.to_string())
        .bind(&now)
        .execute(&mut **tx)
        .await?;
    }

    let charged: i64 = sqlx::query(
        "SELECT credit_charged FROM attendance WHERE slot_id = ?1 AND member_id = ?2",
    )
    .bind(slot_id.to_string())
    .bind(member_id.to_string())
    .fetch_one(&mut **tx)
    .await?
    .try_get("credit_charged")?;

    if attended && charged == 0 {
        debit_clamped_tx(tx, member_id).await?;
        set_charged_tx(tx, slot_id, member_id, true).await?;
    } else if !attended && charged == 1 {
        refund_tx(tx, member_id, 1).await?;
        set_charged_tx(tx, slot_id, member_id, false).await?;
    }

    fetch_record_tx(tx, slot_id, member_id).await
}

async fn set_charged_tx(
    tx: &mut Transaction<'_, Sqlite>,
    slot_id: Uuid,
    member_id: Uuid,
    charged: bool,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE attendance SET credit_charged = ?1 WHERE slot_id = ?2 AND member_id = ?3",
    )
    .bind(i64::from(charged))
    .bind(slot_id.to_string())
    .bind(member_id.to_string())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn fetch_record_tx(
    tx: &mut Transaction<'_, Sqlite>,
    slot_id: Uuid,
    member_id: Uuid,
) -> AppResult<AttendanceRecord> {
    let row = sqlx::query(
        "SELECT slot_id, member_id, attended, attended_at, credit_charged, updated_at
         FROM attendance WHERE slot_id = ?1 AND member_id = ?2",
    )
    .bind(slot_id.to_string())
    .bind(member_id.to_string())
    .fetch_one(&mut **tx)
    .await?;
    record_from_row(&row)
}

/// Map an attendance row into the domain type
pub(crate) fn record_from_row(row: &SqliteRow) -> AppResult<AttendanceRecord> {
    let slot_id: String = row.try_get("slot_id")?;
    let member_id: String = row.try_get("member_id")?;
    let attended: i64 = row.try_get("attended")?;
    let attended_at: Option<String> = row.try_get("attended_at")?;
    let credit_charged: i64 = row.try_get("credit_charged")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(AttendanceRecord {
        slot_id: Uuid::parse_str(&slot_id)
            .map_err(|e| AppError::internal(format!("corrupt slot id {slot_id}: {e}")))?,
        member_id: Uuid::parse_str(&member_id)
            .map_err(|e| AppError::internal(format!("corrupt member id {member_id}: {e}")))?,
        attended: attended != 0,
        attended_at: attended_at.map(|s| parse_timestamp(&s)).transpose()?,
        credit_charged: credit_charged != 0,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
