// ABOUTME: Booking engine - window/one-per-day/capacity rules and the atomic debit-plus-seat transaction
// ABOUTME: Also owns cancellation with time-gated refunds and FIFO waitlist promotion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Booking engine.
//!
//! Capacity and one-per-day checks are re-evaluated inside the guarded
//! INSERT/UPDATE statements themselves, under SQLite's write lock. Every
//! multi-statement transaction here opens with a write so the lock is held
//! before any in-transaction read; a race loser observes a failed guard and
//! the whole transaction rolls back with no partial effects.

use crate::config::environment::BookingPolicy;
use crate::database::ledger::{debit_tx, refund_tx};
use crate::database::slots::SlotDirectory;
use crate::errors::{AppError, AppResult};
use crate::models::{format_date, ListType, Slot};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Where a successful booking landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingOutcome {
    /// Seated on the main roster; one credit was debited
    Main,
    /// Queued on the waitlist; no credit was debited
    Wait,
}

/// A waitlist member moved onto the main roster
#[derive(Debug, Clone, Copy)]
pub struct Promotion {
    /// Slot the seat belongs to
    pub slot_id: Uuid,
    /// Member who received the seat
    pub member_id: Uuid,
}

/// Result of a cancellation
#[derive(Debug, Clone, Copy)]
pub struct CancelOutcome {
    /// Whether the canceller's credit was refunded
    pub refunded: bool,
    /// Waitlist promotion triggered by the freed seat, if any
    pub promoted: Option<Promotion>,
}

enum MainAttempt {
    Booked,
    InsufficientCredits,
    GuardFailed,
}

/// Manager for bookings, cancellations, and waitlist promotion
#[derive(Clone)]
pub struct BookingManager {
    pool: SqlitePool,
    policy: BookingPolicy,
}

impl BookingManager {
    /// Create a new manager with the facility's booking policy
    #[must_use]
    pub const fn new(pool: SqlitePool, policy: BookingPolicy) -> Self {
        Self { pool, policy }
    }

    /// Book a slot for a member, optionally overflowing to the waitlist.
    ///
    /// Main-list bookings debit one credit atomically with the seat insert;
    /// waitlist entries are free until promotion. No partial effects remain
    /// on any failure path.
    pub async fn book(
        &self,
        member_id: Uuid,
        slot_id: Uuid,
        join_wait_if_full: bool,
    ) -> AppResult<BookingOutcome> {
        let slots = SlotDirectory::new(self.pool.clone());
        let slot = slots.get_required(slot_id).await?;
        self.check_booking_window(&slot, Utc::now())?;
        self.ensure_member_exists(member_id).await?;
        self.check_same_day(member_id, &slot).await?;

        let (main_count, _) = slots.live_counts(slot_id).await?;
        if main_count < slot.capacity_main {
            match self.try_book_main(&slot, member_id).await? {
                MainAttempt::Booked => return Ok(BookingOutcome::Main),
                MainAttempt::InsufficientCredits => {
                    return Err(AppError::insufficient_credits())
                }
                // Lost a race between the count read and the insert;
                // re-diagnose and fall through to the waitlist path.
                MainAttempt::GuardFailed => self.check_same_day(member_id, &slot).await?,
            }
        }

        if join_wait_if_full {
            if self.try_join_wait(&slot, member_id).await? {
                return Ok(BookingOutcome::Wait);
            }
            return Err(AppError::slot_full("main list and waitlist are full"));
        }
        Err(AppError::slot_full("main list is full"))
    }

    /// Cancel a member's participation on a slot.
    ///
    /// Cancellation is always permitted; only the refund is time-gated. A
    /// freed main seat triggers promotion regardless of refund outcome, so
    /// the seat is reused even when the canceller forfeits the credit.
    pub async fn cancel(&self, member_id: Uuid, slot_id: Uuid) -> AppResult<CancelOutcome> {
        let slots = SlotDirectory::new(self.pool.clone());
        let slot = slots.get_required(slot_id).await?;

        let mut tx = self.pool.begin().await?;

        // Write-first: the DELETE takes the write lock and reports the list
        // the member actually sat on at the moment of removal.
        let deleted = sqlx::query(
            "DELETE FROM participations WHERE slot_id = ?1 AND member_id = ?2
             RETURNING list_type",
        )
        .bind(slot_id.to_string())
        .bind(member_id.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = deleted else {
            tx.rollback().await?;
            return Err(AppError::not_booked());
        };
        let list_type = ListType::parse(&row.try_get::<String, _>("list_type")?);

        if list_type == ListType::Wait {
            tx.commit().await?;
            return Ok(CancelOutcome {
                refunded: false,
                promoted: None,
            });
        }

        let minutes_left = slot.minutes_until_start(self.policy.utc_offset(), Utc::now());
        let refunded = minutes_left >= self.policy.refund_cutoff_minutes;
        if refunded {
            refund_tx(&mut tx, member_id, 1).await?;
        }

        let promoted = promote_tx(&mut tx, &slot).await?;
        tx.commit().await?;

        if let Some(promotion) = promoted {
            tracing::info!(
                slot_id = %promotion.slot_id,
                member_id = %promotion.member_id,
                "waitlist member promoted to main roster"
            );
        }
        Ok(CancelOutcome { refunded, promoted })
    }

    /// Booking permitted only while `min_lead <= start - now <= max_lead`
    fn check_booking_window(&self, slot: &Slot, now: DateTime<Utc>) -> AppResult<()> {
        let minutes_left = slot.minutes_until_start(self.policy.utc_offset(), now);
        if minutes_left < self.policy.min_lead_minutes {
            return Err(AppError::outside_booking_window(format!(
                "bookings close {} minutes before class start",
                self.policy.min_lead_minutes
            )));
        }
        if minutes_left > self.policy.max_lead_minutes {
            return Err(AppError::outside_booking_window(format!(
                "bookings open {} minutes before class start",
                self.policy.max_lead_minutes
            )));
        }
        Ok(())
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

    /// One class per day: re-booking the same slot is `AlreadyBooked`, any
    /// other slot sharing the date is `AlreadyBookedThatDay`.
    async fn check_same_day(&self, member_id: Uuid, slot: &Slot) -> AppResult<()> {
        let row = sqlx::query(
            "SELECT slot_id FROM participations WHERE member_id = ?1 AND slot_date = ?2",
        )
        .bind(member_id.to_string())
        .bind(format_date(slot.slot_date))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(()),
            Some(existing) => {
                let existing_slot: String = existing.try_get("slot_id")?;
                if existing_slot == slot.id.to_string() {
                    Err(AppError::already_booked())
                } else {
                    Err(AppError::already_booked_that_day())
                }
            }
        }
    }

    /// The critical section: debit and seat as one transaction.
    ///
    /// Both statements are writes. The capacity and one-per-day guards sit
    /// in the INSERT's WHERE clause, so they hold at write time even if the
    /// pre-checks raced; a failed guard rolls the debit back.
    async fn try_book_main(&self, slot: &Slot, member_id: Uuid) -> AppResult<MainAttempt> {
        let mut tx = self.pool.begin().await?;

        if !debit_tx(&mut tx, member_id, 1).await? {
            tx.rollback().await?;
            return Ok(MainAttempt::InsufficientCredits);
        }

        let inserted = sqlx::query(
            "INSERT INTO participations (slot_id, member_id, slot_date, list_type, created_at)
             SELECT ?1, ?2, ?3, 'main', ?4
             WHERE (SELECT COUNT(*) FROM participations
                    WHERE slot_id = ?1 AND list_type = 'main') < ?5
               AND NOT EXISTS (SELECT 1 FROM participations
                               WHERE member_id = ?2 AND slot_date = ?3)",
        )
        .bind(slot.id.to_string())
        .bind(member_id.to_string())
        .bind(format_date(slot.slot_date))
        .bind(Utc::now().to_rfc3339())
        .bind(slot.capacity_main)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(MainAttempt::GuardFailed);
        }

        tx.commit().await?;
        Ok(MainAttempt::Booked)
    }

    /// Waitlist join: a single guarded statement, atomic on its own
    async fn try_join_wait(&self, slot: &Slot, member_id: Uuid) -> AppResult<bool> {
        let inserted = sqlx::query(
            "INSERT INTO participations (slot_id, member_id, slot_date, list_type, created_at)
             SELECT ?1, ?2, ?3, 'wait', ?4
             WHERE (SELECT COUNT(*) FROM participations
                    WHERE slot_id = ?1 AND list_type = 'wait') < ?5
               AND NOT EXISTS (SELECT 1 FROM participations
                               WHERE member_id = ?2 AND slot_date = ?3)",
        )
        .bind(slot.id.to_string())
        .bind(member_id.to_string())
        .bind(format_date(slot.slot_date))
        .bind(Utc::now().to_rfc3339())
        .bind(slot.capacity_wait)
        .execute(&self.pool)
        .await?;

        Ok(inserted.rows_affected() == 1)
    }
}

/// Promote the longest-waiting waitlist member into a freed main seat.
///
/// Runs inside the caller's transaction, after a write. FIFO by `seq`.
/// Promotion charges one credit at promotion time; a waiter who cannot pay
/// loses the reservation and the next-oldest is tried. An empty (or fully
/// unfunded) waitlist makes this a no-op, not an error.
pub(crate) async fn promote_tx(
    conn: &mut SqliteConnection,
    slot: &Slot,
) -> AppResult<Option<Promotion>> {
    loop {
        let candidate = sqlx::query(
            "SELECT seq, member_id FROM participations
             WHERE slot_id = ?1 AND list_type = 'wait'
             ORDER BY seq ASC LIMIT 1",
        )
        .bind(slot.id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = candidate else {
            return Ok(None);
        };
        let seq: i64 = row.try_get("seq")?;
        let member_id_raw: String = row.try_get("member_id")?;
        let member_id = Uuid::parse_str(&member_id_raw)
            .map_err(|e| AppError::internal(format!("corrupt member id {member_id_raw}: {e}")))?;

        if !debit_tx(conn, member_id, 1).await? {
            // The reservation lapses rather than blocking the queue head.
            sqlx::query("DELETE FROM participations WHERE seq = ?1")
                .bind(seq)
                .execute(&mut *conn)
                .await?;
            tracing::info!(
                slot_id = %slot.id,
                member_id = %member_id,
                "waitlist member dropped at promotion: insufficient credits"
            );
            continue;
        }

        let flipped = sqlx::query(
            "UPDATE participations SET list_type = 'main'
             WHERE seq = ?1
               AND (SELECT COUNT(*) FROM participations
                    WHERE slot_id = ?2 AND list_type = 'main') < ?3",
        )
        .bind(seq)
        .bind(slot.id.to_string())
        .bind(slot.capacity_main)
        .execute(&mut *conn)
        .await?;

        if flipped.rows_affected() == 1 {
            return Ok(Some(Promotion {
                slot_id: slot.id,
                member_id,
            }));
        }

        // No seat after all; undo the debit and leave the waiter queued.
        refund_tx(conn, member_id, 1).await?;
        return Ok(None);
    }
}
