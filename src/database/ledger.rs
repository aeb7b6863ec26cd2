// ABOUTME: Credit ledger operations - atomic debits and refunds on member balances
// ABOUTME: Every mutation is a single conditional UPDATE so balances can never go negative
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Credit ledger.
//!
//! Balances are mutated only here. Each operation is one conditional
//! single-row UPDATE; the `credits >= n` guard is evaluated inside the
//! statement under SQLite's write lock, so two concurrent debits can never
//! both succeed against one remaining credit.

use crate::errors::{AppError, AppResult};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Manager for member credit balances
#[derive(Clone)]
pub struct CreditLedger {
    pool: SqlitePool,
}

impl CreditLedger {
    /// Create a new ledger backed by the given pool
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Debit `n` credits, failing closed with `InsufficientCredits`
    pub async fn debit(&self, member_id: Uuid, n: i64) -> AppResult<()> {
        if n <= 0 {
            return Err(AppError::invalid_input("debit amount must be positive"));
        }
        let mut conn = self.pool.acquire().await?;
        let debited = debit_tx(&mut conn, member_id, n).await?;
        drop(conn);
        if debited {
            Ok(())
        } else {
            // Distinguish an unknown member from an underfunded one.
            self.balance(member_id).await?;
            Err(AppError::insufficient_credits())
        }
    }

    /// Refund `n` credits unconditionally and return the new balance
    pub async fn refund(&self, member_id: Uuid, n: i64) -> AppResult<i64> {
        if n <= 0 {
            return Err(AppError::invalid_input("refund amount must be positive"));
        }
        let mut conn = self.pool.acquire().await?;
        refund_tx(&mut conn, member_id, n).await?;
        drop(conn);
        self.balance(member_id).await
    }

    /// Current balance, failing with `NotFound` for unknown members
    pub async fn balance(&self, member_id: Uuid) -> AppResult<i64> {
        let row = sqlx::query("SELECT credits FROM members WHERE id = ?1")
            .bind(member_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found(format!("member {member_id}")))?;
        Ok(row.try_get("credits")?)
    }
}

/// Conditional debit inside a caller-managed connection or transaction.
///
/// Returns `false` when the member is missing or the balance is below `n`;
/// the balance is never driven negative.
pub(crate) async fn debit_tx(
    conn: &mut SqliteConnection,
    member_id: Uuid,
    n: i64,
) -> AppResult<bool> {
    let result = sqlx::query("UPDATE members SET credits = credits - ?1 WHERE id = ?2 AND credits >= ?1")
        .bind(n)
        .bind(member_id.to_string())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Best-effort debit clamped at zero, for the attendance workflow.
///
/// Never fails on an empty balance; a coach marking attendance must not be
/// blocked by a member who ran out of credits.
pub(crate) async fn debit_clamped_tx(
    conn: &mut SqliteConnection,
    member_id: Uuid,
) -> AppResult<()> {
    sqlx::query("UPDATE members SET credits = MAX(credits - 1, 0) WHERE id = ?1")
        .bind(member_id.to_string())
        .execute(conn)
        .await?;
    Ok(())
}

/// Unconditional refund inside a caller-managed connection or transaction
pub(crate) async fn refund_tx(
    conn: &mut SqliteConnection,
    member_id: Uuid,
    n: i64,
) -> AppResult<()> {
    sqlx::query("UPDATE members SET credits = credits + ?1 WHERE id = ?2")
        .bind(n)
        .bind(member_id.to_string())
        .execute(conn)
        .await?;
    Ok(())
}
