// ABOUTME: Member storage operations for the booking core
// ABOUTME: Provisioning and lookup of members with role and credit balance
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

use crate::errors::{AppError, AppResult};
use crate::models::{parse_timestamp, Member, MemberRole};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Manager for member rows
#[derive(Clone)]
pub struct MemberManager {
    pool: SqlitePool,
}

impl MemberManager {
    /// Create a new manager backed by the given pool
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Provision a member with a starting credit balance
    ///
    /// Identity itself lives in the external identity service; this row
    /// carries only what the booking core owns: role and credits.
    pub async fn create(
        &self,
        display_name: &str,
        role: MemberRole,
        starting_credits: i64,
    ) -> AppResult<Member> {
        if display_name.trim().is_empty() {
            return Err(AppError::invalid_input("display_name must not be empty"));
        }
        if starting_credits < 0 {
            return Err(AppError::invalid_input("starting credits must be >= 0"));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO members (id, display_name, role, credits, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(id.to_string())
        .bind(display_name)
        .bind(role.as_str())
        .bind(starting_credits)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Member {
            id,
            display_name: display_name.to_owned(),
            role,
            credits: starting_credits,
            created_at: now,
        })
    }

    /// Look up a member by id
    pub async fn get(&self, member_id: Uuid) -> AppResult<Option<Member>> {
        let row = sqlx::query(
            "SELECT id, display_name, role, credits, created_at FROM members WHERE id = ?1",
        )
        .bind(member_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| member_from_row(&r)).transpose()
    }

    /// Look up a member by id, failing with `NotFound` if absent
    pub async fn get_required(&self, member_id: Uuid) -> AppResult<Member> {
        self.get(member_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("member {member_id}")))
    }
}

/// Map a members row into the domain type
pub(crate) fn member_from_row(row: &SqliteRow) -> AppResult<Member> {
    let id: String = row.try_get("id")?;
    let role: String = row.try_get("role")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Member {
        id: Uuid::parse_str(&id)
            .map_err(|e| AppError::internal(format!("corrupt member id {id}: {e}")))?,
        display_name: row.try_get("display_name")?,
        role: MemberRole::parse(&role),
        credits: row.try_get("credits")?,
        created_at: parse_timestamp(&created_at)?,
    })
}
