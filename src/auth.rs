// ABOUTME: Trusted-identity extraction and role gating for route handlers
// ABOUTME: The upstream identity service resolves the caller; the core only loads role and credits
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Caller identity.
//!
//! Identity and session verification live in an external collaborator that
//! fronts this service; it injects the resolved member id as the
//! `x-member-id` header. The core trusts that header, loads the member row,
//! and performs its own authorization only for role-gated operations.

use crate::constants::headers;
use crate::database::members::MemberManager;
use crate::database::Database;
use crate::errors::AppError;
use crate::models::{Member, MemberRole};
use axum::http::HeaderMap;
use uuid::Uuid;

/// The resolved caller for the current request
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The member row backing the caller
    pub member: Member,
}

impl AuthContext {
    /// Caller's member id
    #[must_use]
    pub const fn member_id(&self) -> Uuid {
        self.member.id
    }

    /// Whether the caller holds the coach role
    #[must_use]
    pub fn is_coach(&self) -> bool {
        self.member.role == MemberRole::Coach
    }

    /// Reject non-coach callers before any core logic runs
    pub fn require_coach(&self) -> Result<(), AppError> {
        if self.is_coach() {
            Ok(())
        } else {
            Err(AppError::forbidden("coach role required"))
        }
    }
}

/// Resolve the caller from request headers.
///
/// Missing or malformed identity is `AuthRequired`/`AuthInvalid`; an id
/// that resolves to no member row is `AuthInvalid` as well, since the
/// identity service and this store have drifted.
pub async fn authenticate(
    headers: &HeaderMap,
    database: &Database,
) -> Result<AuthContext, AppError> {
    let raw = headers
        .get(headers::MEMBER_ID)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(AppError::auth_required)?;

    let member_id = Uuid::parse_str(raw)
        .map_err(|_| AppError::auth_invalid(format!("malformed member id: {raw}")))?;

    let member = MemberManager::new(database.pool().clone())
        .get(member_id)
        .await?
        .ok_or_else(|| AppError::auth_invalid(format!("unknown member: {member_id}")))?;

    Ok(AuthContext { member })
}
