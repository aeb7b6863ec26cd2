// ABOUTME: Member HTTP routes - self lookup, coach provisioning, and credit grants
// ABOUTME: Identity resolution happens upstream; these routes manage the local member row
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Member routes.

use crate::auth::authenticate;
use crate::database::ledger::CreditLedger;
use crate::database::members::MemberManager;
use crate::errors::AppError;
use crate::models::{Member, MemberRole};
use crate::server::ServerResources;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct CreateMemberRequest {
    display_name: String,
    #[serde(default)]
    role: MemberRole,
    #[serde(default)]
    starting_credits: i64,
}

#[derive(Debug, Deserialize)]
struct GrantCreditsRequest {
    amount: i64,
}

#[derive(Debug, Serialize)]
struct BalanceResponse {
    member_id: Uuid,
    credits: i64,
}

/// Member routes implementation
pub struct MemberRoutes;

impl MemberRoutes {
    /// Create all member routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/members/me", get(me_handler))
            .route("/api/members", post(create_member_handler))
            .route("/api/members/:member_id/credits", post(grant_credits_handler))
            .with_state(resources)
    }
}

/// GET /api/members/me
async fn me_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
) -> Result<Json<Member>, AppError> {
    let auth = authenticate(&headers, &resources.database).await?;
    Ok(Json(auth.member))
}

/// POST /api/members (coach only)
async fn create_member_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<CreateMemberRequest>,
) -> Result<Json<Member>, AppError> {
    let auth = authenticate(&headers, &resources.database).await?;
    auth.require_coach()?;

    let members = MemberManager::new(resources.database.pool().clone());
    let member = members
        .create(&request.display_name, request.role, request.starting_credits)
        .await?;
    tracing::info!(member_id = %member.id, role = ?member.role, "member provisioned");
    Ok(Json(member))
}

/// POST /api/members/:member_id/credits (coach only)
async fn grant_credits_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(member_id): Path<Uuid>,
    Json(request): Json<GrantCreditsRequest>,
) -> Result<Json<BalanceResponse>, AppError> {
    let auth = authenticate(&headers, &resources.database).await?;
    auth.require_coach()?;

    let ledger = CreditLedger::new(resources.database.pool().clone());
    // refund() rejects non-positive amounts and unknown members.
    let credits = ledger.refund(member_id, request.amount).await?;
    tracing::info!(%member_id, amount = request.amount, "credits granted");
    Ok(Json(BalanceResponse { member_id, credits }))
}
