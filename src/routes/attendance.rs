// ABOUTME: Coach attendance HTTP routes - walk-in seating and presence toggles
// ABOUTME: Both endpoints require the coach role before any core logic runs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Attendance routes.

use crate::auth::authenticate;
use crate::database::attendance::AttendanceManager;
use crate::errors::AppError;
use crate::models::AttendanceRecord;
use crate::server::ServerResources;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct WalkInRequest {
    slot_id: Uuid,
    member_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ToggleRequest {
    slot_id: Uuid,
    member_id: Uuid,
    attended: bool,
}

/// Attendance routes implementation
pub struct AttendanceRoutes;

impl AttendanceRoutes {
    /// Create all attendance routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/attendance/add", post(walk_in_handler))
            .route("/api/attendance/toggle", post(toggle_handler))
            .with_state(resources)
    }
}

/// POST /api/attendance/add (coach only)
async fn walk_in_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<WalkInRequest>,
) -> Result<Json<AttendanceRecord>, AppError> {
    let auth = authenticate(&headers, &resources.database).await?;
    auth.require_coach()?;

    let manager = AttendanceManager::new(resources.database.pool().clone());
    let record = manager
        .mark_walk_in(request.slot_id, request.member_id)
        .await?;
    tracing::info!(
        slot_id = %request.slot_id,
        member_id = %request.member_id,
        "walk-in seated and marked present"
    );
    Ok(Json(record))
}

/// POST /api/attendance/toggle (coach only)
async fn toggle_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<AttendanceRecord>, AppError> {
    let auth = authenticate(&headers, &resources.database).await?;
    auth.require_coach()?;

    let manager = AttendanceManager::new(resources.database.pool().clone());
    let record = manager
        .toggle(request.slot_id, request.member_id, request.attended)
        .await?;
    Ok(Json(record))
}
