// ABOUTME: Day schedule and roster HTTP routes
// ABOUTME: Schedule reads materialize slots lazily; roster reads are coach-gated
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Slot routes.

use crate::auth::authenticate;
use crate::database::attendance::{AttendanceManager, RosterEntry};
use crate::database::slots::SlotDirectory;
use crate::errors::AppError;
use crate::models::{parse_date, SlotWithCounts};
use crate::server::ServerResources;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct ScheduleQuery {
    date: String,
}

#[derive(Debug, Serialize)]
struct ScheduleResponse {
    date: String,
    slots: Vec<SlotWithCounts>,
}

#[derive(Debug, Serialize)]
struct RosterResponse {
    slot_id: Uuid,
    entries: Vec<RosterEntry>,
}

/// Slot routes implementation
pub struct SlotRoutes;

impl SlotRoutes {
    /// Create all slot routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/slots", get(day_schedule_handler))
            .route("/api/slots/:slot_id/roster", get(roster_handler))
            .with_state(resources)
    }
}

/// GET /api/slots?date=YYYY-MM-DD
async fn day_schedule_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<ScheduleResponse>, AppError> {
    authenticate(&headers, &resources.database).await?;
    let date = parse_date(&query.date)?;

    let directory = SlotDirectory::new(resources.database.pool().clone());
    let slots = directory.day_schedule(date).await?;
    Ok(Json(ScheduleResponse {
        date: query.date,
        slots,
    }))
}

/// GET /api/slots/:slot_id/roster (coach only)
async fn roster_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<RosterResponse>, AppError> {
    let auth = authenticate(&headers, &resources.database).await?;
    auth.require_coach()?;

    let directory = SlotDirectory::new(resources.database.pool().clone());
    directory.get_required(slot_id).await?;

    let attendance = AttendanceManager::new(resources.database.pool().clone());
    let entries = attendance.roster(slot_id).await?;
    Ok(Json(RosterResponse { slot_id, entries }))
}
