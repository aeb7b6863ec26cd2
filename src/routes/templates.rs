// ABOUTME: Coach template administration HTTP routes - list, upsert, and bulk flush
// ABOUTME: Flush scope is decoded from the request body into the manager's FlushScope
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Template routes.

use crate::auth::authenticate;
use crate::database::templates::{
    FlushScope, FlushSummary, TemplateManager, UpsertTemplateRequest,
};
use crate::errors::AppError;
use crate::models::{parse_date, parse_time, WeeklyTemplate};
use crate::server::ServerResources;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct UpsertBody {
    day_of_week: u8,
    /// "HH:MM" in facility-local time
    start_time: String,
    title: String,
    capacity_main: i64,
    capacity_wait: i64,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ScopeKind {
    AllFuture,
    Weekday,
    Dates,
}

#[derive(Debug, Deserialize)]
struct FlushBody {
    scope: ScopeKind,
    weekday: Option<u8>,
    dates: Option<Vec<String>>,
}

/// Template routes implementation
pub struct TemplateRoutes;

impl TemplateRoutes {
    /// Create all template routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/templates",
                get(list_templates_handler).post(upsert_template_handler),
            )
            .route("/api/templates/flush", post(flush_handler))
            .with_state(resources)
    }
}

fn manager(resources: &ServerResources) -> TemplateManager {
    TemplateManager::new(
        resources.database.pool().clone(),
        resources.config.booking.clone(),
    )
}

/// GET /api/templates (coach only)
async fn list_templates_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
) -> Result<Json<Vec<WeeklyTemplate>>, AppError> {
    let auth = authenticate(&headers, &resources.database).await?;
    auth.require_coach()?;

    let templates = manager(&resources).list().await?;
    Ok(Json(templates))
}

/// POST /api/templates (coach only)
async fn upsert_template_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(body): Json<UpsertBody>,
) -> Result<Json<WeeklyTemplate>, AppError> {
    let auth = authenticate(&headers, &resources.database).await?;
    auth.require_coach()?;

    let request = UpsertTemplateRequest {
        day_of_week: body.day_of_week,
        start_time: parse_time(&body.start_time)?,
        title: body.title,
        capacity_main: body.capacity_main,
        capacity_wait: body.capacity_wait,
        enabled: body.enabled,
    };
    let template = manager(&resources).upsert(&request).await?;
    tracing::info!(
        day_of_week = template.day_of_week,
        start_time = %body.start_time,
        "template upserted"
    );
    Ok(Json(template))
}

/// POST /api/templates/flush (coach only)
async fn flush_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(body): Json<FlushBody>,
) -> Result<Json<FlushSummary>, AppError> {
    let auth = authenticate(&headers, &resources.database).await?;
    auth.require_coach()?;

    let scope = match body.scope {
        ScopeKind::AllFuture => FlushScope::AllFuture,
        ScopeKind::Weekday => {
            let weekday = body
                .weekday
                .ok_or_else(|| AppError::invalid_input("weekday scope requires a weekday"))?;
            FlushScope::AllFutureByWeekday(weekday)
        }
        ScopeKind::Dates => {
            let raw = body
                .dates
                .ok_or_else(|| AppError::invalid_input("dates scope requires a date list"))?;
            let dates = raw
                .iter()
                .map(|s| parse_date(s))
                .collect::<Result<Vec<_>, _>>()?;
            FlushScope::ExplicitDates(dates)
        }
    };

    let summary = manager(&resources).flush(&scope).await?;
    resources.notifier.slots_flushed(summary).await;
    Ok(Json(summary))
}
