// ABOUTME: Booking HTTP routes - book a slot, cancel, and surface promotion results
// ABOUTME: Thin adapters over BookingManager; lifecycle events go to the notifier
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Booking routes.

use crate::auth::authenticate;
use crate::database::bookings::{BookingManager, BookingOutcome};
use crate::errors::AppError;
use crate::server::ServerResources;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct BookRequest {
    slot_id: Uuid,
    #[serde(default)]
    join_waitlist: bool,
}

#[derive(Debug, Serialize)]
struct BookResponse {
    slot_id: Uuid,
    /// "booked" for a main seat, "waitlisted" for a queue spot
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct CancelResponse {
    slot_id: Uuid,
    refunded: bool,
    promoted_member_id: Option<Uuid>,
}

/// Booking routes implementation
pub struct BookingRoutes;

impl BookingRoutes {
    /// Create all booking routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/bookings", post(book_handler))
            .route("/api/bookings/:slot_id/cancel", post(cancel_handler))
            .with_state(resources)
    }
}

/// POST /api/bookings
async fn book_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(request): Json<BookRequest>,
) -> Result<Json<BookResponse>, AppError> {
    let auth = authenticate(&headers, &resources.database).await?;

    let manager = BookingManager::new(
        resources.database.pool().clone(),
        resources.config.booking.clone(),
    );
    let outcome = manager
        .book(auth.member_id(), request.slot_id, request.join_waitlist)
        .await?;

    resources
        .notifier
        .booking_confirmed(request.slot_id, auth.member_id(), outcome)
        .await;

    let status = match outcome {
        BookingOutcome::Main => "booked",
        BookingOutcome::Wait => "waitlisted",
    };
    Ok(Json(BookResponse {
        slot_id: request.slot_id,
        status,
    }))
}

/// POST /api/bookings/:slot_id/cancel
async fn cancel_handler(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let auth = authenticate(&headers, &resources.database).await?;

    let manager = BookingManager::new(
        resources.database.pool().clone(),
        resources.config.booking.clone(),
    );
    let outcome = manager.cancel(auth.member_id(), slot_id).await?;

    if let Some(promotion) = outcome.promoted {
        resources.notifier.member_promoted(promotion).await;
    }

    Ok(Json(CancelResponse {
        slot_id,
        refunded: outcome.refunded,
        promoted_member_id: outcome.promoted.map(|p| p.member_id),
    }))
}
