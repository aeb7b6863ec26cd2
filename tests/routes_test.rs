// ABOUTME: HTTP surface integration tests driven through the assembled router
// ABOUTME: Covers identity handling, coach gating, error bodies, and the booking flow
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use boxbook::config::environment::{BookingPolicy, ServerConfig};
use boxbook::database::Database;
use boxbook::server::{HttpServer, ServerResources};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

async fn app() -> (Router, Database) {
    let db = common::test_db().await;
    let config = ServerConfig {
        http_port: 0,
        database_url: "sqlite::memory:".into(),
        booking: BookingPolicy::default(),
    };
    let resources = Arc::new(ServerResources::new(db.clone(), config));
    (HttpServer::router(resources), db)
}

fn get(uri: &str, member: Option<Uuid>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(id) = member {
        builder = builder.header("x-member-id", id.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, member: Option<Uuid>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(id) = member {
        builder = builder.header("x-member-id", id.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn test_health_and_ready() {
    let (router, _db) = app().await;

    let response = router.clone().oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "boxbook-server");

    let response = router.oneshot(get("/ready", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_identity_header() {
    let (router, _db) = app().await;

    let response = router
        .oneshot(get("/api/slots?date=2025-06-02", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(error_code(&body), "AUTH_REQUIRED");
    assert_eq!(body["error"]["transient"], false);
}

#[tokio::test]
async fn test_malformed_and_unknown_identity() {
    let (router, _db) = app().await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/members/me")
        .header("x-member-id", "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body_json(response).await), "AUTH_INVALID");

    let response = router
        .oneshot(get("/api/members/me", Some(Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body_json(response).await), "AUTH_INVALID");
}

#[tokio::test]
async fn test_coach_routes_reject_members() {
    let (router, db) = app().await;
    let member = common::create_member(&db, "Ann", "member", 5).await;

    let response = router
        .clone()
        .oneshot(get("/api/templates", Some(member)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body_json(response).await), "PERMISSION_DENIED");

    let response = router
        .oneshot(post_json(
            "/api/attendance/toggle",
            Some(member),
            &json!({"slot_id": Uuid::new_v4(), "member_id": member, "attended": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_date_query() {
    let (router, db) = app().await;
    let member = common::create_member(&db, "Ben", "member", 5).await;

    let response = router
        .oneshot(get("/api/slots?date=garbage", Some(member)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body_json(response).await), "INVALID_INPUT");
}

#[tokio::test]
async fn test_members_me_reports_balance() {
    let (router, db) = app().await;
    let member = common::create_member(&db, "Cal", "member", 7).await;

    let response = router
        .oneshot(get("/api/members/me", Some(member)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], member.to_string());
    assert_eq!(body["credits"], 7);
    assert_eq!(body["role"], "member");
}

#[tokio::test]
async fn test_booking_flow_through_the_api() {
    let (router, db) = app().await;
    let member = common::create_member(&db, "Dee", "member", 5).await;
    let slot = common::slot_starting_in(&db, 180, 10, 5).await;

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/bookings",
            Some(member),
            &json!({"slot_id": slot}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "booked");

    // Rebooking the same slot conflicts.
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/bookings",
            Some(member),
            &json!({"slot_id": slot}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(&body_json(response).await), "ALREADY_BOOKED");

    assert_eq!(common::credits(&db, member).await, 4);

    let response = router
        .oneshot(post_json(
            &format!("/api/bookings/{slot}/cancel"),
            Some(member),
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["refunded"], true);
    assert_eq!(common::credits(&db, member).await, 5);
}

#[tokio::test]
async fn test_insufficient_credits_is_payment_required() {
    let (router, db) = app().await;
    let member = common::create_member(&db, "Eli", "member", 0).await;
    let slot = common::slot_starting_in(&db, 180, 10, 5).await;

    let response = router
        .oneshot(post_json(
            "/api/bookings",
            Some(member),
            &json!({"slot_id": slot}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(error_code(&body_json(response).await), "INSUFFICIENT_CREDITS");
}

#[tokio::test]
async fn test_coach_provisions_member_and_grants_credits() {
    let (router, db) = app().await;
    let coach = common::create_member(&db, "Coach Fay", "coach", 0).await;

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/members",
            Some(coach),
            &json!({"display_name": "New Athlete", "starting_credits": 2}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["display_name"], "New Athlete");
    let new_member: Uuid = body["id"].as_str().unwrap().parse().unwrap();

    let response = router
        .oneshot(post_json(
            &format!("/api/members/{new_member}/credits"),
            Some(coach),
            &json!({"amount": 8}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["credits"], 10);
}

#[tokio::test]
async fn test_coach_templates_and_flush() {
    let (router, db) = app().await;
    let coach = common::create_member(&db, "Coach Gil", "coach", 0).await;

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/templates",
            Some(coach),
            &json!({
                "day_of_week": 1,
                "start_time": "07:00",
                "title": "Morning WOD",
                "capacity_main": 12,
                "capacity_wait": 4
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(get("/api/templates", Some(coach)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let slot = common::slot_starting_in(&db, 24 * 60, 10, 5).await;
    let booked = common::create_member(&db, "Hal", "member", 4).await;
    let date = common::slot_date_of(&db, slot).await;
    common::insert_participation(&db, slot, booked, &date, "main").await;

    let response = router
        .oneshot(post_json(
            "/api/templates/flush",
            Some(coach),
            &json!({"scope": "all_future"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["flushed_slots"], 1);
    assert_eq!(body["refunded_credits"], 1);
    assert_eq!(common::credits(&db, booked).await, 5);
}

#[tokio::test]
async fn test_coach_roster_view() {
    let (router, db) = app().await;
    let coach = common::create_member(&db, "Coach Ivy", "coach", 0).await;
    let member = common::create_member(&db, "Jan", "member", 5).await;
    let slot = common::slot_starting_in(&db, 180, 10, 5).await;
    let date = common::slot_date_of(&db, slot).await;
    common::insert_participation(&db, slot, member, &date, "main").await;

    let response = router
        .oneshot(get(&format!("/api/slots/{slot}/roster"), Some(coach)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["member_id"], member.to_string());
    assert_eq!(entries[0]["attended"], false);
}
