// ABOUTME: Slot directory integration tests - lazy materialization from weekly templates
// ABOUTME: Covers idempotent materialization and the coach-edits-win rule
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

mod common;

use boxbook::config::environment::BookingPolicy;
use boxbook::database::slots::SlotDirectory;
use boxbook::database::templates::{TemplateManager, UpsertTemplateRequest};
use boxbook::models::parse_date;
use chrono::NaiveTime;

fn template(day_of_week: u8, hour: u32, title: &str, enabled: bool) -> UpsertTemplateRequest {
    UpsertTemplateRequest {
        day_of_week,
        start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
        title: title.into(),
        capacity_main: 12,
        capacity_wait: 4,
        enabled,
    }
}

// 2025-06-02 is a Monday, weekday 1 in the 0=Sunday convention.
const MONDAY: &str = "2025-06-02";

#[tokio::test]
async fn test_day_schedule_materializes_from_template() {
    let db = common::test_db().await;
    let templates = TemplateManager::new(db.pool().clone(), BookingPolicy::default());
    templates.upsert(&template(1, 7, "Morning WOD", true)).await.unwrap();
    templates.upsert(&template(1, 18, "Evening WOD", true)).await.unwrap();

    let directory = SlotDirectory::new(db.pool().clone());
    let schedule = directory.day_schedule(parse_date(MONDAY).unwrap()).await.unwrap();

    assert_eq!(schedule.len(), 2);
    assert_eq!(schedule[0].slot.title, "Morning WOD");
    assert_eq!(schedule[1].slot.title, "Evening WOD");
    assert_eq!(schedule[0].main_count, 0);
    assert_eq!(schedule[0].wait_count, 0);
}

#[tokio::test]
async fn test_materialization_is_idempotent() {
    let db = common::test_db().await;
    let templates = TemplateManager::new(db.pool().clone(), BookingPolicy::default());
    templates.upsert(&template(1, 7, "WOD", true)).await.unwrap();

    let directory = SlotDirectory::new(db.pool().clone());
    let date = parse_date(MONDAY).unwrap();
    let first = directory.day_schedule(date).await.unwrap();
    let second = directory.day_schedule(date).await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first[0].slot.id, second[0].slot.id);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_first_access_materializes_once() {
    let (db, _dir) = common::file_db().await;
    let templates = TemplateManager::new(db.pool().clone(), BookingPolicy::default());
    templates.upsert(&template(1, 7, "WOD", true)).await.unwrap();
    templates.upsert(&template(1, 18, "WOD", true)).await.unwrap();

    let date = parse_date(MONDAY).unwrap();
    let d1 = SlotDirectory::new(db.pool().clone());
    let d2 = SlotDirectory::new(db.pool().clone());
    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { d1.day_schedule(date).await }),
        tokio::spawn(async move { d2.day_schedule(date).await }),
    );
    let first = r1.unwrap().unwrap();
    let second = r2.unwrap().unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    // Both readers see the same concrete rows, not duplicates.
    assert_eq!(first[0].slot.id, second[0].slot.id);
    assert_eq!(first[1].slot.id, second[1].slot.id);
}

#[tokio::test]
async fn test_disabled_templates_are_skipped() {
    let db = common::test_db().await;
    let templates = TemplateManager::new(db.pool().clone(), BookingPolicy::default());
    templates.upsert(&template(1, 7, "Active", true)).await.unwrap();
    templates.upsert(&template(1, 18, "Paused", false)).await.unwrap();

    let directory = SlotDirectory::new(db.pool().clone());
    let schedule = directory.day_schedule(parse_date(MONDAY).unwrap()).await.unwrap();

    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].slot.title, "Active");
}

#[tokio::test]
async fn test_no_templates_for_weekday_yields_empty_schedule() {
    let db = common::test_db().await;
    let templates = TemplateManager::new(db.pool().clone(), BookingPolicy::default());
    templates.upsert(&template(2, 7, "Tuesday only", true)).await.unwrap();

    let directory = SlotDirectory::new(db.pool().clone());
    let schedule = directory.day_schedule(parse_date(MONDAY).unwrap()).await.unwrap();

    assert!(schedule.is_empty());
}

#[tokio::test]
async fn test_template_is_not_reapplied_over_existing_slots() {
    let db = common::test_db().await;
    let templates = TemplateManager::new(db.pool().clone(), BookingPolicy::default());
    templates.upsert(&template(1, 7, "Original", true)).await.unwrap();

    let directory = SlotDirectory::new(db.pool().clone());
    let date = parse_date(MONDAY).unwrap();
    let schedule = directory.day_schedule(date).await.unwrap();
    let slot_id = schedule[0].slot.id;

    // A coach edit to the concrete slot wins over the template.
    sqlx::query("UPDATE slots SET title = 'Edited', capacity_main = 20 WHERE id = ?1")
        .bind(slot_id.to_string())
        .execute(db.pool())
        .await
        .unwrap();
    templates.upsert(&template(1, 7, "Re-edited template", true)).await.unwrap();

    let schedule = directory.day_schedule(date).await.unwrap();
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].slot.title, "Edited");
    assert_eq!(schedule[0].slot.capacity_main, 20);
}

#[tokio::test]
async fn test_get_required_unknown_slot() {
    let db = common::test_db().await;
    let directory = SlotDirectory::new(db.pool().clone());

    let err = directory.get_required(uuid::Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.code, boxbook::errors::ErrorCode::ResourceNotFound);
}
