// ABOUTME: Notification hooks invoked on booking lifecycle events
// ABOUTME: Delivery (email/push) is an external collaborator; the default sink only logs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Notification hooks.
//!
//! The core never delivers notifications itself. It exposes this seam so a
//! delivery collaborator can observe bookings, promotions, and flushes; the
//! default implementation records the events in the structured log.

use crate::database::bookings::{BookingOutcome, Promotion};
use crate::database::templates::FlushSummary;
use async_trait::async_trait;
use uuid::Uuid;

/// Observer for booking lifecycle events
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A member secured a seat or a waitlist spot
    async fn booking_confirmed(&self, slot_id: Uuid, member_id: Uuid, outcome: BookingOutcome);

    /// A waitlist member was moved onto the main roster
    async fn member_promoted(&self, promotion: Promotion);

    /// A coach flushed future slots
    async fn slots_flushed(&self, summary: FlushSummary);
}

/// Default notifier that writes events to the structured log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_confirmed(&self, slot_id: Uuid, member_id: Uuid, outcome: BookingOutcome) {
        tracing::info!(%slot_id, %member_id, ?outcome, "booking confirmed");
    }

    async fn member_promoted(&self, promotion: Promotion) {
        tracing::info!(
            slot_id = %promotion.slot_id,
            member_id = %promotion.member_id,
            "promotion notification"
        );
    }

    async fn slots_flushed(&self, summary: FlushSummary) {
        tracing::info!(
            flushed_slots = summary.flushed_slots,
            refunded_credits = summary.refunded_credits,
            removed_participations = summary.removed_participations,
            "template flush completed"
        );
    }
}
