// ABOUTME: Library root for the boxbook class booking and attendance service
// ABOUTME: Exposes the database managers, HTTP routes, and server assembly
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! # Boxbook
//!
//! Class scheduling and attendance core for a fitness facility. Members
//! book finite-capacity class slots against a prepaid credit balance, with
//! a bounded waitlist, FIFO promotion on vacancy, time-gated refunds on
//! cancellation, coach attendance tracking, and bulk flush of future slots
//! after template edits.
//!
//! Slots are materialized lazily from a weekly template on first access.
//! All balance mutations go through the credit ledger, and every
//! check-then-act sequence is either a single guarded SQL statement or a
//! transaction that opens with a write, so concurrent bookings for the
//! last seat serialize without application-level locks.

/// Caller identity extraction and role gating
pub mod auth;
/// Environment-based configuration
pub mod config;
/// Service-wide constants and defaults
pub mod constants;
/// SQLite storage managers
pub mod database;
/// Unified error handling
pub mod errors;
/// Structured logging setup
pub mod logging;
/// Domain models
pub mod models;
/// Booking lifecycle notification hooks
pub mod notifications;
/// HTTP routes
pub mod routes;
/// Server resources and HTTP assembly
pub mod server;
