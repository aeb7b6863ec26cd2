// ABOUTME: HTTP route modules for the booking service REST surface
// ABOUTME: Each concern gets its own router merged in server.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! HTTP routes

/// Coach-only attendance endpoints
pub mod attendance;
/// Booking and cancellation endpoints
pub mod bookings;
/// Health and readiness endpoints
pub mod health;
/// Member provisioning and balance endpoints
pub mod members;
/// Day schedule and roster endpoints
pub mod slots;
/// Template administration and flush endpoints
pub mod templates;
