// ABOUTME: Environment-based server configuration loading and validation
// ABOUTME: Reads ports, database URL, facility timezone, and booking policy from env vars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Server configuration loaded from environment variables.
//!
//! Configuration is environment-only: every knob has a default suitable for
//! local development and can be overridden without a config file.

use crate::constants::{defaults, env_vars};
use anyhow::{anyhow, Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use std::env;

/// Booking-window and refund policy, in facility-local time
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// Facility UTC offset in whole hours
    pub utc_offset_hours: i32,
    /// Minimum minutes before class start at which booking is still open
    pub min_lead_minutes: i64,
    /// Maximum minutes before class start at which booking is already open
    pub max_lead_minutes: i64,
    /// Minutes before class start after which cancellation forfeits the credit
    pub refund_cutoff_minutes: i64,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            utc_offset_hours: defaults::FACILITY_UTC_OFFSET_HOURS,
            min_lead_minutes: defaults::BOOKING_MIN_LEAD_MINUTES,
            max_lead_minutes: defaults::BOOKING_MAX_LEAD_MINUTES,
            refund_cutoff_minutes: defaults::REFUND_CUTOFF_MINUTES,
        }
    }
}

impl BookingPolicy {
    /// The facility's fixed UTC offset
    #[must_use]
    pub fn utc_offset(&self) -> FixedOffset {
        // Validated to -12..=14 by from_env; fall back to UTC for values
        // constructed outside that path.
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// SQLite database URL
    pub database_url: String,
    /// Booking window and refund policy
    pub booking: BookingPolicy,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable fails to parse or is out of range.
    pub fn from_env() -> Result<Self> {
        let http_port = parse_env(env_vars::HTTP_PORT, defaults::HTTP_PORT)?;
        let database_url =
            env::var(env_vars::DATABASE_URL).unwrap_or_else(|_| defaults::DATABASE_URL.into());

        let utc_offset_hours = parse_env(
            env_vars::FACILITY_UTC_OFFSET_HOURS,
            defaults::FACILITY_UTC_OFFSET_HOURS,
        )?;
        if !(-12..=14).contains(&utc_offset_hours) {
            return Err(anyhow!(
                "{} must be between -12 and 14, got {utc_offset_hours}",
                env_vars::FACILITY_UTC_OFFSET_HOURS
            ));
        }

        let booking = BookingPolicy {
            utc_offset_hours,
            min_lead_minutes: parse_env(
                env_vars::BOOKING_MIN_LEAD_MINUTES,
                defaults::BOOKING_MIN_LEAD_MINUTES,
            )?,
            max_lead_minutes: parse_env(
                env_vars::BOOKING_MAX_LEAD_MINUTES,
                defaults::BOOKING_MAX_LEAD_MINUTES,
            )?,
            refund_cutoff_minutes: parse_env(
                env_vars::REFUND_CUTOFF_MINUTES,
                defaults::REFUND_CUTOFF_MINUTES,
            )?,
        };
        if booking.min_lead_minutes > booking.max_lead_minutes {
            return Err(anyhow!(
                "booking window is empty: min lead {} > max lead {}",
                booking.min_lead_minutes,
                booking.max_lead_minutes
            ));
        }

        Ok(Self {
            http_port,
            database_url,
            booking,
        })
    }

    /// One-line configuration summary for startup logging
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={} database={} facility_utc_offset={}h window={}..{}min refund_cutoff={}min",
            self.http_port,
            self.database_url,
            self.booking.utc_offset_hours,
            self.booking.min_lead_minutes,
            self.booking.max_lead_minutes,
            self.booking.refund_cutoff_minutes,
        )
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {name}: {raw}")),
        Err(_) => Ok(default),
    }
}
