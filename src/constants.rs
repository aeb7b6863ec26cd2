// ABOUTME: Application constants and default configuration values
// ABOUTME: Central place for env var names, header names, and booking policy defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Application constants

/// Service identity
pub mod service {
    /// Service name used in logs and health responses
    pub const NAME: &str = "boxbook-server";
}

/// Environment variable names consumed by `ServerConfig::from_env`
pub mod env_vars {
    /// HTTP listen port
    pub const HTTP_PORT: &str = "HTTP_PORT";
    /// SQLite database URL
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Facility UTC offset in whole hours (e.g. `4` for UTC+4)
    pub const FACILITY_UTC_OFFSET_HOURS: &str = "FACILITY_UTC_OFFSET_HOURS";
    /// Minimum lead time before class start for bookings, minutes
    pub const BOOKING_MIN_LEAD_MINUTES: &str = "BOOKING_MIN_LEAD_MINUTES";
    /// Maximum lead time before class start for bookings, minutes
    pub const BOOKING_MAX_LEAD_MINUTES: &str = "BOOKING_MAX_LEAD_MINUTES";
    /// Cancellation refund cutoff before class start, minutes
    pub const REFUND_CUTOFF_MINUTES: &str = "REFUND_CUTOFF_MINUTES";
    /// Log output format (json, pretty, compact)
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
    /// Log filter, standard tracing syntax
    pub const RUST_LOG: &str = "RUST_LOG";
}

/// Default configuration values
pub mod defaults {
    /// Default HTTP listen port
    pub const HTTP_PORT: u16 = 8081;
    /// Default SQLite database URL
    pub const DATABASE_URL: &str = "sqlite:data/boxbook.db";
    /// Default facility UTC offset in hours
    pub const FACILITY_UTC_OFFSET_HOURS: i32 = 0;
    /// Bookings open no later than one hour before class start
    pub const BOOKING_MIN_LEAD_MINUTES: i64 = 60;
    /// Bookings open no earlier than 23 hours before class start
    pub const BOOKING_MAX_LEAD_MINUTES: i64 = 23 * 60;
    /// Cancellations refund the credit only two or more hours out
    pub const REFUND_CUTOFF_MINUTES: i64 = 120;
}

/// HTTP header names
pub mod headers {
    /// Resolved member identity injected by the upstream identity service
    pub const MEMBER_ID: &str = "x-member-id";
}

/// Database limits
pub mod limits {
    /// Connection pool size for the SQLite pool
    pub const DB_MAX_CONNECTIONS: u32 = 5;
    /// How long a writer waits for the SQLite write lock before failing
    pub const DB_BUSY_TIMEOUT_SECS: u64 = 5;
}
