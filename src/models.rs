// ABOUTME: Core domain models for members, slots, participations, and attendance
// ABOUTME: Shared data structures used by the database managers and HTTP routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Boxbook

//! Domain models for the booking core.
//!
//! All persisted timestamps are RFC 3339 UTC strings; slot dates and times
//! are stored as `YYYY-MM-DD` / `HH:MM` text so that SQLite string ordering
//! matches chronological ordering.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a facility member, resolved by the external identity service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Regular athlete who books classes against a credit balance
    #[default]
    Member,
    /// Coach with access to attendance, walk-ins, and template management
    Coach,
}

impl MemberRole {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Coach => "coach",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "coach" => Self::Coach,
            _ => Self::Member,
        }
    }
}

/// A facility member with a prepaid credit balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Unique member identifier
    pub id: Uuid,
    /// Display name
    pub display_name: String,
    /// Role for permission checks
    pub role: MemberRole,
    /// Prepaid credit balance; never negative
    pub credits: i64,
    /// When the member row was created
    pub created_at: DateTime<Utc>,
}

/// Which roster list a participation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    /// Confirmed, capacity-limited attendee roster
    Main,
    /// Secondary capacity-limited queue, promoted on vacancy
    Wait,
}

impl ListType {
    /// Convert to database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Wait => "wait",
        }
    }

    /// Parse from database string representation
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "main" => Self::Main,
            _ => Self::Wait,
        }
    }
}

/// A single bookable class instance at a specific date and time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    /// Unique slot identifier
    pub id: Uuid,
    /// Calendar date of the class
    pub slot_date: NaiveDate,
    /// Local start time of the class
    pub start_time: NaiveTime,
    /// Class title shown to members
    pub title: String,
    /// Main-list capacity
    pub capacity_main: i64,
    /// Waitlist capacity
    pub capacity_wait: i64,
    /// When the slot row was created
    pub created_at: DateTime<Utc>,
}

impl Slot {
    /// Class start instant in the facility's local timezone
    ///
    /// Slots store naive local date/time; the facility offset pins them to
    /// an instant. A fixed offset cannot be ambiguous, so `single()` always
    /// yields a value here.
    #[must_use]
    pub fn starts_at(&self, facility_offset: FixedOffset) -> DateTime<FixedOffset> {
        let naive = self.slot_date.and_time(self.start_time);
        facility_offset
            .from_local_datetime(&naive)
            .single()
            .unwrap_or_else(|| facility_offset.from_utc_datetime(&naive))
    }

    /// Whole minutes from `now` until the class starts (negative once started)
    #[must_use]
    pub fn minutes_until_start(&self, facility_offset: FixedOffset, now: DateTime<Utc>) -> i64 {
        (self.starts_at(facility_offset) - now.with_timezone(&facility_offset)).num_minutes()
    }
}

/// A slot together with its live roster counts
#[derive(Debug, Clone, Serialize)]
pub struct SlotWithCounts {
    /// The slot itself
    #[serde(flatten)]
    pub slot: Slot,
    /// Current main-list occupancy
    pub main_count: i64,
    /// Current waitlist occupancy
    pub wait_count: i64,
}

/// A member's seat (or queue position) on a slot
///
/// `seq` is an AUTOINCREMENT sequence: waitlist FIFO order is insertion
/// order by construction, never arbitrary storage order.
#[derive(Debug, Clone, Serialize)]
pub struct Participation {
    /// Monotonic insertion sequence, also the primary key
    pub seq: i64,
    /// Slot being attended
    pub slot_id: Uuid,
    /// Member holding the seat
    pub member_id: Uuid,
    /// Denormalized slot date for the one-class-per-day guard
    pub slot_date: NaiveDate,
    /// Main roster or waitlist
    pub list_type: ListType,
    /// When the participation was created
    pub created_at: DateTime<Utc>,
}

/// Coach-recorded presence for a (slot, member) pair
///
/// Independent of `Participation`; the two are joined at read time. The
/// `credit_charged` flag records whether this row currently holds a ledger
/// charge, so repeated toggles never double-charge or double-refund.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRecord {
    /// Slot the attendance refers to
    pub slot_id: Uuid,
    /// Member whose presence was recorded
    pub member_id: Uuid,
    /// Whether the member attended
    pub attended: bool,
    /// When attendance was last marked present
    pub attended_at: Option<DateTime<Utc>>,
    /// Whether a credit is currently charged for this attendance
    pub credit_charged: bool,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Recurring weekly class definition, materialized into concrete slots
///
/// `day_of_week` uses 0 = Sunday through 6 = Saturday, matching SQLite's
/// `strftime('%w', ...)` so flush-by-weekday SQL and materialization agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyTemplate {
    /// Unique template identifier
    pub id: Uuid,
    /// Day of week, 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    /// Local start time of the class
    pub start_time: NaiveTime,
    /// Class title
    pub title: String,
    /// Main-list capacity for materialized slots
    pub capacity_main: i64,
    /// Waitlist capacity for materialized slots
    pub capacity_wait: i64,
    /// Disabled rows are skipped during materialization
    pub enabled: bool,
    /// When the template row was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Format a date the way it is stored (`YYYY-MM-DD`)
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Format a time the way it is stored (`HH:MM`)
#[must_use]
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Parse a stored or user-supplied date
pub fn parse_date(s: &str) -> Result<NaiveDate, crate::errors::AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| crate::errors::AppError::invalid_input(format!("invalid date: {s}")))
}

/// Parse a stored or user-supplied time; seconds are accepted and dropped
pub fn parse_time(s: &str) -> Result<NaiveTime, crate::errors::AppError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| crate::errors::AppError::invalid_input(format!("invalid time: {s}")))
}

/// Parse a stored RFC 3339 timestamp
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, crate::errors::AppError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| crate::errors::AppError::internal(format!("invalid stored timestamp: {s}")))
}
