// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Unified Error Handling System
//!
//! Centralized error handling for the Boxbook booking service. Defines the
//! business-rule error taxonomy, HTTP response formatting, and the mapping
//! from storage-layer failures (transient) to API errors so that callers can
//! distinguish "try again" from "this action is not allowed".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authentication & Authorization (1000-1999)
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired = 1000,
    #[serde(rename = "AUTH_INVALID")]
    AuthInvalid = 1001,
    #[serde(rename = "PERMISSION_DENIED")]
    PermissionDenied = 1002,

    // Validation (2000-2999)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 2000,

    // Resource lookup (3000-3999)
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 3000,
    #[serde(rename = "NOT_BOOKED")]
    NotBooked = 3001,

    // Booking rules (4000-4999)
    #[serde(rename = "OUTSIDE_BOOKING_WINDOW")]
    OutsideBookingWindow = 4000,
    #[serde(rename = "ALREADY_BOOKED")]
    AlreadyBooked = 4001,
    #[serde(rename = "ALREADY_BOOKED_THAT_DAY")]
    AlreadyBookedThatDay = 4002,
    #[serde(rename = "SLOT_FULL")]
    SlotFull = 4003,
    #[serde(rename = "INSUFFICIENT_CREDITS")]
    InsufficientCredits = 4004,

    // Internal Errors (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError = 9001,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::InvalidInput => 400,

            // 401 Unauthorized
            Self::AuthRequired | Self::AuthInvalid => 401,

            // 402 Payment Required
            Self::InsufficientCredits => 402,

            // 403 Forbidden
            Self::PermissionDenied => 403,

            // 404 Not Found
            Self::ResourceNotFound | Self::NotBooked => 404,

            // 409 Conflict
            Self::AlreadyBooked | Self::AlreadyBookedThatDay | Self::SlotFull => 409,

            // 422 Unprocessable Entity
            Self::OutsideBookingWindow => 422,

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError => 500,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication is required to access this resource",
            Self::AuthInvalid => "The provided identity is invalid",
            Self::PermissionDenied => "You do not have permission to perform this action",
            Self::InvalidInput => "The provided input is invalid",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::NotBooked => "No booking exists for this slot and member",
            Self::OutsideBookingWindow => "The slot cannot be booked at this time",
            Self::AlreadyBooked => "This slot is already booked by the member",
            Self::AlreadyBookedThatDay => "The member already has a booking on this date",
            Self::SlotFull => "The slot has no remaining capacity",
            Self::InsufficientCredits => "The member does not have enough credits",
            Self::InternalError => "An internal server error occurred",
            Self::DatabaseError => "Database operation failed",
        }
    }

    /// Whether callers should treat this failure as transient and retryable
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::DatabaseError)
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorResponseDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    pub code: ErrorCode,
    pub message: String,
    /// Whether the caller may retry the same request
    pub transient: bool,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message.clone(),
                transient: error.code.is_transient(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(code = ?self.code, "request failed: {self}");
        }
        let body: ErrorResponse = (&self).into();
        (status, Json(body)).into_response()
    }
}

/// Convenience functions for creating common errors
impl AppError {
    /// Authentication required
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication required")
    }

    /// Invalid identity
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Role check failed
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// No participation exists for the (slot, member) pair
    #[must_use]
    pub fn not_booked() -> Self {
        Self::new(ErrorCode::NotBooked, "No booking exists for this slot")
    }

    /// Booking attempted outside the permitted window
    pub fn outside_booking_window(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::OutsideBookingWindow, message)
    }

    /// Member already holds a participation on this exact slot
    #[must_use]
    pub fn already_booked() -> Self {
        Self::new(ErrorCode::AlreadyBooked, "Slot already booked")
    }

    /// Member already holds a participation on another slot the same day
    #[must_use]
    pub fn already_booked_that_day() -> Self {
        Self::new(
            ErrorCode::AlreadyBookedThatDay,
            "Another class is already booked on this date",
        )
    }

    /// No capacity left on the requested list
    pub fn slot_full(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SlotFull, message)
    }

    /// Debit rejected because the balance would go negative
    #[must_use]
    pub fn insufficient_credits() -> Self {
        Self::new(ErrorCode::InsufficientCredits, "Not enough credits")
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }
}

/// Conversion from sqlx errors; storage failures are transient by policy
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        Self::new(ErrorCode::DatabaseError, error.to_string()).with_source(error)
    }
}

/// Conversion from anyhow::Error to `AppError`
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(ErrorCode::InternalError, error.to_string())
    }
}
