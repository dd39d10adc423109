//! Error types for Schoolride server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::enums::BookingStatus;

/// Numeric error codes returned to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchData = 4,
    BadValue = 5,
    Duplicate = 6,
    CapacityExceeded = 10,
    InvalidStateTransition = 11,
    InvalidPlanType = 12,
    PricingInvariantViolation = 13,
    NotInActiveWindow = 14,
    DuplicateActiveBooking = 15,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("No seats available on route {route_id}")]
    CapacityExceeded { route_id: i32 },

    #[error("Booking {booking_id} cannot be {action} while {status}")]
    InvalidStateTransition {
        booking_id: i32,
        status: BookingStatus,
        action: &'static str,
    },

    #[error("Invalid plan type: {0}")]
    InvalidPlanType(String),

    #[error("Pricing invariant violated: {0}")]
    PricingInvariantViolation(String),

    #[error("Booking {booking_id} is not active on {date}")]
    NotInActiveWindow {
        booking_id: i32,
        date: chrono::NaiveDate,
    },

    #[error("Student {student_id} already has an overlapping booking on route {route_id}")]
    DuplicateActiveBooking { student_id: i32, route_id: i32 },
}

impl AppError {
    /// HTTP status, error code and user-facing message
    fn parts(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::CapacityExceeded { .. } => (
                StatusCode::CONFLICT,
                ErrorCode::CapacityExceeded,
                "No seats available on this route".to_string(),
            ),
            AppError::InvalidStateTransition { status, action, .. } => (
                StatusCode::CONFLICT,
                ErrorCode::InvalidStateTransition,
                format!("Booking cannot be {} while {}", action, status),
            ),
            AppError::InvalidPlanType(_) => (
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidPlanType,
                "Unknown or unpriced plan type".to_string(),
            ),
            AppError::PricingInvariantViolation(msg) => {
                tracing::error!("Pricing invariant violated: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::PricingInvariantViolation,
                    "Price could not be computed".to_string(),
                )
            }
            AppError::NotInActiveWindow { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::NotInActiveWindow,
                "Booking is not active for this date and period".to_string(),
            ),
            AppError::DuplicateActiveBooking { .. } => (
                StatusCode::CONFLICT,
                ErrorCode::DuplicateActiveBooking,
                "Student already has a booking on this route for these dates".to_string(),
            ),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
