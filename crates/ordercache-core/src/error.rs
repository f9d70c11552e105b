//! Unified error types for all layers of the application.

use crate::OrderId;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for ordercache.
///
/// The ingestion and cache variants map one-to-one onto the failure points
/// of the pipeline and the resync loop; the infrastructure variants cover
/// everything around them.
#[derive(Error, Debug)]
pub enum OrderError {
    // ============ Ingestion Errors ============
    /// Payload is not a well-formed order.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Store write failed; the store rolled the whole aggregate back.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The store did not return a usable id for the save that just committed.
    #[error("Id resolution error: {0}")]
    IdResolution(String),

    // ============ Lookup Errors ============
    /// Resource not found
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    // ============ Resync Errors ============
    /// Listing ids failed; the whole resync cycle is dropped.
    #[error("Resync enumeration failed: {0}")]
    ResyncEnumeration(String),

    /// Fetching a single row failed; only that row is dropped.
    #[error("Resync failed for order {id}: {message}")]
    ResyncRow { id: OrderId, message: String },

    // ============ Infrastructure Errors ============
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Message bus error
    #[error("Message bus error: {0}")]
    Bus(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OrderError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Decode(_) | Self::Validation(_) => 400,
            Self::Bus(_) => 502,
            Self::Persistence(_)
            | Self::IdResolution(_)
            | Self::ResyncEnumeration(_)
            | Self::ResyncRow { .. }
            | Self::Database(_)
            | Self::Configuration(_)
            | Self::Internal(_)
            | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "DECODE_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::IdResolution(_) => "ID_RESOLUTION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::ResyncEnumeration(_) => "RESYNC_ENUMERATION_ERROR",
            Self::ResyncRow { .. } => "RESYNC_ROW_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Bus(_) => "BUS_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a not found error for an order id.
    #[must_use]
    pub fn order_not_found(id: OrderId) -> Self {
        Self::not_found("Order", id)
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a persistence error.
    #[must_use]
    pub fn persistence<T: Into<String>>(message: T) -> Self {
        Self::Persistence(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Creates a message bus error.
    #[must_use]
    pub fn bus<T: Into<String>>(message: T) -> Self {
        Self::Bus(message.into())
    }

    /// Checks if this is a lookup miss.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound {
                resource_type: "database_row",
                id: "unknown".to_string(),
            },
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for OrderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Serializable error response for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new error response from an `OrderError`.
    #[must_use]
    pub fn from_error(error: &OrderError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(OrderError::order_not_found(OrderId::new(1)).status_code(), 404);
        assert_eq!(OrderError::Decode("eof".to_string()).status_code(), 400);
        assert_eq!(OrderError::validation("bad").status_code(), 400);
        assert_eq!(OrderError::persistence("rollback").status_code(), 500);
        assert_eq!(OrderError::bus("gone").status_code(), 502);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(OrderError::Decode(String::new()).error_code(), "DECODE_ERROR");
        assert_eq!(OrderError::IdResolution(String::new()).error_code(), "ID_RESOLUTION_ERROR");
        assert_eq!(
            OrderError::ResyncRow { id: OrderId::new(7), message: String::new() }.error_code(),
            "RESYNC_ROW_ERROR"
        );
        assert_eq!(OrderError::ResyncEnumeration(String::new()).error_code(), "RESYNC_ENUMERATION_ERROR");
        assert_eq!(OrderError::internal("x").error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_json_error_is_decode() {
        let err: OrderError = serde_json::from_str::<serde_json::Value>("{\"a\":").unwrap_err().into();
        assert!(matches!(err, OrderError::Decode(_)));
    }

    #[test]
    fn test_not_found_display() {
        let err = OrderError::order_not_found(OrderId::new(99));
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Order"));
        assert!(err.to_string().contains("99"));
    }

    #[test]
    fn test_resync_row_display() {
        let err = OrderError::ResyncRow { id: OrderId::new(3), message: "timeout".to_string() };
        assert_eq!(err.to_string(), "Resync failed for order 3: timeout");
    }

    #[test]
    fn test_error_response_from_error() {
        let err = OrderError::order_not_found(OrderId::new(1));
        let response = ErrorResponse::from_error(&err);
        assert_eq!(response.code, "NOT_FOUND");
        assert!(!response.message.is_empty());
    }
}
