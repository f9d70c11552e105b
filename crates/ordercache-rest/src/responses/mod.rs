//! API response types.

use ordercache_core::{ErrorResponse, OrderError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Application error type for Axum.
#[derive(Debug)]
pub struct AppError(pub OrderError);

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = Json(ErrorResponse::from_error(&self.0));

        (status, body).into_response()
    }
}

/// Result type for Axum handlers.
pub type ApiResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ordercache_core::OrderId;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError(OrderError::order_not_found(OrderId::new(4))).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_maps_to_400() {
        let response = AppError(OrderError::validation("bad id")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
