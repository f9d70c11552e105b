//! Order lookup controller.

use crate::{
    responses::{AppError, ApiResult},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use ordercache_core::{ErrorResponse, Order, OrderError, OrderId};
use tracing::debug;

/// Creates the order router.
pub fn router() -> Router<AppState> {
    Router::new().route("/orders/:id", get(get_order))
}

/// Get an order by its storage id.
///
/// Lookup failures of any kind are reported as 404 without detail.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "orders",
    params(
        ("id" = i64, Path, description = "Storage id assigned on ingestion")
    ),
    responses(
        (status = 200, description = "Order found", body = Order),
        (status = 400, description = "Id is not an integer", body = ErrorResponse),
        (status = 404, description = "No such order", body = ErrorResponse)
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    debug!("Get order request: {}", id);

    let order_id = parse_order_id(&id)?;

    let order = state.order_service.get_order(order_id).await.map_err(|e| {
        debug!(order_id = %order_id, error = %e, "Order lookup failed");
        AppError(OrderError::order_not_found(order_id))
    })?;

    Ok(Json(&*order).into_response())
}

/// Helper to parse the order id path parameter.
fn parse_order_id(id: &str) -> Result<OrderId, AppError> {
    id.parse::<OrderId>()
        .map_err(|_| AppError(OrderError::validation(format!("Invalid order id: {}", id))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order_id() {
        assert_eq!(parse_order_id("42").unwrap(), OrderId::new(42));
        assert!(parse_order_id("abc").is_err());
        assert!(parse_order_id("4.2").is_err());
        assert!(parse_order_id("").is_err());
    }
}
