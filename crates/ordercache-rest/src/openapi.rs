//! OpenAPI documentation configuration.

use crate::controllers::health_controller::{ComponentHealth, HealthResponse, ReadinessResponse};
use ordercache_core::{Delivery, ErrorResponse, Item, Order, Payment};
use ordercache_service::CacheStats;
use utoipa::OpenApi;

/// OpenAPI documentation for the order query API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ordercache API",
        version = "0.1.0",
        description = "Read access to cached orders",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    paths(
        crate::controllers::order_controller::get_order,
        crate::controllers::health_controller::health_check,
        crate::controllers::health_controller::readiness_check,
        crate::controllers::health_controller::liveness_check,
    ),
    components(
        schemas(
            Order,
            Delivery,
            Payment,
            Item,
            ErrorResponse,
            CacheStats,
            HealthResponse,
            ReadinessResponse,
            ComponentHealth,
        )
    ),
    tags(
        (name = "orders", description = "Order lookup"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;
