use utoipa::OpenApi;

use crate::error::{ErrorResponse, HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::{App, GetRouteResponse, Route, RouteResponse, RouteWrapper};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "fnroutes API",
        version = "1.0.0",
        description = "Create, replace and patch function routes, provisioning their apps on demand"
    ),
    paths(
        handlers::health::health_handler,
        handlers::route_write::create_route_handler,
        handlers::route_write::replace_route_handler,
        handlers::route_write::patch_route_handler,
        handlers::get::get_route_handler
    ),
    components(
        schemas(
            App,
            Route,
            RouteWrapper,
            RouteResponse,
            GetRouteResponse,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "routes", description = "Route write and read operations")
    )
)]
pub struct ApiDoc;
