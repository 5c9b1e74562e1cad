pub mod get;
pub mod health;
pub mod route_write;

pub use get::get_route_handler;
pub use health::health_handler;
pub use route_write::{create_route_handler, patch_route_handler, replace_route_handler};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::routes;
use crate::state::AppState;

/// Build the service router with every endpoint and the API docs
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(routes::HEALTH, get(health_handler))
        .route(routes::APP_ROUTES, post(create_route_handler))
        .route(
            routes::APP_ROUTE,
            get(get_route_handler)
                .put(replace_route_handler)
                .patch(patch_route_handler),
        )
        .merge(SwaggerUi::new(routes::SWAGGER_UI).url(routes::OPENAPI_JSON, ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
