use crate::error::{ApiError, ErrorResponse};
use crate::models::GetRouteResponse;
use crate::route_write::clean_path;
use crate::state::AppState;
use axum::{extract::State, extract::Path, http::StatusCode, Json};

/// GET /apps/{app}/routes/{path} handler - Retrieve a single route
#[utoipa::path(
    get,
    path = "/apps/{app}/routes/{path}",
    params(
        ("app" = String, Path, description = "Name of the owning app"),
        ("path" = String, Path, description = "Route path")
    ),
    responses(
        (status = 200, description = "Route found", body = GetRouteResponse),
        (status = 404, description = "Route not found", body = ErrorResponse),
        (status = 500, description = "Datastore error", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn get_route_handler(
    State(state): State<AppState>,
    Path((app, path)): Path<(String, String)>,
) -> Result<(StatusCode, Json<GetRouteResponse>), ApiError> {
    let path = clean_path(&format!("/{path}"));
    let route = state.datastore.get_route(&app, &path).await?;

    tracing::debug!("Retrieved route: {}{}", app, path);
    Ok((StatusCode::OK, Json(GetRouteResponse { route })))
}
