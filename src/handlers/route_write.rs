use crate::error::{ApiError, ErrorResponse};
use crate::models::{RouteResponse, RouteWrapper};
use crate::routes;
use crate::route_write::{RequestContext, WriteMethod};
use crate::state::AppState;
use axum::{body::Bytes, extract::Path, extract::State, http::StatusCode, Json};

/// POST /apps/{app}/routes handler - Create a route, creating the app if needed
///
/// The body is decoded by the write pipeline rather than by axum's `Json`
/// extractor so that malformed JSON is reported like every other bind error.
#[utoipa::path(
    post,
    path = routes::APP_ROUTES,
    params(
        ("app" = String, Path, description = "Name of the owning app")
    ),
    request_body = RouteWrapper,
    responses(
        (status = 200, description = "Route created", body = RouteResponse),
        (status = 400, description = "Invalid JSON, missing route or validation failure", body = ErrorResponse),
        (status = 409, description = "Route already exists", body = ErrorResponse),
        (status = 500, description = "App could not be created or datastore error", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn create_route_handler(
    State(state): State<AppState>,
    Path(app): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<RouteResponse>), ApiError> {
    let ctx = RequestContext::new(WriteMethod::Create, app, None);
    let response = state.writer.write(&ctx, &body).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// PUT /apps/{app}/routes/{path} handler - Replace a route or create it
#[utoipa::path(
    put,
    path = "/apps/{app}/routes/{path}",
    params(
        ("app" = String, Path, description = "Name of the owning app"),
        ("path" = String, Path, description = "Route path, authoritative over the body")
    ),
    request_body = RouteWrapper,
    responses(
        (status = 200, description = "Route created or updated", body = RouteResponse),
        (status = 400, description = "Invalid JSON, path mismatch or validation failure", body = ErrorResponse),
        (status = 500, description = "App could not be created or datastore error", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn replace_route_handler(
    State(state): State<AppState>,
    Path((app, path)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<RouteResponse>), ApiError> {
    update(state, WriteMethod::Replace, app, path, body).await
}

/// PATCH /apps/{app}/routes/{path} handler - Partially update an existing route
#[utoipa::path(
    patch,
    path = "/apps/{app}/routes/{path}",
    params(
        ("app" = String, Path, description = "Name of the owning app"),
        ("path" = String, Path, description = "Route path, authoritative over the body")
    ),
    request_body = RouteWrapper,
    responses(
        (status = 200, description = "Route updated", body = RouteResponse),
        (status = 400, description = "Invalid JSON, path mismatch or validation failure", body = ErrorResponse),
        (status = 404, description = "App or route not found", body = ErrorResponse),
        (status = 500, description = "Datastore error", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn patch_route_handler(
    State(state): State<AppState>,
    Path((app, path)): Path<(String, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<RouteResponse>), ApiError> {
    update(state, WriteMethod::Patch, app, path, body).await
}

async fn update(
    state: AppState,
    method: WriteMethod,
    app: String,
    path: String,
    body: Bytes,
) -> Result<(StatusCode, Json<RouteResponse>), ApiError> {
    let ctx = RequestContext::new(method, app, Some(path));
    let response = state.writer.write(&ctx, &body).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::Datastore;
    use crate::handlers::test_support::{TestApp, json_body};
    use crate::models::GetRouteResponse;

    #[tokio::test]
    async fn test_post_creates_app_and_route() {
        let app = TestApp::new();

        let response = app
            .send(
                "POST",
                "/apps/myapp/routes",
                Some(r#"{"route": {"path": "/hello", "image": "fnproject/hello"}}"#),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: RouteResponse = json_body(response).await;
        assert_eq!(body.message, "Route successfully created");
        assert_eq!(body.route.app_name, "myapp");
        assert_eq!(body.route.path, "/hello");
        assert_eq!(body.route.memory, 128);
        assert!(app.store.get_app("myapp").await.is_ok());
        assert_eq!(app.cache.get("myapp", "/hello"), Some(body.route));
    }

    #[tokio::test]
    async fn test_post_duplicate_route_conflicts() {
        let app = TestApp::new();
        let body = r#"{"route": {"path": "/hello", "image": "fnproject/hello"}}"#;

        app.send("POST", "/apps/myapp/routes", Some(body)).await;
        let response = app.send("POST", "/apps/myapp/routes", Some(body)).await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let error: ErrorResponse = json_body(response).await;
        assert_eq!(error.error, "Route already exists");
    }

    #[tokio::test]
    async fn test_post_invalid_json() {
        let app = TestApp::new();

        let response = app.send("POST", "/apps/myapp/routes", Some("{invalid json}")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = json_body(response).await;
        assert_eq!(error.error, "Invalid JSON");
        assert_eq!(app.store.app_count(), 0);
    }

    #[tokio::test]
    async fn test_post_missing_route() {
        let app = TestApp::new();

        let response = app.send("POST", "/apps/myapp/routes", Some(r#"{"other": 1}"#)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = json_body(response).await;
        assert_eq!(error.error, "Missing new route");
    }

    #[tokio::test]
    async fn test_post_invalid_app_name() {
        let app = TestApp::new();

        let response = app
            .send(
                "POST",
                "/apps/bad.name/routes",
                Some(r#"{"route": {"path": "/hello", "image": "img"}}"#),
            )
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = json_body(response).await;
        assert_eq!(error.error, "Invalid app name");
    }

    #[tokio::test]
    async fn test_put_creates_then_updates() {
        let app = TestApp::new();
        let body = r#"{"route": {"image": "fnproject/hello", "memory": 256}}"#;

        let first = app.send("PUT", "/apps/myapp/routes/hello", Some(body)).await;
        assert_eq!(first.status(), StatusCode::OK);
        let first: RouteResponse = json_body(first).await;

        let second = app.send("PUT", "/apps/myapp/routes/hello", Some(body)).await;
        assert_eq!(second.status(), StatusCode::OK);
        let second: RouteResponse = json_body(second).await;

        assert_eq!(first.message, "Route successfully created");
        assert_eq!(second.message, "Route successfully updated");
        assert_eq!(first.route.path, "/hello");
        assert_eq!(second.route.memory, 256);
        assert_eq!(first.route.created_at, second.route.created_at);
        assert_eq!(app.store.app_count(), 1);
    }

    #[tokio::test]
    async fn test_put_nested_path_is_cleaned() {
        let app = TestApp::new();

        let response = app
            .send(
                "PUT",
                "/apps/myapp/routes/a//b/./c",
                Some(r#"{"route": {"image": "img"}}"#),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: RouteResponse = json_body(response).await;
        assert_eq!(body.route.path, "/a/b/c");
    }

    #[tokio::test]
    async fn test_put_path_mismatch() {
        let app = TestApp::new();

        let response = app
            .send(
                "PUT",
                "/apps/myapp/routes/hello",
                Some(r#"{"route": {"path": "/other", "image": "img"}}"#),
            )
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = json_body(response).await;
        assert_eq!(error.error, "Could not update route - path is immutable");
        assert_eq!(app.store.app_count(), 0);
    }

    #[tokio::test]
    async fn test_patch_path_mismatch_on_existing_route() {
        let app = TestApp::new();
        app.send(
            "POST",
            "/apps/myapp/routes",
            Some(r#"{"route": {"path": "/hello", "image": "img"}}"#),
        )
        .await;

        let response = app
            .send("PATCH", "/apps/myapp/routes/hello", Some(r#"{"route": {"path": "/other"}}"#))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = json_body(response).await;
        assert_eq!(error.error, "Could not update route - path is immutable");
        assert!(app.store.get_route("myapp", "/other").await.is_err());
        assert_eq!(app.store.get_route("myapp", "/hello").await.unwrap().image, "img");
    }

    #[tokio::test]
    async fn test_patch_updates_only_given_fields() {
        let app = TestApp::new();
        app.send(
            "POST",
            "/apps/myapp/routes",
            Some(r#"{"route": {"path": "/hello", "image": "img", "config": {"DB": "pg", "OLD": "x"}}}"#),
        )
        .await;

        let response = app
            .send(
                "PATCH",
                "/apps/myapp/routes/hello",
                Some(r#"{"route": {"image": "img:2", "config": {"OLD": ""}}}"#),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: RouteResponse = json_body(response).await;
        assert_eq!(body.message, "Route successfully updated");
        assert_eq!(body.route.image, "img:2");
        assert_eq!(body.route.config.get("DB").map(String::as_str), Some("pg"));
        assert!(!body.route.config.contains_key("OLD"));
    }

    #[tokio::test]
    async fn test_patch_resets_omitted_fields_to_defaults() {
        let app = TestApp::new();
        app.send(
            "POST",
            "/apps/myapp/routes",
            Some(r#"{"route": {"path": "/hello", "image": "img", "type": "async", "memory": 512, "timeout": 600}}"#),
        )
        .await;

        let response = app
            .send("PATCH", "/apps/myapp/routes/hello", Some(r#"{"route": {"image": "img:2"}}"#))
            .await;

        // Defaults are bound before the merge, so omitted fields are not kept
        assert_eq!(response.status(), StatusCode::OK);
        let body: RouteResponse = json_body(response).await;
        assert_eq!(body.route.image, "img:2");
        assert_eq!(body.route.route_type, "sync");
        assert_eq!(body.route.memory, 128);
        assert_eq!(body.route.timeout, 30);
    }

    #[tokio::test]
    async fn test_patch_timeout_is_checked_against_default_type() {
        let app = TestApp::new();
        app.send(
            "POST",
            "/apps/myapp/routes",
            Some(r#"{"route": {"path": "/hello", "image": "img", "type": "async", "timeout": 600}}"#),
        )
        .await;

        let response = app
            .send("PATCH", "/apps/myapp/routes/hello", Some(r#"{"route": {"timeout": 600}}"#))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = json_body(response).await;
        assert_eq!(error.error, "Timeout must be at most 120 seconds for this route type");
        let stored = app.store.get_route("myapp", "/hello").await.unwrap();
        assert_eq!(stored.route_type, "async");
    }

    #[tokio::test]
    async fn test_post_null_body_is_missing_route() {
        let app = TestApp::new();

        let response = app.send("POST", "/apps/myapp/routes", Some("null")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = json_body(response).await;
        assert_eq!(error.error, "Missing new route");
        assert_eq!(app.store.app_count(), 0);
    }

    #[tokio::test]
    async fn test_patch_missing_route_is_not_found() {
        let app = TestApp::new();

        let response = app
            .send("PATCH", "/apps/myapp/routes/hello", Some(r#"{"route": {"image": "img"}}"#))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(app.store.app_count(), 0);

        let read = app.send("GET", "/apps/myapp/routes/hello", None).await;
        assert_eq!(read.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_written_route_is_readable() {
        let app = TestApp::new();
        let created = app
            .send("PUT", "/apps/myapp/routes/hello", Some(r#"{"route": {"image": "img"}}"#))
            .await;
        let created: RouteResponse = json_body(created).await;

        let read = app.send("GET", "/apps/myapp/routes/hello", None).await;
        assert_eq!(read.status(), StatusCode::OK);
        let read: GetRouteResponse = json_body(read).await;
        assert_eq!(read.route, created.route);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_posts_create_one_app() {
        let app = TestApp::new();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let app = app.clone();
                tokio::spawn(async move {
                    let body = format!(r#"{{"route": {{"path": "/r{}", "image": "img"}}}}"#, i);
                    app.send("POST", "/apps/newapp/routes", Some(&body)).await.status()
                })
            })
            .collect();

        for task in tasks {
            let status = task.await.unwrap();
            // Losers of the app creation race report the datastore's duplicate
            assert!(
                status == StatusCode::OK || status == StatusCode::INTERNAL_SERVER_ERROR,
                "unexpected status {}",
                status
            );
        }
        assert_eq!(app.store.app_count(), 1);
    }
}
