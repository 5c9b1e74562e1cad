use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::datastore::StoreError;
use crate::route_write::{BindError, ProvisionError};

/// Error response type
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Custom error type for API endpoints
///
/// Binding and validation failures are the client's fault (400). App
/// provisioning failures are ours (500), except an app name that fails
/// validation. Store failures keep their meaning: missing things are 404,
/// duplicates are 409.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Bind(_) => StatusCode::BAD_REQUEST,
            ApiError::Provision(ProvisionError::InvalidApp(_)) => StatusCode::BAD_REQUEST,
            ApiError::Provision(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(StoreError::AppNotFound | StoreError::RouteNotFound) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Store(StoreError::AppAlreadyExists | StoreError::RouteAlreadyExists) => {
                StatusCode::CONFLICT
            }
            ApiError::Store(StoreError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Backend details stay in the logs
        let error = match &self {
            ApiError::Store(StoreError::Backend(err)) => {
                tracing::error!("Datastore error: {:#}", err);
                "Internal datastore error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
