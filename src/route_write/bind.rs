use thiserror::Error;

use super::context::{RequestContext, clean_path};
use crate::models::{Route, RouteWrapper, ValidationError};

#[derive(Debug, Error)]
pub enum BindError {
    #[error("Invalid JSON")]
    InvalidPayload(#[source] serde_json::Error),
    #[error("Missing new route")]
    RouteMissing,
    #[error("Could not update route - path is immutable")]
    PathImmutable,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Decode a route write body and reconcile it with the URL
///
/// The app name always comes from the URL. For PUT and PATCH the cleaned URL
/// path is authoritative and a different non-empty body path is rejected.
pub fn bind(body: &[u8], ctx: &RequestContext) -> Result<Route, BindError> {
    let plan = ctx.method.plan();

    let wrapper: Option<RouteWrapper> = serde_json::from_slice(body).map_err(|err| {
        tracing::debug!(error = %err, "Invalid JSON in route body");
        BindError::InvalidPayload(err)
    })?;

    let Some(mut route) = wrapper.and_then(|wrapper| wrapper.route) else {
        tracing::debug!("Route body has no route");
        return Err(BindError::RouteMissing);
    };

    route.app_name = ctx.app_name.clone();

    if plan.path_from_url {
        let raw = ctx.url_path.as_deref().unwrap_or_default();
        let url_path = clean_path(&format!("/{raw}"));
        if !route.path.is_empty() && route.path != url_path {
            tracing::debug!(body_path = %route.path, %url_path, "Route path is immutable");
            return Err(BindError::PathImmutable);
        }
        route.path = url_path;
    }

    route.created_at = None;
    route.updated_at = None;
    route.set_defaults();

    route.validate(plan.partial).map_err(|err| {
        tracing::debug!(error = %err, "Route failed validation");
        err
    })?;

    Ok(route)
}
