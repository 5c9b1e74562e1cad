//! Storage for apps and routes.
//!
//! The write pipeline only depends on the [`Datastore`] trait. Two backends
//! exist: an in-process map used for development and tests, and Cloud Spanner.

pub mod memory;
pub mod spanner;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{App, Route};

pub use memory::MemoryDatastore;
pub use spanner::SpannerDatastore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("App not found")]
    AppNotFound,
    #[error("App already exists")]
    AppAlreadyExists,
    #[error("Route not found")]
    RouteNotFound,
    #[error("Route already exists")]
    RouteAlreadyExists,
    #[error("Datastore error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// How an update applies the incoming route to the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Every field is replaced; `created_at` is kept
    Replace,
    /// Only specified fields are applied, see [`Route::merge`]
    Merge,
}

/// Persistence for apps and routes
///
/// Implementations must make every single call atomic. The write pipeline
/// relies on `insert_app` and `insert_route` to reject duplicates, since its
/// lookups and inserts are separate calls.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Read an app by name
    ///
    /// # Errors
    /// * [`StoreError::AppNotFound`] - No app with this name
    /// * [`StoreError::Backend`] - The backend could not be queried
    async fn get_app(&self, name: &str) -> Result<App, StoreError>;

    /// Insert a new app
    ///
    /// # Arguments
    /// * `app` - App to store; `created_at` is set by the datastore
    ///
    /// # Returns
    /// The app as persisted, with `created_at` filled in
    ///
    /// # Errors
    /// * [`StoreError::AppAlreadyExists`] - An app with this name exists
    /// * [`StoreError::Backend`] - The write failed
    async fn insert_app(&self, app: &App) -> Result<App, StoreError>;

    /// Read a route by app name and cleaned path
    ///
    /// # Errors
    /// * [`StoreError::RouteNotFound`] - No route at this path
    /// * [`StoreError::Backend`] - The backend could not be queried
    async fn get_route(&self, app_name: &str, path: &str) -> Result<Route, StoreError>;

    /// Insert a new route under an existing app
    ///
    /// # Arguments
    /// * `route` - Fully bound route; both timestamps are set by the datastore
    ///
    /// # Returns
    /// The route as persisted
    ///
    /// # Errors
    /// * [`StoreError::AppNotFound`] - The owning app is missing
    /// * [`StoreError::RouteAlreadyExists`] - The path is taken
    /// * [`StoreError::Backend`] - The write failed
    async fn insert_route(&self, route: &Route) -> Result<Route, StoreError>;

    /// Update an existing route
    ///
    /// # Arguments
    /// * `route` - Incoming route, identified by its app name and path
    /// * `mode` - Whether `route` replaces the stored route or is merged into it
    ///
    /// # Returns
    /// The route as persisted, with `updated_at` refreshed
    ///
    /// # Errors
    /// * [`StoreError::RouteNotFound`] - There is nothing to update
    /// * [`StoreError::Backend`] - The read or write failed
    async fn update_route(&self, route: &Route, mode: UpdateMode) -> Result<Route, StoreError>;

    /// Check that the backend is reachable
    ///
    /// # Errors
    /// Returns [`StoreError::Backend`] when the backend does not respond
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Apply an update to a stored route and stamp it
pub(crate) fn apply_update(stored: &mut Route, incoming: &Route, mode: UpdateMode) {
    match mode {
        UpdateMode::Replace => stored.replace_with(incoming),
        UpdateMode::Merge => stored.merge(incoming),
    }
    stored.updated_at = Some(chrono::Utc::now());
}
