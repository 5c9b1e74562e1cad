use std::sync::Arc;

use super::context::RequestContext;
use super::method::StoreAction;
use crate::datastore::{Datastore, StoreError};
use crate::models::Route;

/// What a successful write did to the route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
}

impl Outcome {
    pub fn message(self) -> &'static str {
        match self {
            Outcome::Created => "Route successfully created",
            Outcome::Updated => "Route successfully updated",
        }
    }
}

/// Applies the method's store actions to a bound route
#[derive(Clone)]
pub struct RouteUpserter {
    datastore: Arc<dyn Datastore>,
}

impl RouteUpserter {
    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self { datastore }
    }

    pub async fn upsert(&self, ctx: &RequestContext, route: &Route) -> Result<(Outcome, Route), StoreError> {
        let plan = ctx.method.plan();

        let result = match plan.primary {
            StoreAction::Insert => self
                .datastore
                .insert_route(route)
                .await
                .map(|stored| (Outcome::Created, stored)),
            StoreAction::Update(mode) => match self.datastore.update_route(route, mode).await {
                Ok(stored) => Ok((Outcome::Updated, stored)),
                Err(StoreError::RouteNotFound) if plan.insert_on_missing => {
                    tracing::debug!("Route {} not found, inserting instead", route.path);
                    self.datastore
                        .insert_route(route)
                        .await
                        .map(|stored| (Outcome::Created, stored))
                }
                Err(err) => Err(err),
            },
        };

        match &result {
            Ok((outcome, stored)) => tracing::info!(?outcome, "Route {}{} written", stored.app_name, stored.path),
            Err(err) => tracing::warn!(error = %err, "Route {} not written", route.path),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::{MemoryDatastore, UpdateMode};
    use crate::error::ApiError;
    use crate::models::App;
    use crate::route_write::method::WriteMethod;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::Mutex;

    /// Datastore where another writer creates the route between our update
    /// and our insert
    #[derive(Default)]
    struct RacedRouteStore {
        calls: Mutex<Vec<&'static str>>,
    }

    impl RacedRouteStore {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Datastore for RacedRouteStore {
        async fn get_app(&self, name: &str) -> Result<App, StoreError> {
            Ok(App::named(name))
        }
        async fn insert_app(&self, app: &App) -> Result<App, StoreError> {
            Ok(app.clone())
        }
        async fn get_route(&self, _app_name: &str, _path: &str) -> Result<Route, StoreError> {
            Err(StoreError::RouteNotFound)
        }
        async fn insert_route(&self, _route: &Route) -> Result<Route, StoreError> {
            self.calls.lock().unwrap().push("insert");
            Err(StoreError::RouteAlreadyExists)
        }
        async fn update_route(&self, _route: &Route, _mode: UpdateMode) -> Result<Route, StoreError> {
            self.calls.lock().unwrap().push("update");
            Err(StoreError::RouteNotFound)
        }
        async fn health_check(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn route(image: &str) -> Route {
        let mut route = Route {
            app_name: "myapp".to_string(),
            path: "/hello".to_string(),
            image: image.to_string(),
            ..Default::default()
        };
        route.set_defaults();
        route
    }

    fn ctx(method: WriteMethod) -> RequestContext {
        RequestContext::new(method, "myapp", Some("hello".to_string()))
    }

    async fn setup() -> (Arc<MemoryDatastore>, RouteUpserter) {
        let store = Arc::new(MemoryDatastore::new());
        store.insert_app(&App::named("myapp")).await.unwrap();
        (store.clone(), RouteUpserter::new(store))
    }

    #[tokio::test]
    async fn test_create_inserts() {
        let (_, upserter) = setup().await;
        let (outcome, stored) = upserter.upsert(&ctx(WriteMethod::Create), &route("img")).await.unwrap();
        assert_eq!(outcome, Outcome::Created);
        assert!(stored.created_at.is_some());
    }

    #[tokio::test]
    async fn test_create_rejects_existing_route() {
        let (store, upserter) = setup().await;
        store.insert_route(&route("img")).await.unwrap();

        let err = upserter.upsert(&ctx(WriteMethod::Create), &route("img")).await.unwrap_err();
        assert!(matches!(err, StoreError::RouteAlreadyExists));
    }

    #[tokio::test]
    async fn test_replace_creates_then_updates() {
        let (store, upserter) = setup().await;

        let (first, created) = upserter.upsert(&ctx(WriteMethod::Replace), &route("img")).await.unwrap();
        let (second, updated) = upserter.upsert(&ctx(WriteMethod::Replace), &route("img")).await.unwrap();

        assert_eq!(first, Outcome::Created);
        assert_eq!(second, Outcome::Updated);
        assert_eq!(created.created_at, updated.created_at);
        assert_eq!(
            Route { updated_at: None, ..created },
            Route { updated_at: None, ..updated }
        );
        assert_eq!(store.get_route("myapp", "/hello").await.unwrap().image, "img");
    }

    #[tokio::test]
    async fn test_patch_missing_route_fails() {
        let (store, upserter) = setup().await;

        let err = upserter.upsert(&ctx(WriteMethod::Patch), &route("img")).await.unwrap_err();

        assert!(matches!(err, StoreError::RouteNotFound));
        assert!(matches!(store.get_route("myapp", "/hello").await, Err(StoreError::RouteNotFound)));
    }

    #[tokio::test]
    async fn test_patch_updates_existing_route() {
        let (store, upserter) = setup().await;
        store.insert_route(&route("img")).await.unwrap();

        let (outcome, stored) = upserter.upsert(&ctx(WriteMethod::Patch), &route("img:2")).await.unwrap();

        assert_eq!(outcome, Outcome::Updated);
        assert_eq!(stored.image, "img:2");
    }

    #[tokio::test]
    async fn test_replace_without_app_surfaces_store_error() {
        let store = Arc::new(MemoryDatastore::new());
        let upserter = RouteUpserter::new(store);

        let err = upserter.upsert(&ctx(WriteMethod::Replace), &route("img")).await.unwrap_err();
        assert!(matches!(err, StoreError::AppNotFound));
    }

    #[tokio::test]
    async fn test_replace_fallback_reports_conflict_when_insert_loses() {
        let store = Arc::new(RacedRouteStore::default());
        let upserter = RouteUpserter::new(store.clone());

        let err = upserter.upsert(&ctx(WriteMethod::Replace), &route("img")).await.unwrap_err();

        assert!(matches!(err, StoreError::RouteAlreadyExists));
        // One update, one insert, no further retry
        assert_eq!(store.calls(), vec!["update", "insert"]);
        assert_eq!(ApiError::from(err).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_messages() {
        assert_eq!(Outcome::Created.message(), "Route successfully created");
        assert_eq!(Outcome::Updated.message(), "Route successfully updated");
    }
}
