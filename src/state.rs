use crate::datastore::Datastore;
use crate::route_write::RouteWriter;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub datastore: Arc<dyn Datastore>,
    pub writer: Arc<RouteWriter>,
}
