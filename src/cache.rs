use dashmap::DashMap;

use crate::models::Route;

/// Receives every successfully written route
///
/// Refresh is fire-and-forget: the write has already been persisted and a
/// cache failure must not turn it into an error.
pub trait RouteCache: Send + Sync {
    fn refresh(&self, route: &Route);
}

/// In-process route cache keyed by app name and path
#[derive(Default)]
pub struct MemoryRouteCache {
    routes: DashMap<(String, String), Route>,
}

impl MemoryRouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn get(&self, app_name: &str, path: &str) -> Option<Route> {
        self.routes
            .get(&(app_name.to_string(), path.to_string()))
            .map(|entry| entry.value().clone())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.routes.len()
    }
}

impl RouteCache for MemoryRouteCache {
    fn refresh(&self, route: &Route) {
        self.routes
            .insert((route.app_name.clone(), route.path.clone()), route.clone());
        tracing::debug!(
            cached = self.routes.len(),
            "Refreshed cached route: {}{}",
            route.app_name,
            route.path
        );
    }
}
