use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::{Mutex, MutexGuard};

use super::{Datastore, StoreError, UpdateMode, apply_update};
use crate::models::{App, Route};

#[derive(Default)]
struct Tables {
    apps: BTreeMap<String, App>,
    routes: BTreeMap<(String, String), Route>,
}

/// In-process datastore
///
/// Every operation holds the lock for its whole duration, so each single call
/// is atomic. Sequences of calls are not.
#[derive(Default)]
pub struct MemoryDatastore {
    tables: Mutex<Tables>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("memory datastore lock poisoned")))
    }

    #[cfg(test)]
    pub fn app_count(&self) -> usize {
        self.tables.lock().map(|t| t.apps.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn get_app(&self, name: &str) -> Result<App, StoreError> {
        self.lock()?
            .apps
            .get(name)
            .cloned()
            .ok_or(StoreError::AppNotFound)
    }

    async fn insert_app(&self, app: &App) -> Result<App, StoreError> {
        let mut tables = self.lock()?;
        match tables.apps.entry(app.name.clone()) {
            Entry::Occupied(_) => Err(StoreError::AppAlreadyExists),
            Entry::Vacant(slot) => {
                let mut app = app.clone();
                app.created_at = Some(Utc::now());
                tracing::debug!("Inserted app: {}", app.name);
                Ok(slot.insert(app).clone())
            }
        }
    }

    async fn get_route(&self, app_name: &str, path: &str) -> Result<Route, StoreError> {
        self.lock()?
            .routes
            .get(&(app_name.to_string(), path.to_string()))
            .cloned()
            .ok_or(StoreError::RouteNotFound)
    }

    async fn insert_route(&self, route: &Route) -> Result<Route, StoreError> {
        let mut tables = self.lock()?;
        if !tables.apps.contains_key(&route.app_name) {
            return Err(StoreError::AppNotFound);
        }
        match tables
            .routes
            .entry((route.app_name.clone(), route.path.clone()))
        {
            Entry::Occupied(_) => Err(StoreError::RouteAlreadyExists),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let mut route = route.clone();
                route.created_at = Some(now);
                route.updated_at = Some(now);
                tracing::debug!("Inserted route: {}{}", route.app_name, route.path);
                Ok(slot.insert(route).clone())
            }
        }
    }

    async fn update_route(&self, route: &Route, mode: UpdateMode) -> Result<Route, StoreError> {
        let mut tables = self.lock()?;
        let stored = tables
            .routes
            .get_mut(&(route.app_name.clone(), route.path.clone()))
            .ok_or(StoreError::RouteNotFound)?;
        apply_update(stored, route, mode);
        tracing::debug!("Updated route ({:?}): {}{}", mode, stored.app_name, stored.path);
        Ok(stored.clone())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
