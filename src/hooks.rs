//! App creation lifecycle hooks.
//!
//! Listeners observe on-demand app provisioning. `before_app_create` runs
//! before the app is persisted and can veto it; `after_app_create` runs once
//! it is stored.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::App;
use crate::route_write::RequestContext;

#[async_trait]
pub trait AppListener: Send + Sync {
    async fn before_app_create(&self, ctx: &RequestContext, app: &App) -> anyhow::Result<()>;

    async fn after_app_create(&self, ctx: &RequestContext, app: &App) -> anyhow::Result<()>;
}

/// Ordered set of listeners; the first failure stops the chain
#[derive(Clone, Default)]
pub struct AppListeners {
    listeners: Vec<Arc<dyn AppListener>>,
}

impl AppListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: Arc<dyn AppListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub async fn fire_before_app_create(&self, ctx: &RequestContext, app: &App) -> anyhow::Result<()> {
        for listener in &self.listeners {
            listener.before_app_create(ctx, app).await?;
        }
        Ok(())
    }

    pub async fn fire_after_app_create(&self, ctx: &RequestContext, app: &App) -> anyhow::Result<()> {
        for listener in &self.listeners {
            listener.after_app_create(ctx, app).await?;
        }
        Ok(())
    }
}

/// Logs every provisioned app
pub struct LoggingListener;

#[async_trait]
impl AppListener for LoggingListener {
    async fn before_app_create(&self, ctx: &RequestContext, app: &App) -> anyhow::Result<()> {
        tracing::info!(request_id = %ctx.request_id, "Creating app: {}", app.name);
        Ok(())
    }

    async fn after_app_create(&self, ctx: &RequestContext, app: &App) -> anyhow::Result<()> {
        tracing::info!(request_id = %ctx.request_id, "Created app: {}", app.name);
        Ok(())
    }
}
