//! The route write pipeline behind POST, PUT and PATCH.
//!
//! Every request runs bind → provision app → upsert route → cache refresh →
//! respond, and the first failing stage ends the request. What each stage
//! does for a given method is described by [`WriteMethod::plan`].

mod bind;
mod context;
mod method;
mod provision;
mod upsert;

pub use bind::{BindError, bind};
pub use context::{RequestContext, clean_path};
pub use method::WriteMethod;
pub use provision::{AppProvisioner, CreateStage, ProvisionError};
pub use upsert::{Outcome, RouteUpserter};

use std::sync::Arc;
use tracing::Instrument;

use crate::cache::RouteCache;
use crate::datastore::Datastore;
use crate::error::ApiError;
use crate::hooks::AppListeners;
use crate::models::{Route, RouteResponse};

/// Pairs the outcome message with the persisted route
pub fn build_response(outcome: Outcome, route: Route) -> RouteResponse {
    RouteResponse {
        message: outcome.message().to_string(),
        route,
    }
}

pub struct RouteWriter {
    provisioner: AppProvisioner,
    upserter: RouteUpserter,
    cache: Arc<dyn RouteCache>,
}

impl RouteWriter {
    pub fn new(
        datastore: Arc<dyn Datastore>,
        listeners: AppListeners,
        cache: Arc<dyn RouteCache>,
    ) -> Self {
        Self {
            provisioner: AppProvisioner::new(datastore.clone(), listeners),
            upserter: RouteUpserter::new(datastore),
            cache,
        }
    }

    pub async fn write(&self, ctx: &RequestContext, body: &[u8]) -> Result<RouteResponse, ApiError> {
        async {
            let route = bind(body, ctx)?;
            self.provisioner.ensure_app(ctx, &route.app_name).await?;
            let (outcome, stored) = self.upserter.upsert(ctx, &route).await?;
            self.cache.refresh(&stored);
            Ok::<_, ApiError>(build_response(outcome, stored))
        }
        .instrument(ctx.span.clone())
        .await
    }
}
