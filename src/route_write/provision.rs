use std::sync::Arc;
use thiserror::Error;

use super::context::RequestContext;
use crate::datastore::{Datastore, StoreError};
use crate::hooks::AppListeners;
use crate::models::{App, ValidationError};

/// Stage of app creation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStage {
    BeforeHook,
    Insert,
    AfterHook,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Could not get app from datastore")]
    AppLookupFailed(#[source] StoreError),
    #[error(transparent)]
    InvalidApp(#[from] ValidationError),
    #[error("Could not create app")]
    AppCreateFailed {
        stage: CreateStage,
        #[source]
        source: anyhow::Error,
    },
}

/// Creates the owning app on demand for creating methods
///
/// Lookup and insert are separate datastore calls. Two concurrent requests
/// for the same new app can both miss the lookup; the datastore's insert
/// decides the winner and the loser reports `AppCreateFailed`.
#[derive(Clone)]
pub struct AppProvisioner {
    datastore: Arc<dyn Datastore>,
    listeners: AppListeners,
}

impl AppProvisioner {
    pub fn new(datastore: Arc<dyn Datastore>, listeners: AppListeners) -> Self {
        Self {
            datastore,
            listeners,
        }
    }

    pub async fn ensure_app(&self, ctx: &RequestContext, app_name: &str) -> Result<(), ProvisionError> {
        if !ctx.method.plan().provisions_app {
            return Ok(());
        }

        match self.datastore.get_app(app_name).await {
            Ok(_) => return Ok(()),
            Err(StoreError::AppNotFound) => {}
            Err(err) => {
                tracing::error!(error = %err, "Could not get app from datastore");
                return Err(ProvisionError::AppLookupFailed(err));
            }
        }

        let app = App::named(app_name);
        app.validate().map_err(|err| {
            tracing::error!(error = %err, "Refusing to create invalid app");
            err
        })?;

        self.listeners
            .fire_before_app_create(ctx, &app)
            .await
            .map_err(|err| create_failed(CreateStage::BeforeHook, err))?;

        let app = self
            .datastore
            .insert_app(&app)
            .await
            .map_err(|err| create_failed(CreateStage::Insert, err.into()))?;

        self.listeners
            .fire_after_app_create(ctx, &app)
            .await
            .map_err(|err| create_failed(CreateStage::AfterHook, err))?;

        tracing::info!("Provisioned app: {}", app.name);
        Ok(())
    }
}

fn create_failed(stage: CreateStage, source: anyhow::Error) -> ProvisionError {
    tracing::error!(?stage, error = %source, "Could not create app");
    ProvisionError::AppCreateFailed { stage, source }
}
