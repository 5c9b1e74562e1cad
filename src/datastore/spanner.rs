use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use gcloud_gax::grpc::{Code, Status};
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig, Error as ClientError};
use gcloud_spanner::mutation::{insert, update};
use gcloud_spanner::statement::Statement;
use gcloud_spanner::value::CommitTimestamp;
use std::sync::Arc;

use super::{Datastore, StoreError, UpdateMode, apply_update};
use crate::config::SpannerConfig;
use crate::models::{App, Route};

const APPS_DDL: &str = r#"
CREATE TABLE apps (
    name STRING(30) NOT NULL,
    data JSON NOT NULL,
    created_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (name)
"#;

const ROUTES_DDL: &str = r#"
CREATE TABLE routes (
    app_name STRING(30) NOT NULL,
    path STRING(MAX) NOT NULL,
    data JSON NOT NULL,
    created_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
    updated_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (app_name, path),
  INTERLEAVE IN PARENT apps ON DELETE CASCADE
"#;

/// Tables in creation order; routes are interleaved in apps
const TABLES: [(&str, &str); 2] = [("apps", APPS_DDL), ("routes", ROUTES_DDL)];

/// Spanner-backed datastore, shareable across async handlers
///
/// Records are stored as JSON documents keyed by their identity columns.
/// Duplicate detection relies on Spanner's insert semantics: a second insert
/// of the same key fails with `AlreadyExists`, and inserting a route whose
/// parent app is missing fails with `NotFound`.
#[derive(Clone)]
pub struct SpannerDatastore {
    inner: Arc<Client>,
}

impl SpannerDatastore {
    /// Create a new Spanner datastore from configuration
    ///
    /// The gcloud-spanner library automatically detects the
    /// SPANNER_EMULATOR_HOST environment variable and connects to
    /// the emulator when set, or production Spanner otherwise.
    ///
    /// The instance, database and tables are created if they don't exist.
    pub async fn from_config(config: &SpannerConfig) -> Result<Self> {
        auto_provision(config).await?;

        let database_path = config.database_path();

        match &config.emulator_host {
            Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
            None => tracing::info!("Connecting to production Spanner"),
        }

        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
        })
    }

    /// Read an app document by name
    ///
    /// # Returns
    /// * `Ok(Some(app))` - App found and decoded
    /// * `Ok(None)` - No row for this name
    ///
    /// # Errors
    /// Returns an error if the Spanner query fails or if JSON deserialization fails
    async fn read_app(&self, name: &str) -> Result<Option<App>> {
        let mut statement = Statement::new("SELECT data FROM apps WHERE name = @name");
        statement.add_param("name", &name.to_string());

        let data = self.query_data(statement).await?;
        data.map(|data| serde_json::from_str(&data).context("Failed to deserialize app"))
            .transpose()
    }

    /// Read a route document by its `(app_name, path)` key
    ///
    /// # Arguments
    /// * `app_name` - Owning app
    /// * `path` - Cleaned route path
    ///
    /// # Returns
    /// * `Ok(Some(route))` - Route found and decoded
    /// * `Ok(None)` - No row for this key
    ///
    /// # Errors
    /// Returns an error if the Spanner query fails or if JSON deserialization fails
    async fn read_route(&self, app_name: &str, path: &str) -> Result<Option<Route>> {
        let mut statement = Statement::new(
            "SELECT data FROM routes WHERE app_name = @app_name AND path = @path",
        );
        statement.add_param("app_name", &app_name.to_string());
        statement.add_param("path", &path.to_string());

        let data = self.query_data(statement).await?;
        data.map(|data| serde_json::from_str(&data).context("Failed to deserialize route"))
            .transpose()
    }

    /// Run a single-row query and return its `data` column
    async fn query_data(&self, statement: Statement) -> Result<Option<String>> {
        let mut tx = self
            .inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query Spanner")?;

        match result_set.next().await? {
            Some(row) => Ok(Some(row.column_by_name::<String>("data")?)),
            None => Ok(None),
        }
    }
}

fn grpc_code(err: &ClientError) -> Option<Code> {
    match err {
        ClientError::GRPC(status) => Some(status.code()),
        _ => None,
    }
}

#[async_trait]
impl Datastore for SpannerDatastore {
    async fn get_app(&self, name: &str) -> Result<App, StoreError> {
        self.read_app(name).await?.ok_or(StoreError::AppNotFound)
    }

    async fn insert_app(&self, app: &App) -> Result<App, StoreError> {
        let mut app = app.clone();
        app.created_at = Some(Utc::now());
        let data = serde_json::to_string(&app).context("Failed to serialize app")?;

        let mutation = insert(
            "apps",
            &["name", "data", "created_at"],
            &[&app.name, &data, &CommitTimestamp::new()],
        );

        match self.inner.apply(vec![mutation]).await {
            Ok(_) => {
                tracing::debug!("Inserted app: {}", app.name);
                Ok(app)
            }
            Err(err) if grpc_code(&err) == Some(Code::AlreadyExists) => {
                Err(StoreError::AppAlreadyExists)
            }
            Err(err) => Err(anyhow::Error::new(err)
                .context("Failed to insert app into Spanner")
                .into()),
        }
    }

    async fn get_route(&self, app_name: &str, path: &str) -> Result<Route, StoreError> {
        self.read_route(app_name, path)
            .await?
            .ok_or(StoreError::RouteNotFound)
    }

    async fn insert_route(&self, route: &Route) -> Result<Route, StoreError> {
        let now = Utc::now();
        let mut route = route.clone();
        route.created_at = Some(now);
        route.updated_at = Some(now);
        let data = serde_json::to_string(&route).context("Failed to serialize route")?;

        let mutation = insert(
            "routes",
            &["app_name", "path", "data", "created_at", "updated_at"],
            &[
                &route.app_name,
                &route.path,
                &data,
                &CommitTimestamp::new(),
                &CommitTimestamp::new(),
            ],
        );

        match self.inner.apply(vec![mutation]).await {
            Ok(_) => {
                tracing::debug!("Inserted route: {}{}", route.app_name, route.path);
                Ok(route)
            }
            Err(err) if grpc_code(&err) == Some(Code::AlreadyExists) => {
                Err(StoreError::RouteAlreadyExists)
            }
            Err(err) if grpc_code(&err) == Some(Code::NotFound) => Err(StoreError::AppNotFound),
            Err(err) => Err(anyhow::Error::new(err)
                .context("Failed to insert route into Spanner")
                .into()),
        }
    }

    async fn update_route(&self, route: &Route, mode: UpdateMode) -> Result<Route, StoreError> {
        // Read and write are separate calls; a concurrent writer between them wins last.
        let mut stored = self
            .read_route(&route.app_name, &route.path)
            .await?
            .ok_or(StoreError::RouteNotFound)?;
        apply_update(&mut stored, route, mode);
        let data = serde_json::to_string(&stored).context("Failed to serialize route")?;

        let mutation = update(
            "routes",
            &["app_name", "path", "data", "updated_at"],
            &[&stored.app_name, &stored.path, &data, &CommitTimestamp::new()],
        );

        match self.inner.apply(vec![mutation]).await {
            Ok(_) => {
                tracing::debug!("Updated route ({:?}): {}{}", mode, stored.app_name, stored.path);
                Ok(stored)
            }
            Err(err) if grpc_code(&err) == Some(Code::NotFound) => Err(StoreError::RouteNotFound),
            Err(err) => Err(anyhow::Error::new(err)
                .context("Failed to update route in Spanner")
                .into()),
        }
    }

    /// Perform a health check by executing a simple query
    ///
    /// A `SELECT 1` confirms the session pool can reach the database.
    async fn health_check(&self) -> Result<(), StoreError> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self
            .inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await.context("Failed to read health check result")?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results").into())
        }
    }
}

/// Automatically provision Spanner instance, database, and tables
///
/// Enables zero-setup local development with the emulator.
async fn auto_provision(config: &SpannerConfig) -> Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin_client = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", config.project);
    let instance_path = format!("{}/instances/{}", project_path, config.instance);
    let database_path = config.database_path();

    ensure_instance_exists(&admin_client, config, &project_path, &instance_path).await?;
    ensure_database_exists(&admin_client, &instance_path, &database_path).await?;
    ensure_tables_exist(&admin_client, &database_path).await?;

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

/// Run `create` when `lookup` reports the resource as missing
///
/// Any other lookup failure is returned without creating anything.
async fn get_or_create<T>(
    kind: &str,
    path: &str,
    lookup: std::result::Result<T, Status>,
    create: impl Future<Output = Result<()>>,
) -> Result<()> {
    match lookup {
        Ok(_) => {
            tracing::info!("{} already exists: {}", kind, path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("{} not found, creating: {}", kind, path);
            create.await?;
            tracing::info!("{} created: {}", kind, path);
            Ok(())
        }
        Err(status) => Err(anyhow::anyhow!(
            "Failed to look up {} {}: {}",
            kind,
            path,
            status.message()
        )),
    }
}

async fn ensure_instance_exists(
    admin_client: &AdminClient,
    config: &SpannerConfig,
    project_path: &str,
    instance_path: &str,
) -> Result<()> {
    let lookup = admin_client
        .instance()
        .get_instance(
            GetInstanceRequest {
                name: instance_path.to_string(),
                field_mask: None,
            },
            None,
        )
        .await;

    get_or_create("Instance", instance_path, lookup, async {
        let instance_config = match config.emulator_host {
            Some(_) => format!("{}/instanceConfigs/emulator-config", project_path),
            None => format!("{}/instanceConfigs/regional-us-central1", project_path),
        };
        let request = CreateInstanceRequest {
            parent: project_path.to_string(),
            instance_id: config.instance.clone(),
            instance: Some(Instance {
                name: instance_path.to_string(),
                config: instance_config,
                display_name: format!("fnroutes {}", config.instance),
                node_count: 1,
                ..Default::default()
            }),
        };

        admin_client
            .instance()
            .create_instance(request, None)
            .await
            .context("Failed to start instance creation")?
            .wait(None)
            .await
            .context("Failed to create instance")?;
        Ok(())
    })
    .await
}

async fn ensure_database_exists(
    admin_client: &AdminClient,
    instance_path: &str,
    database_path: &str,
) -> Result<()> {
    let lookup = admin_client
        .database()
        .get_database(
            GetDatabaseRequest {
                name: database_path.to_string(),
            },
            None,
        )
        .await;

    get_or_create("Database", database_path, lookup, async {
        let database_id = database_path
            .rsplit('/')
            .next()
            .context("Invalid database path")?;
        let request = CreateDatabaseRequest {
            parent: instance_path.to_string(),
            create_statement: format!("CREATE DATABASE `{}`", database_id),
            extra_statements: vec![],
            encryption_config: None,
            // GoogleSQL dialect
            database_dialect: 1,
            proto_descriptors: vec![],
        };

        admin_client
            .database()
            .create_database(request, None)
            .await
            .context("Failed to start database creation")?
            .wait(None)
            .await
            .context("Failed to create database")?;
        Ok(())
    })
    .await
}

/// Create whichever of the `apps` / `routes` tables is missing
async fn ensure_tables_exist(admin_client: &AdminClient, database_path: &str) -> Result<()> {
    let get_ddl_request = GetDatabaseDdlRequest {
        database: database_path.to_string(),
    };

    let existing = admin_client
        .database()
        .get_database_ddl(get_ddl_request, None)
        .await
        .context("Failed to get database DDL")?
        .into_inner()
        .statements;

    let missing: Vec<String> = TABLES
        .iter()
        .filter(|(name, _)| {
            let plain = format!("CREATE TABLE {} ", name);
            let quoted = format!("CREATE TABLE `{}`", name);
            !existing
                .iter()
                .any(|stmt| stmt.contains(&plain) || stmt.contains(&quoted))
        })
        .map(|(name, ddl)| {
            tracing::info!("Table '{}' not found, creating...", name);
            ddl.trim().to_string()
        })
        .collect();

    if missing.is_empty() {
        tracing::info!("Tables 'apps' and 'routes' already exist");
        return Ok(());
    }

    let update_request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements: missing,
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin_client
        .database()
        .update_database_ddl(update_request, None)
        .await
        .context("Failed to start table creation")?;

    operation
        .wait(None)
        .await
        .context("Failed to create tables")?;

    tracing::info!("Tables created successfully");
    Ok(())
}
