//! Garage Dashboard Gateway
//!
//! A resilient REST gateway: every call goes to the remote garage API first
//! and falls back to a deterministic local dataset persisted in SQLite.

mod api;
mod config;
mod errors;
mod models;
mod remote;
mod resources;
mod service;
mod store;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    routing::{delete, get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use errors::AppError;
use models::{Campaign, Role, User};
use remote::RemoteClient;
use service::{ResourceService, StatisticsService};
use store::{KeyValueStore, MemoryStore, SqliteStore};

/// Application state shared across all handlers.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub campaigns: Arc<ResourceService<Campaign>>,
    pub roles: Arc<ResourceService<Role>>,
    pub users: Arc<ResourceService<User>>,
    pub statistics: Arc<StatisticsService>,
}

impl AppState {
    /// Wire every service to the remote API and the shared storage port.
    pub fn new(config: &Config, storage: Arc<dyn KeyValueStore>) -> Result<Self, AppError> {
        let remote = RemoteClient::new(&config.remote_base_url, config.remote_timeout)?;
        let persistence = config.persistence;

        let campaigns = Arc::new(ResourceService::<Campaign>::new(
            remote.clone(),
            storage.clone(),
            persistence,
        ));
        let roles = Arc::new(ResourceService::<Role>::new(
            remote.clone(),
            storage.clone(),
            persistence,
        ));
        let users = Arc::new(ResourceService::<User>::new(
            remote.clone(),
            storage.clone(),
            persistence,
        ));
        let statistics = Arc::new(StatisticsService::new(
            remote,
            storage,
            persistence,
            campaigns.clone(),
            roles.clone(),
            users.clone(),
        ));

        Ok(Self {
            campaigns,
            roles,
            users,
            statistics,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting garage dashboard gateway");
    tracing::info!("Remote API: {}", config.remote_base_url);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize fallback storage
    let storage: Arc<dyn KeyValueStore> = match &config.storage_path {
        Some(path) => {
            tracing::info!("Fallback store: {:?}", path);
            Arc::new(SqliteStore::open(path).await?)
        }
        None => {
            tracing::warn!("Fallback store is in memory; local changes are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(&config, storage)?;

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Campaigns
        .route(
            "/campaigns",
            get(api::list::<Campaign>).post(api::create::<Campaign>),
        )
        .route("/campaigns/export", get(api::export::<Campaign>))
        .route("/campaigns/cache", delete(api::clear_cache::<Campaign>))
        .route("/campaigns/bulk/update", post(api::bulk_update::<Campaign>))
        .route("/campaigns/bulk/delete", post(api::bulk_delete::<Campaign>))
        .route("/campaigns/bulk/activate", post(api::bulk_activate_campaigns))
        .route(
            "/campaigns/bulk/deactivate",
            post(api::bulk_deactivate_campaigns),
        )
        .route(
            "/campaigns/{id}",
            get(api::get::<Campaign>)
                .put(api::update::<Campaign>)
                .delete(api::delete::<Campaign>),
        )
        .route("/campaigns/{id}/activate", patch(api::activate_campaign))
        .route("/campaigns/{id}/deactivate", patch(api::deactivate_campaign))
        // Roles
        .route("/roles", get(api::list::<Role>).post(api::create::<Role>))
        .route("/roles/permissions", get(api::list_permissions))
        .route("/roles/export", get(api::export::<Role>))
        .route("/roles/cache", delete(api::clear_cache::<Role>))
        .route("/roles/bulk/update", post(api::bulk_update::<Role>))
        .route("/roles/bulk/delete", post(api::bulk_delete::<Role>))
        .route(
            "/roles/{id}",
            get(api::get::<Role>)
                .put(api::update::<Role>)
                .delete(api::delete::<Role>),
        )
        // Users
        .route("/users", get(api::list::<User>).post(api::create::<User>))
        .route("/users/export", get(api::export::<User>))
        .route("/users/cache", delete(api::clear_cache::<User>))
        .route("/users/bulk/update", post(api::bulk_update::<User>))
        .route("/users/bulk/delete", post(api::bulk_delete::<User>))
        .route("/users/bulk/activate", post(api::bulk_activate_users))
        .route("/users/bulk/deactivate", post(api::bulk_deactivate_users))
        .route(
            "/users/{id}",
            get(api::get::<User>)
                .put(api::update::<User>)
                .delete(api::delete::<User>),
        )
        .route("/users/{id}/status", patch(api::set_user_status))
        // Statistics
        .route("/statistics/overview", get(api::get_overview))
        .route("/statistics/revenue", get(api::get_revenue));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
