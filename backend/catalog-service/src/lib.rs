//! Video title catalog REST API.
//!
//! Users register and log in for a bearer token, then browse, filter and
//! search the catalog. The catalog is filled from CSV exports through
//! `/load-data` or the `catalog-load` binary.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod telemetry;
pub mod validators;

use std::sync::Arc;

use axum::Router;
use crypto_core::jwt::JwtKeys;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::db::memory::{MemoryContentStore, MemoryUserStore};
use crate::db::{ContentStore, Database, PgContentStore, PgUserStore, UserStore};
use crate::services::{AuthService, CatalogService, DataLoader};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub content: Arc<dyn ContentStore>,
    pub jwt: Arc<JwtKeys>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        content: Arc<dyn ContentStore>,
        config: Config,
    ) -> anyhow::Result<Self> {
        let jwt = JwtKeys::new(&config.jwt.secret, &config.jwt.algorithm, config.token_ttl())?;
        Ok(Self {
            users,
            content,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        })
    }

    /// State backed by PostgreSQL stores sharing one pool
    pub fn postgres(db: &Database, config: Config) -> anyhow::Result<Self> {
        Self::new(
            Arc::new(PgUserStore::new(db.pg.clone())),
            Arc::new(PgContentStore::new(db.pg.clone())),
            config,
        )
    }

    /// State backed by empty in-process stores
    pub fn in_memory(config: Config) -> anyhow::Result<Self> {
        Self::new(
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryContentStore::new()),
            config,
        )
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.users.clone(), self.jwt.clone())
    }

    pub fn catalog_service(&self) -> CatalogService {
        CatalogService::new(self.content.clone())
    }

    pub fn data_loader(&self) -> DataLoader {
        DataLoader::new(self.content.clone(), self.config.catalog.import_batch_size)
    }
}

/// Build the full application router with CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    api::routes(state.clone())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
