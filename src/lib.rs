use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

use config::{Config, StorageBackend};
use error::AppResult;
use services::{auth::AuthService, cache::ContactCache, contacts::ContactsService};
use storage::{ContactStore, MemoryStore, PgStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub contacts: Arc<dyn ContactStore>,
    pub users: Arc<dyn UserStore>,
    pub cache: Arc<ContactCache>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(contacts: Arc<dyn ContactStore>, users: Arc<dyn UserStore>, config: Config) -> Self {
        Self {
            contacts,
            users,
            cache: Arc::new(ContactCache::new(config.cache.ttl)),
            config: Arc::new(config),
        }
    }

    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store, config)
    }

    /// Builds state for the configured storage backend.
    pub async fn connect(config: Config) -> AppResult<Self> {
        match config.storage {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Ok(Self::in_memory(config))
            }
            StorageBackend::Postgres => {
                let store = Arc::new(PgStore::connect(&config).await?);
                Ok(Self::new(store.clone(), store, config))
            }
        }
    }

    pub fn contacts_service(&self) -> ContactsService {
        ContactsService::new(self.contacts.clone(), self.cache.clone())
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.users.clone(), self.config.clone())
    }
}

pub fn create_app(state: AppState) -> Router {
    let max_body_bytes = state.config.server.max_body_bytes;

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::router::create_router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
