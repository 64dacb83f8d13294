//! GatewayLayer - Main Axum integration layer
//!
//! This module provides the main entry point for mounting the gateway
//! endpoints into an Axum application.

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::{create_database_router, create_identity_router};
use crate::database::traits::DatabaseProvider;
use crate::dispatch::Dispatcher;
use crate::identity::{IdentityService, UserStore};

#[cfg(feature = "mysql")]
use crate::database::mysql::MySqlProvider;

/// Main layer for mounting the gateway into an Axum application
///
/// # Example
///
/// ```rust,no_run
/// use axum::Router;
/// use axum_db_gateway::{GatewayLayer, MemoryUserStore};
///
/// let gateway = GatewayLayer::mysql("/admin").with_identity(MemoryUserStore::new());
/// let app: Router = Router::new().merge(gateway.into_router());
/// ```
pub struct GatewayLayer<DB: DatabaseProvider> {
    base_path: String,
    database: Arc<DB>,
    identity: Option<Router>,
}

impl<DB: DatabaseProvider> GatewayLayer<DB> {
    /// Create a new gateway at the given base path
    ///
    /// # Arguments
    ///
    /// * `base_path` - URL prefix for the endpoints (e.g. "/admin", or "" for the root)
    /// * `database` - The database provider implementation
    pub fn new(base_path: impl Into<String>, database: DB) -> Self {
        Self {
            base_path: base_path.into().trim_end_matches('/').to_string(),
            database: Arc::new(database),
            identity: None,
        }
    }

    /// Also serve the registration, login and profile endpoints
    ///
    /// # Arguments
    ///
    /// * `store` - Storage backend for user accounts
    pub fn with_identity<S: UserStore>(mut self, store: S) -> Self {
        self.identity = Some(create_identity_router(IdentityService::new(store)));
        self
    }

    /// Convert into an Axum Router that can be merged
    ///
    /// The returned router includes:
    /// - Database endpoints at `{base_path}/api/database/*`
    /// - Identity endpoints at `{base_path}/api/{register,login,profile/update}` if enabled
    /// - Permissive CORS middleware
    pub fn into_router(self) -> Router {
        let mut api_router = create_database_router(Dispatcher::new(self.database));
        if let Some(identity_router) = self.identity {
            api_router = api_router.merge(identity_router);
        }

        Router::new()
            .nest(&format!("{}/api", self.base_path), api_router)
            .layer(CorsLayer::permissive())
    }
}

#[cfg(feature = "mysql")]
impl GatewayLayer<MySqlProvider> {
    /// Create a new gateway for MySQL / MariaDB targets
    ///
    /// # Arguments
    ///
    /// * `base_path` - URL prefix for the endpoints
    pub fn mysql(base_path: impl Into<String>) -> Self {
        Self::new(base_path, MySqlProvider::new())
    }
}
