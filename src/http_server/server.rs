//! # HTTP Server
//!
//! Main HTTP server combining the replica, layer and health routers.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::config::HttpServerConfig;
use super::health_routes::health_routes;
use super::layer_routes::layer_routes;
use super::replica_routes::replica_routes;
use crate::layer::LayerManager;
use crate::object_storage::ObjectStorageConfig;
use crate::log_event;
use crate::observability::Event;
use crate::replica::ReplicaManager;
use crate::store::StoreHandle;

/// HTTP server for the replica service
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over `store`
    pub fn with_config(
        config: HttpServerConfig,
        store: &StoreHandle,
        object_storage: ObjectStorageConfig,
    ) -> Self {
        let router = Self::build_router(&config, store, object_storage);
        Self { config, router }
    }

    /// Build the combined router with all endpoints
    fn build_router(
        config: &HttpServerConfig,
        store: &StoreHandle,
        object_storage: ObjectStorageConfig,
    ) -> Router {
        let replica_manager = Arc::new(ReplicaManager::new(store, object_storage));
        let layer_manager = Arc::new(LayerManager::new(store));

        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .merge(replica_routes(replica_manager))
            .merge(layer_routes(layer_manager))
            .merge(health_routes(store.health.clone()))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until the process is killed
    pub async fn start(self) -> io::Result<()> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    pub async fn start_with_shutdown<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid socket address {}: {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        log_event!(Event::Serving, addr = %addr);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
