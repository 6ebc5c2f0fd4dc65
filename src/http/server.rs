//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Bind server to listener
//! - Shut down gracefully when signalled

use axum::{
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::catalog::CatalogService;
use crate::config::CatalogConfig;
use crate::http::handlers;
use crate::http::request::make_request_span;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
}

/// HTTP front end for the catalog.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: CatalogConfig, catalog: CatalogService) -> Self {
        let state = AppState { catalog };
        let router = Self::build_router(&config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &CatalogConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/courses", get(handlers::list_courses).post(handlers::add_course))
            .route(
                "/courses/{id}",
                get(handlers::get_course).delete(handlers::delete_course),
            )
            .route("/metrics/snapshot", get(handlers::metrics_snapshot))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let service = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
