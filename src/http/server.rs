//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, authentication)
//! - Serve the actuator endpoints
//! - Bind server to listener and stop on shutdown

use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::books::handlers;
use crate::books::BookService;
use crate::config::AppConfig;
use crate::http::middleware::{authentication_middleware, header_logging_middleware};
use crate::http::request::{self, UuidRequestId, X_REQUEST_ID};
use crate::http::response;
use crate::observability::metrics;
use crate::security::{Authenticator, PublicPaths};

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub authenticator: Arc<Authenticator>,
    pub public_paths: Arc<PublicPaths>,
    pub books: Arc<BookService>,
    pub metrics: Option<PrometheusHandle>,
}

/// HTTP server for the book API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server around fully built state.
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(state: AppState) -> Router {
        let request_timeout = Duration::from_secs(state.config.timeouts.request_secs);
        let max_body_size = state.config.security.max_body_size;

        let api = Router::new()
            .route(
                "/api/books",
                get(handlers::list_books).post(handlers::create_book),
            )
            .route(
                "/api/books/{id}",
                get(handlers::get_book)
                    .put(handlers::update_book)
                    .delete(handlers::delete_book),
            );

        let actuator = Router::new()
            .route("/actuator/health", get(health))
            .route("/actuator/prometheus", get(prometheus));

        Router::new()
            .merge(api)
            .merge(actuator)
            .fallback(response::not_found)
            .layer(middleware::from_fn_with_state(
                state.clone(),
                authentication_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                header_logging_middleware,
            ))
            .layer(middleware::from_fn(metrics::track_metrics))
            .with_state(state)
            .layer(CatchPanicLayer::custom(response::handle_panic))
            .layer(RequestBodyLimitLayer::new(max_body_size))
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(request::make_span::<axum::body::Body>))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// The router, for serving over TLS or in-process tests.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "UP" }))
}

async fn prometheus(State(state): State<AppState>) -> Response {
    match (&state.metrics, state.config.observability.metrics_enabled) {
        (Some(handle), true) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
