//! Standalone auth service.
//!
//! Exposes a directory backend over HTTP so API instances configured with
//! the `remote` backend can resolve users without their own directory
//! credentials.
//!
//! ```text
//! GET /api/auth/users/{dn} → 200 { dn, givenName, surname, roles }
//!                          → 404 Problem "User Not Found"
//!                          → 500 Problem "Directory Error"
//! GET /actuator/health     → 200 { "status": "UP" }
//! ```

use axum::{
    extract::{OriginalUri, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::directory::{DirectoryError, ResolvedUser, UserDirectory};
use crate::http::request::{self, UuidRequestId, X_REQUEST_ID};
use crate::http::response::{self, ProblemDetail};
use crate::observability::metrics;

/// Build the auth service router over `directory`.
pub fn router(directory: Arc<dyn UserDirectory>) -> Router {
    Router::new()
        .route("/api/auth/users/{dn}", get(get_user))
        .route(
            "/actuator/health",
            get(|| async { Json(json!({ "status": "UP" })) }),
        )
        .fallback(response::not_found)
        .with_state(directory)
        .layer(axum::middleware::from_fn(metrics::track_metrics))
        .layer(CatchPanicLayer::custom(response::handle_panic))
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(TraceLayer::new_for_http().make_span_with(request::make_span::<axum::body::Body>))
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
}

async fn get_user(
    State(directory): State<Arc<dyn UserDirectory>>,
    Path(dn): Path<String>,
    uri: OriginalUri,
) -> Result<Json<ResolvedUser>, ProblemDetail> {
    tracing::debug!(dn = %dn, "Looking up user");

    let dn = dn.trim();
    if dn.is_empty() {
        return Err(ProblemDetail::new(
            StatusCode::BAD_REQUEST,
            "Invalid Argument",
            "DN must not be blank",
        )
        .with_instance(&uri.0));
    }

    match directory.lookup(dn).await {
        Ok(user) => {
            metrics::record_directory_lookup(directory.name(), "found");
            Ok(Json(user))
        }
        Err(e @ DirectoryError::UserNotFound(_)) => {
            metrics::record_directory_lookup(directory.name(), "not_found");
            tracing::warn!("User not found: {}", e);
            Err(
                ProblemDetail::new(StatusCode::NOT_FOUND, "User Not Found", e.to_string())
                    .with_instance(&uri.0),
            )
        }
        Err(DirectoryError::Unavailable(reason)) => {
            metrics::record_directory_lookup(directory.name(), "error");
            tracing::error!(error = %reason, "Directory lookup failed");
            Err(ProblemDetail::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Directory Error",
                "Directory lookup failed",
            )
            .with_instance(&uri.0))
        }
    }
}
