//! Header authentication boundary.
//! Resolves the caller before any protected handler runs.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::response::{unauthorized, ProblemDetail};
use crate::http::server::AppState;
use crate::security::AuthError;

pub async fn authentication_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // 1. Public paths skip authentication entirely
    if state.public_paths.matches(req.uri().path()) {
        return next.run(req).await;
    }

    // 2. Resolve the identity header
    match state.authenticator.authenticate_headers(req.headers()).await {
        Ok(principal) => {
            // 3. Attach the principal for handlers
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(AuthError::DirectoryUnavailable(_)) => ProblemDetail::internal()
            .with_instance(req.uri())
            .into_response(),
        Err(e) => {
            tracing::debug!(path = %req.uri().path(), error = %e, "Rejecting unauthenticated request");
            unauthorized(state.authenticator.header())
        }
    }
}
