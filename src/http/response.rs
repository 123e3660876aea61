//! Error responses.
//!
//! # Responsibilities
//! - Render failures as RFC 7807 Problem Details
//! - Render the fixed 401 body of the header authentication boundary
//! - Turn panics and unknown routes into uniform responses
//!
//! # Design Decisions
//! - 5xx bodies carry a generic message; the detail goes to the log only
//! - `error` repeats the reason phrase so clients can switch on it

use axum::http::{header, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::any::Any;

pub const PROBLEM_JSON: &str = "application/problem+json";

/// Generic message for every 5xx body.
pub const GENERIC_ERROR_DETAIL: &str = "An unexpected error occurred";

/// RFC 7807 Problem Details body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDetail {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub error: String,
}

impl ProblemDetail {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            problem_type: "about:blank".to_string(),
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
            instance: None,
            error: status.canonical_reason().unwrap_or("Error").to_string(),
        }
    }

    /// The catch-all 500.
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            GENERIC_ERROR_DETAIL,
        )
    }

    pub fn with_instance(mut self, uri: &Uri) -> Self {
        self.instance = Some(uri.path().to_string());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ProblemDetail {
    fn into_response(self) -> Response {
        let body = serde_json::to_vec(&self).unwrap_or_default();
        (
            self.status_code(),
            [(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON))],
            body,
        )
            .into_response()
    }
}

/// Body of the 401 returned when the identity header is missing or unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnauthorizedBody {
    pub error: String,
    pub message: String,
}

/// 401 naming the identity header the caller should have sent.
pub fn unauthorized(header: &HeaderName) -> Response {
    let body = UnauthorizedBody {
        error: "Unauthorized".to_string(),
        message: format!("Missing or invalid {} header", header),
    };
    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ProblemDetail {
    ProblemDetail::new(
        StatusCode::NOT_FOUND,
        "Not Found",
        format!("No handler for {}", uri.path()),
    )
    .with_instance(&uri)
}

/// Convert a handler panic into the generic 500.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");
    ProblemDetail::internal().into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_problem_detail_shape() {
        let uri: Uri = "/api/books/9999".parse().unwrap();
        let response = ProblemDetail::new(
            StatusCode::NOT_FOUND,
            "Book Not Found",
            "Book not found with id: 9999",
        )
        .with_instance(&uri)
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], PROBLEM_JSON);

        let json = body_json(response).await;
        assert_eq!(json["type"], "about:blank");
        assert_eq!(json["title"], "Book Not Found");
        assert_eq!(json["status"], 404);
        assert_eq!(json["detail"], "Book not found with id: 9999");
        assert_eq!(json["instance"], "/api/books/9999");
        assert_eq!(json["error"], "Not Found");
    }

    #[tokio::test]
    async fn test_unauthorized_body() {
        let response = unauthorized(&HeaderName::from_static("x-username"));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Unauthorized");
        assert_eq!(json["message"], "Missing or invalid x-username header");
    }

    #[tokio::test]
    async fn test_panic_is_generic() {
        let response = handle_panic(Box::new("database password is hunter2"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["detail"], GENERIC_ERROR_DETAIL);
    }
}
