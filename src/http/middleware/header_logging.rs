//! Request/response header dump at DEBUG level.
//!
//! Runs at most once per request: a marker in the request extensions stops
//! a second pass when the middleware is stacked or re-entered.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::fmt::Write;

use crate::http::server::AppState;

/// Marker inserted once headers have been logged.
#[derive(Debug, Clone, Copy)]
pub struct HeadersLogged;

fn write_headers(out: &mut String, marker: char, headers: &HeaderMap) {
    for name in headers.keys() {
        let values: Vec<String> = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();
        let _ = write!(out, "\n{} {}: {}", marker, name, values.join(", "));
    }
}

/// Render a request line and its headers.
///
/// ```text
/// Incoming request
/// > GET /api/books?page=1 HTTP/1.1
/// > x-dn: cn=John Doe,dc=corp
/// ```
pub fn format_request(
    message: Option<&str>,
    method: &Method,
    path: &str,
    query: Option<&str>,
    headers: &HeaderMap,
) -> String {
    let mut out = String::new();
    if let Some(message) = message {
        out.push_str(message);
        out.push('\n');
    }
    let _ = write!(out, "> {} {}", method, path);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        let _ = write!(out, "?{}", query);
    }
    out.push_str(" HTTP/1.1");
    write_headers(&mut out, '>', headers);
    out
}

/// Render a status line and response headers.
pub fn format_response(message: Option<&str>, status: StatusCode, headers: &HeaderMap) -> String {
    let mut out = String::new();
    if let Some(message) = message {
        out.push_str(message);
        out.push('\n');
    }
    let _ = write!(out, "< HTTP/1.1 {}", status);
    write_headers(&mut out, '<', headers);
    out
}

pub async fn header_logging_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if req.extensions().get::<HeadersLogged>().is_some()
        || !tracing::enabled!(tracing::Level::DEBUG)
        || state.public_paths.matches(req.uri().path())
    {
        return next.run(req).await;
    }
    req.extensions_mut().insert(HeadersLogged);

    tracing::debug!(
        "{}",
        format_request(
            Some("Incoming request"),
            req.method(),
            req.uri().path(),
            req.uri().query(),
            req.headers(),
        )
    );

    let response = next.run(req).await;

    tracing::debug!(
        "{}",
        format_response(Some("Outgoing response"), response.status(), response.headers())
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::lifecycle::build_app_state;
    use axum::http::HeaderValue;
    use axum::{middleware, routing::get, Router};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;
    use tracing_subscriber::fmt::MakeWriter;

    /// Log sink shared between the subscriber and the test.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// The middleware layered twice, as when the chain is re-entered.
    async fn doubly_logged_router() -> Router {
        let state = build_app_state(AppConfig::default()).await.unwrap();
        Router::new()
            .route("/api/books", get(|| async { "[]" }))
            .route("/actuator/health", get(|| async { "UP" }))
            .layer(middleware::from_fn_with_state(state.clone(), header_logging_middleware))
            .layer(middleware::from_fn_with_state(state.clone(), header_logging_middleware))
            .with_state(state)
    }

    async fn send(router: Router, path: &str) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(captured.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let response = router
            .oneshot(
                Request::get(path)
                    .header("x-dn", "cn=John Doe,dc=corp")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        captured.text()
    }

    #[tokio::test]
    async fn test_headers_logged_once_when_stacked() {
        let logs = send(doubly_logged_router().await, "/api/books").await;

        assert_eq!(logs.matches("> GET /api/books HTTP/1.1").count(), 1);
        assert_eq!(logs.matches("> x-dn: cn=John Doe,dc=corp").count(), 1);
        assert_eq!(logs.matches("< HTTP/1.1 200 OK").count(), 1);
    }

    #[tokio::test]
    async fn test_public_paths_are_not_logged() {
        let logs = send(doubly_logged_router().await, "/actuator/health").await;

        assert!(!logs.contains("> GET"));
        assert!(!logs.contains("< HTTP/1.1"));
    }

    #[test]
    fn test_request_format() {
        let mut headers = HeaderMap::new();
        headers.insert("x-dn", HeaderValue::from_static("cn=John Doe,dc=corp"));
        headers.append("accept", HeaderValue::from_static("application/json"));
        headers.append("accept", HeaderValue::from_static("text/plain"));

        let text = format_request(
            Some("Incoming request"),
            &Method::GET,
            "/api/books",
            Some("page=1"),
            &headers,
        );

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Incoming request");
        assert_eq!(lines[1], "> GET /api/books?page=1 HTTP/1.1");
        assert!(lines.contains(&"> x-dn: cn=John Doe,dc=corp"));
        assert!(lines.contains(&"> accept: application/json, text/plain"));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_request_format_without_message_or_query() {
        let text = format_request(None, &Method::DELETE, "/api/books/1", None, &HeaderMap::new());
        assert_eq!(text, "> DELETE /api/books/1 HTTP/1.1");
    }

    #[test]
    fn test_response_format() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let text = format_response(None, StatusCode::CREATED, &headers);
        assert_eq!(text, "< HTTP/1.1 201 Created\n< content-type: application/json");
    }
}
