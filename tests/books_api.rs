//! End-to-end tests of the book API behind header authentication.

use acme_api::config::AppConfig;
use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

use common::{READER_DN, WRITER_DN};

fn book(isbn: &str) -> Value {
    json!({
        "title": "The Pragmatic Programmer",
        "author": "Andrew Hunt",
        "isbn": isbn,
        "publicationYear": 1999
    })
}

#[tokio::test]
async fn test_create_read_update_delete() {
    let (addr, shutdown) = common::start_api(AppConfig::default()).await;
    let client = common::client();
    let base = format!("http://{}/api/books", addr);

    // Create
    let res = client
        .post(&base)
        .header("x-dn", WRITER_DN)
        .json(&book("1234567890"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["createdBy"], WRITER_DN);
    assert!(created["createdAt"].is_string());
    assert!(created["updatedBy"].is_null());

    // Read
    let res = client
        .get(format!("{}/{}", base, id))
        .header("x-dn", WRITER_DN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched["isbn"], "1234567890");

    // Update
    let mut changed = book("1234567890");
    changed["title"] = json!("The Pragmatic Programmer, 20th Anniversary Edition");
    changed["publicationYear"] = json!(2019);
    let res = client
        .put(format!("{}/{}", base, id))
        .header("x-dn", WRITER_DN)
        .json(&changed)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["publicationYear"], 2019);
    assert_eq!(updated["updatedBy"], WRITER_DN);

    // Delete
    let res = client
        .delete(format!("{}/{}", base, id))
        .header("x-dn", WRITER_DN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(format!("{}/{}", base, id))
        .header("x-dn", WRITER_DN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    shutdown.trigger();
}

#[tokio::test]
async fn test_duplicate_isbn_is_rejected() {
    let (addr, shutdown) = common::start_api(AppConfig::default()).await;
    let client = common::client();
    let base = format!("http://{}/api/books", addr);

    for expected in [StatusCode::CREATED, StatusCode::BAD_REQUEST] {
        let res = client
            .post(&base)
            .header("x-dn", WRITER_DN)
            .json(&book("1234567890"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), expected);

        if expected == StatusCode::BAD_REQUEST {
            assert_eq!(
                res.headers()["content-type"],
                "application/problem+json"
            );
            let problem: Value = res.json().await.unwrap();
            assert_eq!(problem["title"], "Book Already Exists");
            assert_eq!(problem["detail"], "Book with ISBN '1234567890' already exists");
            assert_eq!(problem["instance"], "/api/books");
        }
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_update_missing_book() {
    let (addr, shutdown) = common::start_api(AppConfig::default()).await;

    let res = common::client()
        .put(format!("http://{}/api/books/9999", addr))
        .header("x-dn", WRITER_DN)
        .json(&book("5555555555"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let problem: Value = res.json().await.unwrap();
    assert_eq!(problem["title"], "Book Not Found");
    assert_eq!(problem["error"], "Not Found");
    assert_eq!(problem["detail"], "Book not found with id: 9999");

    shutdown.trigger();
}

#[tokio::test]
async fn test_validation_messages_are_joined() {
    let (addr, shutdown) = common::start_api(AppConfig::default()).await;

    let res = common::client()
        .post(format!("http://{}/api/books", addr))
        .header("x-dn", WRITER_DN)
        .json(&json!({ "title": "", "author": "Someone", "isbn": "42" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let problem: Value = res.json().await.unwrap();
    assert_eq!(problem["title"], "Validation Failed");
    assert_eq!(
        problem["detail"],
        "title: must not be blank, publicationYear: must not be null"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_missing_header_returns_401() {
    let (addr, shutdown) = common::start_api(AppConfig::default()).await;

    let res = common::client()
        .get(format!("http://{}/api/books", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "error": "Unauthorized", "message": "Missing or invalid x-dn header" })
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_blank_header_returns_401() {
    let (addr, shutdown) = common::start_api(AppConfig::default()).await;

    let res = common::client()
        .get(format!("http://{}/api/books", addr))
        .header("x-dn", "   ")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    shutdown.trigger();
}

#[tokio::test]
async fn test_read_only_user_cannot_write() {
    let (addr, shutdown) = common::start_api(AppConfig::default()).await;
    let client = common::client();
    let base = format!("http://{}/api/books", addr);

    let res = client
        .get(&base)
        .header("x-dn", READER_DN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(&base)
        .header("x-dn", READER_DN)
        .json(&book("1111111111"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let problem: Value = res.json().await.unwrap();
    assert_eq!(problem["title"], "Authorization Denied");
    assert_eq!(problem["error"], "Forbidden");

    shutdown.trigger();
}

#[tokio::test]
async fn test_identity_matches_case_insensitively() {
    let (addr, shutdown) = common::start_api(AppConfig::default()).await;

    let res = common::client()
        .get(format!("http://{}/api/books", addr))
        .header("x-dn", WRITER_DN.to_uppercase())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn test_alternate_identity_header() {
    let mut config = AppConfig::default();
    config.security.identity_header = "x-username".to_string();
    let (addr, shutdown) = common::start_api(config).await;
    let client = common::client();
    let url = format!("http://{}/api/books", addr);

    let res = client
        .get(&url)
        .header("x-dn", WRITER_DN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Missing or invalid x-username header");

    let res = client
        .get(&url)
        .header("x-username", WRITER_DN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn test_public_paths_skip_authentication() {
    let (addr, shutdown) = common::start_api(AppConfig::default()).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/actuator/health", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "UP");

    // Public but unrouted paths fall through to 404, not 401
    let res = client
        .get(format!("http://{}/swagger-ui/index.html", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    shutdown.trigger();
}

#[tokio::test]
async fn test_prometheus_endpoint() {
    let (addr, shutdown) = common::start_api(AppConfig::default()).await;
    let client = common::client();

    // Generate at least one request metric
    client
        .get(format!("http://{}/actuator/health", addr))
        .send()
        .await
        .unwrap();

    let res = client
        .get(format!("http://{}/actuator/prometheus", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let text = res.text().await.unwrap();
    assert!(text.contains("acme_http_requests_total"));

    shutdown.trigger();
}
