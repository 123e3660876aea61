//! `/api/books` handlers.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, OriginalUri, Path, State},
    http::StatusCode,
    Json,
};

use crate::books::{Book, BookError, BookRequest};
use crate::http::response::ProblemDetail;
use crate::http::server::AppState;
use crate::security::Principal;

type ApiResult<T> = Result<T, ProblemDetail>;

fn problem(err: BookError, uri: &OriginalUri) -> ProblemDetail {
    err.to_problem().with_instance(&uri.0)
}

fn parse_id(id: Result<Path<i64>, PathRejection>, uri: &OriginalUri) -> ApiResult<i64> {
    id.map(|Path(id)| id).map_err(|e| {
        problem(BookError::Validation(format!("id: {}", e.body_text())), uri)
    })
}

fn parse_body(
    body: Result<Json<BookRequest>, JsonRejection>,
    uri: &OriginalUri,
) -> ApiResult<BookRequest> {
    body.map(|Json(request)| request).map_err(|e| {
        problem(BookError::Validation(e.body_text()), uri)
    })
}

pub async fn list_books(
    State(state): State<AppState>,
    principal: Principal,
    uri: OriginalUri,
) -> ApiResult<Json<Vec<Book>>> {
    state
        .books
        .find_all(&principal)
        .await
        .map(Json)
        .map_err(|e| problem(e, &uri))
}

pub async fn get_book(
    State(state): State<AppState>,
    principal: Principal,
    uri: OriginalUri,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Book>> {
    let id = parse_id(id, &uri)?;
    state
        .books
        .find_by_id(&principal, id)
        .await
        .map(Json)
        .map_err(|e| problem(e, &uri))
}

pub async fn create_book(
    State(state): State<AppState>,
    principal: Principal,
    uri: OriginalUri,
    body: Result<Json<BookRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    let request = parse_body(body, &uri)?;
    state
        .books
        .create(&principal, request)
        .await
        .map(|book| (StatusCode::CREATED, Json(book)))
        .map_err(|e| problem(e, &uri))
}

pub async fn update_book(
    State(state): State<AppState>,
    principal: Principal,
    uri: OriginalUri,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<BookRequest>, JsonRejection>,
) -> ApiResult<Json<Book>> {
    let id = parse_id(id, &uri)?;
    let request = parse_body(body, &uri)?;
    state
        .books
        .update(&principal, id, request)
        .await
        .map(Json)
        .map_err(|e| problem(e, &uri))
}

pub async fn delete_book(
    State(state): State<AppState>,
    principal: Principal,
    uri: OriginalUri,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let id = parse_id(id, &uri)?;
    state
        .books
        .delete(&principal, id)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| problem(e, &uri))
}
