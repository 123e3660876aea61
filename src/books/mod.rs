//! Book catalogue behind the header authentication boundary.
//!
//! # Data Flow
//! ```text
//! handlers.rs (JSON in/out, Problem Details on failure)
//!     → service.rs (role checks, ISBN uniqueness, audit fields)
//!     → repository.rs (trait + in-memory store)
//!       postgres.rs (relational store)
//! ```

pub mod handlers;
pub mod postgres;
pub mod repository;
pub mod service;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::http::response::{ProblemDetail, GENERIC_ERROR_DETAIL};
use crate::security::AccessDenied;

pub use postgres::PostgresBookRepository;
pub use repository::{BookRepository, MemoryBookRepository};
pub use service::BookService;

/// A stored book with its audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

/// Create/update payload as received.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publication_year: Option<i32>,
}

/// A payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
}

fn require_text(field: &str, value: Option<String>, errors: &mut Vec<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => {
            errors.push(format!("{}: must not be blank", field));
            String::new()
        }
    }
}

impl BookRequest {
    /// Check every field, reporting all problems at once.
    pub fn validate(self) -> Result<BookDraft, BookError> {
        let mut errors = Vec::new();

        let title = require_text("title", self.title, &mut errors);
        let author = require_text("author", self.author, &mut errors);
        let isbn = require_text("isbn", self.isbn, &mut errors);
        if self.publication_year.is_none() {
            errors.push("publicationYear: must not be null".to_string());
        }

        match self.publication_year {
            Some(publication_year) if errors.is_empty() => Ok(BookDraft {
                title,
                author,
                isbn,
                publication_year,
            }),
            _ => Err(BookError::Validation(errors.join(", "))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    #[error("Book not found with id: {0}")]
    NotFound(i64),

    #[error("Book with ISBN '{0}' already exists")]
    AlreadyExists(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error("storage error: {0}")]
    Storage(String),
}

impl BookError {
    /// Map to the Problem Details body, logging server-side detail.
    pub fn to_problem(&self) -> ProblemDetail {
        match self {
            BookError::NotFound(_) => {
                tracing::warn!("Book not found: {}", self);
                ProblemDetail::new(StatusCode::NOT_FOUND, "Book Not Found", self.to_string())
            }
            BookError::AlreadyExists(_) => {
                tracing::warn!("Book already exists: {}", self);
                ProblemDetail::new(StatusCode::BAD_REQUEST, "Book Already Exists", self.to_string())
            }
            BookError::Validation(_) => {
                tracing::warn!("Validation error: {}", self);
                ProblemDetail::new(StatusCode::BAD_REQUEST, "Validation Failed", self.to_string())
            }
            BookError::AccessDenied(_) => {
                tracing::warn!("Authorization denied: {}", self);
                ProblemDetail::new(StatusCode::FORBIDDEN, "Authorization Denied", self.to_string())
            }
            BookError::Storage(detail) => {
                tracing::error!(error = %detail, "Unexpected error");
                ProblemDetail::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    GENERIC_ERROR_DETAIL,
                )
            }
        }
    }
}
