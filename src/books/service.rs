//! Book operations with authorization and business rules.
//!
//! # Responsibilities
//! - Allow reads to `READ_ONLY` or `READ_WRITE`, writes to `READ_WRITE` only
//! - Keep ISBNs unique on create and update
//! - Stamp audit fields with the acting identity
//!
//! # Design Decisions
//! - Authorization runs before validation so a forbidden caller learns
//!   nothing about the payload rules

use std::sync::Arc;

use crate::books::{Book, BookError, BookRepository, BookRequest};
use crate::security::{Principal, READ_ONLY, READ_WRITE};

const READERS: &[&str] = &[READ_ONLY, READ_WRITE];
const WRITERS: &[&str] = &[READ_WRITE];

pub struct BookService {
    repository: Arc<dyn BookRepository>,
}

impl BookService {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self { repository }
    }

    pub async fn create(&self, principal: &Principal, request: BookRequest) -> Result<Book, BookError> {
        principal.require_any_role(WRITERS)?;
        let draft = request.validate()?;
        tracing::debug!(
            user = %principal.identity,
            title = %draft.title,
            author = %draft.author,
            isbn = %draft.isbn,
            "CREATE book"
        );

        if self.repository.find_by_isbn(&draft.isbn).await?.is_some() {
            return Err(BookError::AlreadyExists(draft.isbn));
        }

        let book = self.repository.insert(draft, &principal.identity).await?;
        tracing::info!(user = %principal.identity, id = book.id, "Book created");
        Ok(book)
    }

    pub async fn find_all(&self, principal: &Principal) -> Result<Vec<Book>, BookError> {
        principal.require_any_role(READERS)?;
        tracing::debug!(user = %principal.identity, "READ ALL books");
        self.repository.find_all().await
    }

    pub async fn find_by_id(&self, principal: &Principal, id: i64) -> Result<Book, BookError> {
        principal.require_any_role(READERS)?;
        tracing::debug!(user = %principal.identity, id, "READ book");
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(BookError::NotFound(id))
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: i64,
        request: BookRequest,
    ) -> Result<Book, BookError> {
        principal.require_any_role(WRITERS)?;
        let draft = request.validate()?;
        tracing::debug!(user = %principal.identity, id, title = %draft.title, "UPDATE book");

        let existing = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(BookError::NotFound(id))?;

        if existing.isbn != draft.isbn
            && self.repository.find_by_isbn(&draft.isbn).await?.is_some()
        {
            return Err(BookError::AlreadyExists(draft.isbn));
        }

        let book = self
            .repository
            .update(id, draft, &principal.identity)
            .await?
            .ok_or(BookError::NotFound(id))?;
        tracing::info!(user = %principal.identity, id, "Book updated");
        Ok(book)
    }

    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<(), BookError> {
        principal.require_any_role(WRITERS)?;
        tracing::debug!(user = %principal.identity, id, "DELETE book");

        if !self.repository.delete(id).await? {
            return Err(BookError::NotFound(id));
        }
        tracing::info!(user = %principal.identity, id, "Book deleted");
        Ok(())
    }
}
