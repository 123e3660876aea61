//! Relational book store. The schema is created by `db::initialize_schema`.

use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::Pool;
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;

use crate::books::{Book, BookDraft, BookError, BookRepository};

const COLUMNS: &str =
    "id, title, author, isbn, publication_year, created_at, created_by, updated_at, updated_by";

pub struct PostgresBookRepository {
    pool: Pool,
}

impl PostgresBookRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn client(&self) -> Result<deadpool_postgres::Object, BookError> {
        self.pool
            .get()
            .await
            .map_err(|e| BookError::Storage(e.to_string()))
    }
}

fn book_from_row(row: &Row) -> Book {
    Book {
        id: row.get(0),
        title: row.get(1),
        author: row.get(2),
        isbn: row.get(3),
        publication_year: row.get(4),
        created_at: row.get(5),
        created_by: row.get(6),
        updated_at: row.get(7),
        updated_by: row.get(8),
    }
}

/// Map a unique-constraint violation on `isbn` to `AlreadyExists`.
fn map_write_error(e: tokio_postgres::Error, isbn: &str) -> BookError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        BookError::AlreadyExists(isbn.to_string())
    } else {
        BookError::Storage(e.to_string())
    }
}

fn storage(e: tokio_postgres::Error) -> BookError {
    BookError::Storage(e.to_string())
}

#[async_trait]
impl BookRepository for PostgresBookRepository {
    async fn find_all(&self) -> Result<Vec<Book>, BookError> {
        let client = self.client().await?;
        let rows = client
            .query(&format!("SELECT {COLUMNS} FROM books ORDER BY id"), &[])
            .await
            .map_err(storage)?;
        Ok(rows.iter().map(book_from_row).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, BookError> {
        let client = self.client().await?;
        let row = client
            .query_opt(&format!("SELECT {COLUMNS} FROM books WHERE id = $1"), &[&id])
            .await
            .map_err(storage)?;
        Ok(row.as_ref().map(book_from_row))
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>, BookError> {
        let client = self.client().await?;
        let row = client
            .query_opt(&format!("SELECT {COLUMNS} FROM books WHERE isbn = $1"), &[&isbn])
            .await
            .map_err(storage)?;
        Ok(row.as_ref().map(book_from_row))
    }

    async fn insert(&self, draft: BookDraft, created_by: &str) -> Result<Book, BookError> {
        let client = self.client().await?;
        let row = client
            .query_one(
                &format!(
                    "INSERT INTO books (title, author, isbn, publication_year, created_at, created_by)
                     VALUES ($1, $2, $3, $4, $5, $6) RETURNING {COLUMNS}"
                ),
                &[
                    &draft.title,
                    &draft.author,
                    &draft.isbn,
                    &draft.publication_year,
                    &Utc::now(),
                    &created_by,
                ],
            )
            .await
            .map_err(|e| map_write_error(e, &draft.isbn))?;
        Ok(book_from_row(&row))
    }

    async fn update(
        &self,
        id: i64,
        draft: BookDraft,
        updated_by: &str,
    ) -> Result<Option<Book>, BookError> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!(
                    "UPDATE books SET title = $2, author = $3, isbn = $4, publication_year = $5,
                     updated_at = $6, updated_by = $7 WHERE id = $1 RETURNING {COLUMNS}"
                ),
                &[
                    &id,
                    &draft.title,
                    &draft.author,
                    &draft.isbn,
                    &draft.publication_year,
                    &Utc::now(),
                    &updated_by,
                ],
            )
            .await
            .map_err(|e| map_write_error(e, &draft.isbn))?;
        Ok(row.as_ref().map(book_from_row))
    }

    async fn delete(&self, id: i64) -> Result<bool, BookError> {
        let client = self.client().await?;
        let deleted = client
            .execute("DELETE FROM books WHERE id = $1", &[&id])
            .await
            .map_err(storage)?;
        Ok(deleted > 0)
    }
}
