//! Book storage abstraction and the in-memory store.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::books::{Book, BookDraft, BookError};

#[async_trait]
pub trait BookRepository: Send + Sync + 'static {
    /// All books ordered by id.
    async fn find_all(&self) -> Result<Vec<Book>, BookError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, BookError>;

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>, BookError>;

    /// Store a new book, stamping `created_at` and `created_by`.
    /// `AlreadyExists` when another book holds the ISBN.
    async fn insert(&self, draft: BookDraft, created_by: &str) -> Result<Book, BookError>;

    /// Replace the fields of `id`, stamping `updated_at` and `updated_by`.
    /// `None` when the book does not exist, `AlreadyExists` when another
    /// book holds the new ISBN.
    async fn update(
        &self,
        id: i64,
        draft: BookDraft,
        updated_by: &str,
    ) -> Result<Option<Book>, BookError>;

    /// `false` when the book did not exist.
    async fn delete(&self, id: i64) -> Result<bool, BookError>;
}

/// Concurrent map with a monotonically increasing id sequence.
///
/// `isbns` is a unique index from ISBN to id. Locks are only ever taken
/// `books` first, then `isbns`.
#[derive(Clone)]
pub struct MemoryBookRepository {
    books: Arc<DashMap<i64, Book>>,
    isbns: Arc<DashMap<String, i64>>,
    next_id: Arc<AtomicI64>,
}

impl Default for MemoryBookRepository {
    fn default() -> Self {
        Self {
            books: Arc::new(DashMap::new()),
            isbns: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl MemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for MemoryBookRepository {
    async fn find_all(&self) -> Result<Vec<Book>, BookError> {
        let mut books: Vec<Book> = self.books.iter().map(|e| e.value().clone()).collect();
        books.sort_by_key(|b| b.id);
        Ok(books)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, BookError> {
        Ok(self.books.get(&id).map(|e| e.value().clone()))
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>, BookError> {
        let Some(id) = self.isbns.get(isbn).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self.books.get(&id).map(|e| e.value().clone()))
    }

    async fn insert(&self, draft: BookDraft, created_by: &str) -> Result<Book, BookError> {
        let id = match self.isbns.entry(draft.isbn.clone()) {
            Entry::Occupied(_) => return Err(BookError::AlreadyExists(draft.isbn)),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                slot.insert(id);
                id
            }
        };
        let book = Book {
            id,
            title: draft.title,
            author: draft.author,
            isbn: draft.isbn,
            publication_year: draft.publication_year,
            created_at: Utc::now(),
            created_by: created_by.to_string(),
            updated_at: None,
            updated_by: None,
        };
        self.books.insert(id, book.clone());
        Ok(book)
    }

    async fn update(
        &self,
        id: i64,
        draft: BookDraft,
        updated_by: &str,
    ) -> Result<Option<Book>, BookError> {
        let Some(mut entry) = self.books.get_mut(&id) else {
            return Ok(None);
        };
        let book = entry.value_mut();

        if book.isbn != draft.isbn {
            match self.isbns.entry(draft.isbn.clone()) {
                Entry::Occupied(_) => return Err(BookError::AlreadyExists(draft.isbn)),
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
            self.isbns.remove_if(&book.isbn, |_, owner| *owner == id);
        }

        book.title = draft.title;
        book.author = draft.author;
        book.isbn = draft.isbn;
        book.publication_year = draft.publication_year;
        book.updated_at = Some(Utc::now());
        book.updated_by = Some(updated_by.to_string());
        Ok(Some(book.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, BookError> {
        let Some((_, book)) = self.books.remove(&id) else {
            return Ok(false);
        };
        self.isbns.remove_if(&book.isbn, |_, owner| *owner == id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(isbn: &str) -> BookDraft {
        BookDraft {
            title: "Neuromancer".to_string(),
            author: "William Gibson".to_string(),
            isbn: isbn.to_string(),
            publication_year: 1984,
        }
    }

    #[tokio::test]
    async fn test_ids_increase() {
        let repo = MemoryBookRepository::new();
        let a = repo.insert(draft("1"), "cn=a").await.unwrap();
        let b = repo.insert(draft("2"), "cn=a").await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.created_by, "cn=a");
        assert!(a.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_find_all_is_ordered() {
        let repo = MemoryBookRepository::new();
        for isbn in ["3", "1", "2"] {
            repo.insert(draft(isbn), "cn=a").await.unwrap();
        }
        let ids: Vec<i64> = repo.find_all().await.unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_update_stamps_audit_fields() {
        let repo = MemoryBookRepository::new();
        let book = repo.insert(draft("1"), "cn=creator").await.unwrap();

        let updated = repo
            .update(book.id, draft("9"), "cn=editor")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.isbn, "9");
        assert_eq!(updated.created_by, "cn=creator");
        assert_eq!(updated.updated_by.as_deref(), Some("cn=editor"));
        assert!(updated.updated_at.is_some());

        assert!(repo.update(42, draft("x"), "cn=editor").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_and_lookup() {
        let repo = MemoryBookRepository::new();
        let book = repo.insert(draft("1"), "cn=a").await.unwrap();

        assert!(repo.find_by_isbn("1").await.unwrap().is_some());
        assert!(repo.delete(book.id).await.unwrap());
        assert!(!repo.delete(book.id).await.unwrap());
        assert!(repo.find_by_id(book.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_isbn() {
        let repo = MemoryBookRepository::new();
        repo.insert(draft("1"), "cn=a").await.unwrap();

        let err = repo.insert(draft("1"), "cn=b").await.unwrap_err();
        assert!(matches!(err, BookError::AlreadyExists(isbn) if isbn == "1"));
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_keep_isbn_unique() {
        let repo = MemoryBookRepository::new();

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.insert(draft("42"), &format!("cn={}", i)).await })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_moves_isbn_index() {
        let repo = MemoryBookRepository::new();
        let a = repo.insert(draft("1"), "cn=a").await.unwrap();
        let b = repo.insert(draft("2"), "cn=a").await.unwrap();

        let err = repo.update(b.id, draft("1"), "cn=a").await.unwrap_err();
        assert!(matches!(err, BookError::AlreadyExists(_)));

        repo.update(a.id, draft("3"), "cn=a").await.unwrap().unwrap();
        assert!(repo.find_by_isbn("1").await.unwrap().is_none());
        assert_eq!(repo.find_by_isbn("3").await.unwrap().unwrap().id, a.id);

        // The released ISBN is free again
        repo.update(b.id, draft("1"), "cn=a").await.unwrap().unwrap();
        assert_eq!(repo.find_by_isbn("1").await.unwrap().unwrap().id, b.id);
        assert!(repo.find_by_isbn("2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_releases_isbn() {
        let repo = MemoryBookRepository::new();
        let book = repo.insert(draft("1"), "cn=a").await.unwrap();
        repo.delete(book.id).await.unwrap();

        assert!(repo.insert(draft("1"), "cn=a").await.is_ok());
    }
}
