//! Reading-log storage: books and their notes.
//!
//! Every operation takes the owning user's id. Rows belonging to someone else
//! are indistinguishable from rows that do not exist.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Book, BookNotes, NewBook, Note, SortOrder};

#[async_trait]
pub trait Library: Send + Sync {
    async fn list_books(&self, user_id: Uuid, sort: SortOrder) -> Result<Vec<Book>, StoreError>;

    async fn add_book(&self, user_id: Uuid, book: &NewBook) -> Result<Book, StoreError>;

    /// Delete a book and all of its notes. Returns whether a book was removed.
    async fn delete_book(&self, user_id: Uuid, book_id: i64) -> Result<bool, StoreError>;

    async fn book_notes(&self, user_id: Uuid, book_id: i64) -> Result<Option<BookNotes>, StoreError>;

    async fn add_note(&self, user_id: Uuid, book_id: i64, note: &str) -> Result<Option<Note>, StoreError>;

    async fn delete_note(&self, user_id: Uuid, note_id: i64) -> Result<bool, StoreError>;

    async fn update_note(&self, user_id: Uuid, note_id: i64, note: &str) -> Result<bool, StoreError>;

    async fn update_review(&self, user_id: Uuid, book_id: i64, review: &str) -> Result<bool, StoreError>;
}

/// Postgres-backed library.
#[derive(Clone)]
pub struct PgLibrary {
    pool: PgPool,
}

impl PgLibrary {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Library for PgLibrary {
    async fn list_books(&self, user_id: Uuid, sort: SortOrder) -> Result<Vec<Book>, StoreError> {
        let sql = format!(
            "SELECT * FROM books WHERE user_id = $1 ORDER BY {}",
            sort.order_by()
        );
        Ok(sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn add_book(&self, user_id: Uuid, book: &NewBook) -> Result<Book, StoreError> {
        Ok(sqlx::query_as(
            r#"
            INSERT INTO books (isbn, title, author, description, review, rating, image_path, date_read, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(&book.review)
        .bind(book.rating)
        .bind(book.image_path())
        .bind(Utc::now())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_book(&self, user_id: Uuid, book_id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM notes WHERE book_id = (SELECT id FROM books WHERE id = $1 AND user_id = $2)",
        )
        .bind(book_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        let result = sqlx::query("DELETE FROM books WHERE id = $1 AND user_id = $2")
            .bind(book_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn book_notes(&self, user_id: Uuid, book_id: i64) -> Result<Option<BookNotes>, StoreError> {
        let book: Option<Book> = sqlx::query_as("SELECT * FROM books WHERE id = $1 AND user_id = $2")
            .bind(book_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(book) = book else {
            return Ok(None);
        };

        let notes: Vec<Note> =
            sqlx::query_as("SELECT id, book_id, note FROM notes WHERE book_id = $1 ORDER BY id DESC")
                .bind(book_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(BookNotes { book, notes }))
    }

    async fn add_note(&self, user_id: Uuid, book_id: i64, note: &str) -> Result<Option<Note>, StoreError> {
        Ok(sqlx::query_as(
            r#"
            INSERT INTO notes (note, book_id)
            SELECT $1, id FROM books WHERE id = $2 AND user_id = $3
            RETURNING id, book_id, note
            "#,
        )
        .bind(note)
        .bind(book_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_note(&self, user_id: Uuid, note_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM notes USING books
            WHERE notes.id = $1 AND notes.book_id = books.id AND books.user_id = $2
            "#,
        )
        .bind(note_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_note(&self, user_id: Uuid, note_id: i64, note: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE notes SET note = $1 FROM books
            WHERE notes.id = $2 AND notes.book_id = books.id AND books.user_id = $3
            "#,
        )
        .bind(note)
        .bind(note_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_review(&self, user_id: Uuid, book_id: i64, review: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE books SET review = $1 WHERE id = $2 AND user_id = $3")
            .bind(review)
            .bind(book_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Default)]
struct Shelves {
    books: HashMap<i64, Book>,
    notes: HashMap<i64, Note>,
    next_id: i64,
}

impl Shelves {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn owns_book(&self, user_id: Uuid, book_id: i64) -> bool {
        self.books.get(&book_id).is_some_and(|b| b.user_id == user_id)
    }

    fn owns_note(&self, user_id: Uuid, note_id: i64) -> bool {
        self.notes
            .get(&note_id)
            .is_some_and(|n| self.owns_book(user_id, n.book_id))
    }
}

/// In-memory library for tests and local development.
#[derive(Clone, Debug, Default)]
pub struct MemoryLibrary {
    shelves: Arc<Mutex<Shelves>>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Library for MemoryLibrary {
    async fn list_books(&self, user_id: Uuid, sort: SortOrder) -> Result<Vec<Book>, StoreError> {
        let mut books: Vec<Book> = self
            .shelves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .books
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        sort.sort(&mut books);
        Ok(books)
    }

    async fn add_book(&self, user_id: Uuid, book: &NewBook) -> Result<Book, StoreError> {
        let mut shelves = self.shelves.lock().unwrap_or_else(PoisonError::into_inner);
        let book = Book {
            id: shelves.next_id(),
            user_id,
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            description: book.description.clone(),
            review: book.review.clone(),
            rating: book.rating,
            image_path: book.image_path(),
            date_read: Utc::now(),
        };
        shelves.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn delete_book(&self, user_id: Uuid, book_id: i64) -> Result<bool, StoreError> {
        let mut shelves = self.shelves.lock().unwrap_or_else(PoisonError::into_inner);
        if !shelves.owns_book(user_id, book_id) {
            return Ok(false);
        }
        shelves.notes.retain(|_, n| n.book_id != book_id);
        shelves.books.remove(&book_id);
        Ok(true)
    }

    async fn book_notes(&self, user_id: Uuid, book_id: i64) -> Result<Option<BookNotes>, StoreError> {
        let shelves = self.shelves.lock().unwrap_or_else(PoisonError::into_inner);
        if !shelves.owns_book(user_id, book_id) {
            return Ok(None);
        }
        let mut notes: Vec<Note> = shelves
            .notes
            .values()
            .filter(|n| n.book_id == book_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(Some(BookNotes {
            book: shelves.books[&book_id].clone(),
            notes,
        }))
    }

    async fn add_note(&self, user_id: Uuid, book_id: i64, note: &str) -> Result<Option<Note>, StoreError> {
        let mut shelves = self.shelves.lock().unwrap_or_else(PoisonError::into_inner);
        if !shelves.owns_book(user_id, book_id) {
            return Ok(None);
        }
        let note = Note {
            id: shelves.next_id(),
            book_id,
            note: note.to_string(),
        };
        shelves.notes.insert(note.id, note.clone());
        Ok(Some(note))
    }

    async fn delete_note(&self, user_id: Uuid, note_id: i64) -> Result<bool, StoreError> {
        let mut shelves = self.shelves.lock().unwrap_or_else(PoisonError::into_inner);
        if !shelves.owns_note(user_id, note_id) {
            return Ok(false);
        }
        shelves.notes.remove(&note_id);
        Ok(true)
    }

    async fn update_note(&self, user_id: Uuid, note_id: i64, note: &str) -> Result<bool, StoreError> {
        let mut shelves = self.shelves.lock().unwrap_or_else(PoisonError::into_inner);
        if !shelves.owns_note(user_id, note_id) {
            return Ok(false);
        }
        if let Some(existing) = shelves.notes.get_mut(&note_id) {
            existing.note = note.to_string();
        }
        Ok(true)
    }

    async fn update_review(&self, user_id: Uuid, book_id: i64, review: &str) -> Result<bool, StoreError> {
        let mut shelves = self.shelves.lock().unwrap_or_else(PoisonError::into_inner);
        if !shelves.owns_book(user_id, book_id) {
            return Ok(false);
        }
        if let Some(book) = shelves.books.get_mut(&book_id) {
            book.review = Some(review.to_string());
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_book(isbn: &str, title: &str) -> NewBook {
        NewBook {
            isbn: isbn.into(),
            title: title.into(),
            author: "Author".into(),
            description: None,
            review: Some("fine".into()),
            rating: Some(3),
        }
    }

    #[tokio::test]
    async fn test_books_are_scoped_to_owner() {
        let library = MemoryLibrary::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let book = library.add_book(alice, &new_book("1", "Emma")).await.unwrap();

        assert_eq!(library.list_books(alice, SortOrder::Title).await.unwrap().len(), 1);
        assert!(library.list_books(bob, SortOrder::Title).await.unwrap().is_empty());
        assert!(library.book_notes(bob, book.id).await.unwrap().is_none());
        assert!(!library.delete_book(bob, book.id).await.unwrap());
        assert!(!library.update_review(bob, book.id, "bad").await.unwrap());
        assert!(library.add_note(bob, book.id, "sneaky").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_notes_lifecycle() {
        let library = MemoryLibrary::new();
        let user = Uuid::new_v4();
        let book = library.add_book(user, &new_book("1", "Emma")).await.unwrap();

        let first = library.add_note(user, book.id, "chapter 1").await.unwrap().unwrap();
        let second = library.add_note(user, book.id, "chapter 2").await.unwrap().unwrap();

        let notes = library.book_notes(user, book.id).await.unwrap().unwrap().notes;
        assert_eq!(notes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        assert!(library.update_note(user, first.id, "chapter one").await.unwrap());
        assert!(library.delete_note(user, second.id).await.unwrap());

        let notes = library.book_notes(user, book.id).await.unwrap().unwrap().notes;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].note, "chapter one");
    }

    #[tokio::test]
    async fn test_delete_book_removes_notes() {
        let library = MemoryLibrary::new();
        let user = Uuid::new_v4();
        let book = library.add_book(user, &new_book("1", "Emma")).await.unwrap();
        let note = library.add_note(user, book.id, "n").await.unwrap().unwrap();

        assert!(library.delete_book(user, book.id).await.unwrap());
        assert!(library.list_books(user, SortOrder::Title).await.unwrap().is_empty());
        assert!(!library.delete_note(user, note.id).await.unwrap());
    }
}
