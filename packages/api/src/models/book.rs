//! Books and per-book notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A book in a user's reading log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Book {
    pub id: i64,
    pub user_id: Uuid,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub review: Option<String>,
    pub rating: Option<i32>,
    pub image_path: String,
    pub date_read: DateTime<Utc>,
}

/// Fields submitted from the new-entry form.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub review: Option<String>,
    #[serde(default)]
    pub rating: Option<i32>,
}

impl NewBook {
    /// Relative path the cover is served from.
    pub fn image_path(&self) -> String {
        format!("assets/covers/{}.jpg", self.isbn)
    }
}

/// A note attached to a book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Note {
    pub id: i64,
    pub book_id: i64,
    pub note: String,
}

/// A book together with its notes, newest note first.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookNotes {
    pub book: Book,
    pub notes: Vec<Note>,
}

/// Ordering of the book listing, taken from `?sort=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Title,
    Date,
    Rating,
}

impl SortOrder {
    pub fn order_by(&self) -> &'static str {
        match self {
            SortOrder::Title => "title ASC",
            SortOrder::Date => "date_read DESC",
            SortOrder::Rating => "rating DESC NULLS LAST",
        }
    }

    /// Sort a slice the same way the SQL `ORDER BY` does.
    pub fn sort(&self, books: &mut [Book]) {
        match self {
            SortOrder::Title => books.sort_by(|a, b| a.title.cmp(&b.title)),
            SortOrder::Date => books.sort_by(|a, b| b.date_read.cmp(&a.date_read)),
            SortOrder::Rating => books.sort_by(|a, b| match (a.rating, b.rating) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }),
        }
    }
}
