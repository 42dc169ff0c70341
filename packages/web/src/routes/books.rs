//! Reading-log routes. All of them sit behind [`require_auth`](crate::gate::require_auth).
//!
//! Pages are returned as JSON; templating is someone else's job. A book or note
//! that belongs to another user is treated exactly like one that does not exist.

use api::covers::validate_isbn;
use api::models::{Book, BookNotes, NewBook, SortOrder};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;

use crate::error::WebError;
use crate::gate::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub sort: Option<String>,
}

/// Unknown values fall back to sorting by title.
fn parse_sort(sort: Option<&str>) -> SortOrder {
    match sort {
        Some("date") => SortOrder::Date,
        Some("rating") => SortOrder::Rating,
        _ => SortOrder::Title,
    }
}

/// The new-entry form. Every field arrives as text; blanks mean "not given".
#[derive(Debug, Deserialize)]
pub struct NewEntryForm {
    pub isbn: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub rating: String,
}

impl NewEntryForm {
    fn into_new_book(self) -> NewBook {
        let non_empty = |s: String| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        NewBook {
            isbn: self.isbn.trim().to_string(),
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            rating: self.rating.trim().parse().ok(),
            description: non_empty(self.description),
            review: non_empty(self.review),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NoteForm {
    #[serde(rename = "newNote")]
    pub new_note: String,
}

#[derive(Debug, Deserialize)]
pub struct NoteRefForm {
    #[serde(rename = "bookId")]
    pub book_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct NoteUpdateForm {
    #[serde(rename = "bookId")]
    pub book_id: i64,
    #[serde(rename = "noteToUpdate")]
    pub note_to_update: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    #[serde(rename = "reviewToUpdate")]
    pub review_to_update: String,
}

pub async fn home(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Book>>, WebError> {
    let sort = parse_sort(query.sort.as_deref());
    Ok(Json(state.library.list_books(user.id, sort).await?))
}

pub async fn new_entry(CurrentUser(_user): CurrentUser) -> &'static str {
    "New entry: POST /new-entry/add with isbn, title, author, description, review, rating"
}

pub async fn add_book(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Form(form): Form<NewEntryForm>,
) -> Result<Response, WebError> {
    let book = form.into_new_book();
    if validate_isbn(&book.isbn).is_err() || book.title.is_empty() || book.author.is_empty() {
        return Ok((StatusCode::BAD_REQUEST, "ISBN, title and author are required").into_response());
    }

    state.covers.save_cover(&book.isbn).await?;
    let book = state.library.add_book(user.id, &book).await?;
    tracing::info!(user_id = %user.id, book_id = book.id, "Added book");
    Ok(Redirect::to("/").into_response())
}

pub async fn delete_book(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> Result<Redirect, WebError> {
    state.library.delete_book(user.id, book_id).await?;
    Ok(Redirect::to("/"))
}

pub async fn notes(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> Result<Response, WebError> {
    let found: Option<BookNotes> = state.library.book_notes(user.id, book_id).await?;
    Ok(match found {
        Some(book_notes) => Json(book_notes).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    })
}

pub async fn add_note(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    Form(form): Form<NoteForm>,
) -> Result<Redirect, WebError> {
    state.library.add_note(user.id, book_id, &form.new_note).await?;
    Ok(Redirect::to(&format!("/notes/{}", book_id)))
}

pub async fn delete_note(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
    Form(form): Form<NoteRefForm>,
) -> Result<Redirect, WebError> {
    state.library.delete_note(user.id, note_id).await?;
    Ok(Redirect::to(&format!("/notes/{}", form.book_id)))
}

pub async fn update_note(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(note_id): Path<i64>,
    Form(form): Form<NoteUpdateForm>,
) -> Result<Redirect, WebError> {
    state
        .library
        .update_note(user.id, note_id, &form.note_to_update)
        .await?;
    Ok(Redirect::to(&format!("/notes/{}", form.book_id)))
}

pub async fn update_review(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    Form(form): Form<ReviewForm>,
) -> Result<Redirect, WebError> {
    state
        .library
        .update_review(user.id, book_id, &form.review_to_update)
        .await?;
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort() {
        assert_eq!(parse_sort(None), SortOrder::Title);
        assert_eq!(parse_sort(Some("title")), SortOrder::Title);
        assert_eq!(parse_sort(Some("date")), SortOrder::Date);
        assert_eq!(parse_sort(Some("rating")), SortOrder::Rating);
        assert_eq!(parse_sort(Some("bogus")), SortOrder::Title);
    }

    #[test]
    fn test_new_entry_form_blanks() {
        let form = NewEntryForm {
            isbn: " 123 ".into(),
            title: "Emma".into(),
            author: "Austen".into(),
            description: "  ".into(),
            review: "loved it".into(),
            rating: "".into(),
        };
        let book = form.into_new_book();
        assert_eq!(book.isbn, "123");
        assert_eq!(book.description, None);
        assert_eq!(book.review.as_deref(), Some("loved it"));
        assert_eq!(book.rating, None);
    }
}
