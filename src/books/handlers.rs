use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::extractors::{CurrentUser, ANY_USER};
use crate::auth::repo_types::Role;
use crate::books::dto::{
    BookCreateRequest, BookDeleteResponse, BookDetail, BookUpdateRequest, BookUpdateResponse,
    Pagination,
};
use crate::books::repo_types::Book;
use crate::errors::ApiError;
use crate::reviews::repo_types::Review;
use crate::state::AppState;
use crate::tags::repo_types::Tag;

pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/:book_uid",
            get(get_book).patch(update_book).delete(delete_book),
        )
        .route("/books/user/:user_uid", get(list_user_books))
}

#[instrument(skip(state, user))]
pub async fn list_books(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Book>>, ApiError> {
    ANY_USER.check(&user)?;
    let books = Book::list(&state.db, p.limit, p.offset).await?;
    Ok(Json(books))
}

#[instrument(skip(state, user, payload))]
pub async fn create_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<BookCreateRequest>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    ANY_USER.check(&user)?;
    payload.validate()?;

    let book = Book::create(&state.db, user.uid, &payload).await?;
    info!(book_id = %book.uid, user_id = %user.uid, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

#[instrument(skip(state, user))]
pub async fn get_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(book_uid): Path<Uuid>,
) -> Result<Json<BookDetail>, ApiError> {
    ANY_USER.check(&user)?;

    let book = Book::find(&state.db, book_uid)
        .await?
        .ok_or(ApiError::BookNotFound)?;
    let reviews = Review::list_by_book(&state.db, book.uid).await?;
    let tags = Tag::list_by_book(&state.db, book.uid).await?;

    Ok(Json(BookDetail {
        book,
        reviews,
        tags,
    }))
}

#[instrument(skip(state, user, payload))]
pub async fn update_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(book_uid): Path<Uuid>,
    Json(payload): Json<BookUpdateRequest>,
) -> Result<Json<BookUpdateResponse>, ApiError> {
    ANY_USER.check(&user)?;
    payload.validate()?;

    let old_book = Book::find(&state.db, book_uid)
        .await?
        .ok_or(ApiError::BookNotFound)?;
    // Only the submitter may edit a listing.
    if old_book.user_uid != user.uid {
        warn!(book_id = %book_uid, user_id = %user.uid, "edit of a foreign book refused");
        return Err(ApiError::InsufficientPermission);
    }

    let updated_book = Book::update(&state.db, book_uid, &payload)
        .await?
        .ok_or(ApiError::BookNotFound)?;

    Ok(Json(BookUpdateResponse {
        message: "Book Updated Successfully!".into(),
        old_book,
        updated_book,
    }))
}

#[instrument(skip(state, user))]
pub async fn delete_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(book_uid): Path<Uuid>,
) -> Result<Json<BookDeleteResponse>, ApiError> {
    ANY_USER.check(&user)?;

    let book = Book::find(&state.db, book_uid)
        .await?
        .ok_or(ApiError::BookNotFound)?;
    // The submitter or an admin; nobody else.
    if book.user_uid != user.uid && user.role != Role::Admin {
        warn!(book_id = %book_uid, user_id = %user.uid, "delete of a foreign book refused");
        return Err(ApiError::InsufficientPermission);
    }

    let deleted_book = Book::delete(&state.db, book_uid)
        .await?
        .ok_or(ApiError::BookNotFound)?;
    info!(book_id = %book_uid, user_id = %user.uid, "book deleted");

    Ok(Json(BookDeleteResponse {
        message: "Book Deleted Successfully!".into(),
        deleted_book,
    }))
}

#[instrument(skip(state, user))]
pub async fn list_user_books(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_uid): Path<Uuid>,
) -> Result<Json<Vec<Book>>, ApiError> {
    ANY_USER.check(&user)?;
    let books = Book::list_by_user(&state.db, user_uid).await?;
    Ok(Json(books))
}
