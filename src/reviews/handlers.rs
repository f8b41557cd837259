use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::dto::MessageResponse;
use crate::auth::extractors::{CurrentUser, ANY_USER};
use crate::auth::repo_types::Role;
use crate::books::repo_types::Book;
use crate::errors::ApiError;
use crate::reviews::dto::{ReviewCreateRequest, ReviewUpdateRequest, ReviewUpdateResponse};
use crate::reviews::repo_types::Review;
use crate::state::AppState;

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", get(list_reviews))
        .route(
            "/reviews/:review_uid",
            get(get_review).patch(update_review).delete(delete_review),
        )
        .route("/reviews/book/:book_uid", post(create_review))
}

#[instrument(skip(state, user))]
pub async fn list_reviews(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Review>>, ApiError> {
    ANY_USER.check(&user)?;
    let reviews = Review::list(&state.db).await?;
    Ok(Json(reviews))
}

#[instrument(skip(state, user))]
pub async fn get_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(review_uid): Path<Uuid>,
) -> Result<Json<Review>, ApiError> {
    ANY_USER.check(&user)?;
    let review = Review::find(&state.db, review_uid)
        .await?
        .ok_or(ApiError::ReviewNotFound)?;
    Ok(Json(review))
}

#[instrument(skip(state, user, payload))]
pub async fn create_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(book_uid): Path<Uuid>,
    Json(payload): Json<ReviewCreateRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    ANY_USER.check(&user)?;
    payload.validate()?;

    // Reviews hang off an existing book only.
    let book = Book::find(&state.db, book_uid)
        .await?
        .ok_or(ApiError::BookNotFound)?;

    let review = Review::create(&state.db, user.uid, book.uid, &payload).await?;
    info!(review_id = %review.uid, book_id = %book.uid, user_id = %user.uid, "review created");
    Ok((StatusCode::CREATED, Json(review)))
}

#[instrument(skip(state, user, payload))]
pub async fn update_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(review_uid): Path<Uuid>,
    Json(payload): Json<ReviewUpdateRequest>,
) -> Result<Json<ReviewUpdateResponse>, ApiError> {
    ANY_USER.check(&user)?;
    payload.validate()?;

    let old_review = Review::find(&state.db, review_uid)
        .await?
        .ok_or(ApiError::ReviewNotFound)?;
    // The author or an admin; nobody else.
    if old_review.user_uid != user.uid && user.role != Role::Admin {
        warn!(review_id = %review_uid, user_id = %user.uid, "edit of a foreign review refused");
        return Err(ApiError::InsufficientPermission);
    }

    let updated_review = Review::update(&state.db, review_uid, &payload)
        .await?
        .ok_or(ApiError::ReviewNotFound)?;
    info!(review_id = %review_uid, user_id = %user.uid, "review updated");

    Ok(Json(ReviewUpdateResponse {
        message: "Review updated successfully".into(),
        old_review,
        updated_review,
    }))
}

#[instrument(skip(state, user))]
pub async fn delete_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(review_uid): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    ANY_USER.check(&user)?;

    let review = Review::find(&state.db, review_uid)
        .await?
        .ok_or(ApiError::ReviewNotFound)?;
    // The author or an admin; nobody else.
    if review.user_uid != user.uid && user.role != Role::Admin {
        warn!(review_id = %review_uid, user_id = %user.uid, "delete of a foreign review refused");
        return Err(ApiError::InsufficientPermission);
    }

    Review::delete(&state.db, review_uid).await?;
    info!(review_id = %review_uid, user_id = %user.uid, "review deleted");
    Ok(Json(MessageResponse {
        message: "Review deleted successfully".into(),
    }))
}
