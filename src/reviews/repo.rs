use sqlx::PgPool;
use uuid::Uuid;

use crate::reviews::dto::{ReviewCreateRequest, ReviewUpdateRequest};
use crate::reviews::repo_types::Review;

impl Review {
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT uid, rating, review_text, user_uid, book_uid, created_at, updated_at
            FROM reviews
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(reviews)
    }

    pub async fn list_by_book(db: &PgPool, book_uid: Uuid) -> anyhow::Result<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT uid, rating, review_text, user_uid, book_uid, created_at, updated_at
            FROM reviews
            WHERE book_uid = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(book_uid)
        .fetch_all(db)
        .await?;
        Ok(reviews)
    }

    pub async fn find(db: &PgPool, uid: Uuid) -> anyhow::Result<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            SELECT uid, rating, review_text, user_uid, book_uid, created_at, updated_at
            FROM reviews
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(db)
        .await?;
        Ok(review)
    }

    pub async fn create(
        db: &PgPool,
        user_uid: Uuid,
        book_uid: Uuid,
        payload: &ReviewCreateRequest,
    ) -> anyhow::Result<Review> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (rating, review_text, user_uid, book_uid)
            VALUES ($1, $2, $3, $4)
            RETURNING uid, rating, review_text, user_uid, book_uid, created_at, updated_at
            "#,
        )
        .bind(payload.rating)
        .bind(&payload.review_text)
        .bind(user_uid)
        .bind(book_uid)
        .fetch_one(db)
        .await?;
        Ok(review)
    }

    /// Patch only the provided fields; NULL binds fall through COALESCE.
    pub async fn update(
        db: &PgPool,
        uid: Uuid,
        payload: &ReviewUpdateRequest,
    ) -> anyhow::Result<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET rating = COALESCE($2, rating),
                review_text = COALESCE($3, review_text),
                updated_at = now()
            WHERE uid = $1
            RETURNING uid, rating, review_text, user_uid, book_uid, created_at, updated_at
            "#,
        )
        .bind(uid)
        .bind(payload.rating)
        .bind(payload.review_text.as_deref())
        .fetch_optional(db)
        .await?;
        Ok(review)
    }

    pub async fn delete(db: &PgPool, uid: Uuid) -> anyhow::Result<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            DELETE FROM reviews
            WHERE uid = $1
            RETURNING uid, rating, review_text, user_uid, book_uid, created_at, updated_at
            "#,
        )
        .bind(uid)
        .fetch_optional(db)
        .await?;
        Ok(review)
    }
}
