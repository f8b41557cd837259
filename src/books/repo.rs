use sqlx::PgPool;
use uuid::Uuid;

use crate::books::dto::{BookCreateRequest, BookUpdateRequest};
use crate::books::repo_types::Book;

impl Book {
    /// Newest first, across all submitters.
    pub async fn list(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT uid, title, author, publisher, published_date, page_count,
                   language, user_uid, created_at, updated_at
            FROM books
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(books)
    }

    pub async fn list_by_user(db: &PgPool, user_uid: Uuid) -> anyhow::Result<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT uid, title, author, publisher, published_date, page_count,
                   language, user_uid, created_at, updated_at
            FROM books
            WHERE user_uid = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_uid)
        .fetch_all(db)
        .await?;
        Ok(books)
    }

    pub async fn find(db: &PgPool, uid: Uuid) -> anyhow::Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            SELECT uid, title, author, publisher, published_date, page_count,
                   language, user_uid, created_at, updated_at
            FROM books
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(db)
        .await?;
        Ok(book)
    }

    pub async fn create(
        db: &PgPool,
        user_uid: Uuid,
        payload: &BookCreateRequest,
    ) -> anyhow::Result<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, publisher, published_date, page_count, language, user_uid)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING uid, title, author, publisher, published_date, page_count,
                      language, user_uid, created_at, updated_at
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.author)
        .bind(&payload.publisher)
        .bind(payload.published_date)
        .bind(payload.page_count)
        .bind(&payload.language)
        .bind(user_uid)
        .fetch_one(db)
        .await?;
        Ok(book)
    }

    /// Patch only the provided fields; NULL binds fall through COALESCE.
    pub async fn update(
        db: &PgPool,
        uid: Uuid,
        payload: &BookUpdateRequest,
    ) -> anyhow::Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                author = COALESCE($3, author),
                publisher = COALESCE($4, publisher),
                page_count = COALESCE($5, page_count),
                language = COALESCE($6, language),
                updated_at = now()
            WHERE uid = $1
            RETURNING uid, title, author, publisher, published_date, page_count,
                      language, user_uid, created_at, updated_at
            "#,
        )
        .bind(uid)
        .bind(payload.title.as_deref())
        .bind(payload.author.as_deref())
        .bind(payload.publisher.as_deref())
        .bind(payload.page_count)
        .bind(payload.language.as_deref())
        .fetch_optional(db)
        .await?;
        Ok(book)
    }

    pub async fn delete(db: &PgPool, uid: Uuid) -> anyhow::Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            DELETE FROM books
            WHERE uid = $1
            RETURNING uid, title, author, publisher, published_date, page_count,
                      language, user_uid, created_at, updated_at
            "#,
        )
        .bind(uid)
        .fetch_optional(db)
        .await?;
        Ok(book)
    }
}
