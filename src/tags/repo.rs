use sqlx::PgPool;
use uuid::Uuid;

use crate::tags::repo_types::Tag;

impl Tag {
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT uid, name, created_at
            FROM tags
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(tags)
    }

    pub async fn list_by_book(db: &PgPool, book_uid: Uuid) -> anyhow::Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.uid, t.name, t.created_at
            FROM tags t
            JOIN book_tags bt ON bt.tag_uid = t.uid
            WHERE bt.book_uid = $1
            ORDER BY t.name
            "#,
        )
        .bind(book_uid)
        .fetch_all(db)
        .await?;
        Ok(tags)
    }

    pub async fn find_by_name(db: &PgPool, name: &str) -> anyhow::Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            SELECT uid, name, created_at
            FROM tags
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(db)
        .await?;
        Ok(tag)
    }

    pub async fn create(db: &PgPool, name: &str) -> anyhow::Result<Tag> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name)
            VALUES ($1)
            RETURNING uid, name, created_at
            "#,
        )
        .bind(name)
        .fetch_one(db)
        .await?;
        Ok(tag)
    }

    /// Concurrent inserts of the same name collapse onto the existing row.
    pub async fn get_or_create(db: &PgPool, name: &str) -> anyhow::Result<Tag> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING uid, name, created_at
            "#,
        )
        .bind(name)
        .fetch_one(db)
        .await?;
        Ok(tag)
    }

    /// Linking twice is a no-op.
    pub async fn attach(db: &PgPool, tag_uid: Uuid, book_uid: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO book_tags (book_uid, tag_uid)
            VALUES ($1, $2)
            ON CONFLICT (book_uid, tag_uid) DO NOTHING
            "#,
        )
        .bind(book_uid)
        .bind(tag_uid)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn delete(db: &PgPool, uid: Uuid) -> anyhow::Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            DELETE FROM tags
            WHERE uid = $1
            RETURNING uid, name, created_at
            "#,
        )
        .bind(uid)
        .fetch_optional(db)
        .await?;
        Ok(tag)
    }
}
