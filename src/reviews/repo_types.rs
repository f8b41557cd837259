use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A reader's take on one book, at most one screen long.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub uid: Uuid,
    pub rating: i32,
    pub review_text: String,
    pub user_uid: Uuid,
    pub book_uid: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
