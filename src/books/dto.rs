use serde::{Deserialize, Serialize};
use time::Date;

use crate::books::repo_types::Book;
use crate::errors::ApiError;
use crate::reviews::repo_types::Review;
use crate::tags::repo_types::Tag;

#[derive(Debug, Deserialize)]
pub struct BookCreateRequest {
    pub title: String,
    pub author: String,
    pub publisher: String,
    #[serde(with = "crate::books::repo_types::date_format")]
    pub published_date: Date,
    pub page_count: i32,
    pub language: String,
}

impl BookCreateRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() || self.author.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "title and author must not be empty".into(),
            ));
        }
        if self.page_count < 1 {
            return Err(ApiError::InvalidInput(
                "page_count must be a positive number".into(),
            ));
        }
        Ok(())
    }
}

/// Partial update; absent fields keep their current value. The published
/// date is fixed at creation and cannot be patched.
#[derive(Debug, Deserialize)]
pub struct BookUpdateRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub page_count: Option<i32>,
    pub language: Option<String>,
}

impl BookUpdateRequest {
    /// Present fields face the same bounds as on create; a patch must not
    /// blank out what create would have refused.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ApiError::InvalidInput("title must not be empty".into()));
        }
        if self.author.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(ApiError::InvalidInput("author must not be empty".into()));
        }
        if self.page_count.is_some_and(|n| n < 1) {
            return Err(ApiError::InvalidInput(
                "page_count must be a positive number".into(),
            ));
        }
        Ok(())
    }
}

/// Book plus everything attached to it.
#[derive(Debug, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub reviews: Vec<Review>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize)]
pub struct BookUpdateResponse {
    pub message: String,
    pub old_book: Book,
    pub updated_book: Book,
}

#[derive(Debug, Serialize)]
pub struct BookDeleteResponse {
    pub message: String,
    pub deleted_book: Book,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}
