use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::reviews::repo_types::Review;

pub const MAX_REVIEW_LENGTH: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct ReviewCreateRequest {
    pub rating: i32,
    pub review_text: String,
}

impl ReviewCreateRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !(1..=5).contains(&self.rating) {
            return Err(ApiError::InvalidInput(
                "rating must be between 1 and 5".into(),
            ));
        }
        if self.review_text.trim().is_empty() {
            return Err(ApiError::InvalidInput("review text must not be empty".into()));
        }
        if self.review_text.len() > MAX_REVIEW_LENGTH {
            return Err(ApiError::InvalidInput(
                "review text must be at most 2000 characters".into(),
            ));
        }
        Ok(())
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Deserialize)]
pub struct ReviewUpdateRequest {
    pub rating: Option<i32>,
    pub review_text: Option<String>,
}

impl ReviewUpdateRequest {
    /// Present fields face the same bounds as on create.
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(rating) = self.rating {
            if !(1..=5).contains(&rating) {
                return Err(ApiError::InvalidInput(
                    "rating must be between 1 and 5".into(),
                ));
            }
        }
        if let Some(text) = &self.review_text {
            if text.trim().is_empty() {
                return Err(ApiError::InvalidInput("review text must not be empty".into()));
            }
            if text.len() > MAX_REVIEW_LENGTH {
                return Err(ApiError::InvalidInput(
                    "review text must be at most 2000 characters".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewUpdateResponse {
    pub message: String,
    pub old_review: Review,
    pub updated_review: Review,
}
