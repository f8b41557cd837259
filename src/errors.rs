//! Central error type shared by every handler and extractor.
//!
//! Each variant maps to a stable machine-readable `error_code` so clients
//! can branch on failures without parsing prose. The human-readable
//! `message` and the optional `resolution` hint are free to change.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::jwt::TokenError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No bearer token in the Authorization header, or a token whose
    /// claims are missing the fields needed to resolve a user.
    #[error("missing credentials")]
    MissingCredential,
    /// Signature, expiry or deny-list check failed. The client is never
    /// told which one.
    #[error("invalid or expired token")]
    InvalidToken,
    /// A refresh token was presented where an access token is required.
    #[error("access token required")]
    AccessTokenRequired,
    /// An access token was presented where a refresh token is required.
    #[error("refresh token required")]
    RefreshTokenRequired,
    /// Unknown email or wrong password. One variant for both so the
    /// response cannot be used to probe which emails are registered.
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("user not found")]
    UserNotFound,
    #[error("account not verified")]
    AccountNotVerified,
    /// Authenticated, but the role does not allow the action.
    #[error("insufficient permissions")]
    InsufficientPermission,
    #[error("book not found")]
    BookNotFound,
    #[error("review not found")]
    ReviewNotFound,
    #[error("tag not found")]
    TagNotFound,
    #[error("tag already exists")]
    TagAlreadyExists,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("too many requests")]
    TooManyRequests,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingCredential => StatusCode::UNAUTHORIZED,
            ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::AccessTokenRequired => StatusCode::UNAUTHORIZED,
            ApiError::RefreshTokenRequired => StatusCode::FORBIDDEN,
            ApiError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ApiError::UserAlreadyExists => StatusCode::FORBIDDEN,
            ApiError::UserNotFound => StatusCode::NOT_FOUND,
            ApiError::AccountNotVerified => StatusCode::FORBIDDEN,
            ApiError::InsufficientPermission => StatusCode::UNAUTHORIZED,
            ApiError::BookNotFound => StatusCode::NOT_FOUND,
            ApiError::ReviewNotFound => StatusCode::NOT_FOUND,
            ApiError::TagNotFound => StatusCode::NOT_FOUND,
            ApiError::TagAlreadyExists => StatusCode::FORBIDDEN,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::MissingCredential => "missing_credentials",
            ApiError::InvalidToken => "invalid_token",
            ApiError::AccessTokenRequired => "access_token_required",
            ApiError::RefreshTokenRequired => "refresh_token_required",
            ApiError::InvalidCredentials => "invalid_email_or_password",
            ApiError::UserAlreadyExists => "user_exists",
            ApiError::UserNotFound => "user_not_found",
            ApiError::AccountNotVerified => "account_not_verified",
            ApiError::InsufficientPermission => "insufficient_permissions",
            ApiError::BookNotFound => "book_not_found",
            ApiError::ReviewNotFound => "review_not_found",
            ApiError::TagNotFound => "tag_not_found",
            ApiError::TagAlreadyExists => "tag_exists",
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::TooManyRequests => "too_many_requests",
            ApiError::Internal(_) => "server_error",
        }
    }

    /// Client-facing message. Internal failures get a fixed line so
    /// nothing from the underlying error leaks out.
    pub fn message(&self) -> String {
        match self {
            ApiError::MissingCredential => {
                "Authorization header with a bearer token is required".to_string()
            }
            ApiError::InvalidToken => "Token is invalid or expired".to_string(),
            ApiError::AccessTokenRequired => "Please provide a valid access token".to_string(),
            ApiError::RefreshTokenRequired => "Please provide a valid refresh token".to_string(),
            ApiError::InvalidCredentials => "Invalid email or password".to_string(),
            ApiError::UserAlreadyExists => "User with this email already exists".to_string(),
            ApiError::UserNotFound => "User not found".to_string(),
            ApiError::AccountNotVerified => "Account not verified".to_string(),
            ApiError::InsufficientPermission => {
                "You do not have enough permissions to perform this action".to_string()
            }
            ApiError::BookNotFound => "Book not found".to_string(),
            ApiError::ReviewNotFound => "Review not found".to_string(),
            ApiError::TagNotFound => "Tag not found".to_string(),
            ApiError::TagAlreadyExists => "Tag already exists".to_string(),
            ApiError::InvalidInput(detail) => detail.clone(),
            ApiError::TooManyRequests => "Too many requests".to_string(),
            ApiError::Internal(_) => "Oops! Something went wrong".to_string(),
        }
    }

    pub fn resolution(&self) -> Option<&'static str> {
        match self {
            ApiError::MissingCredential => Some("Please provide an Authorization header"),
            ApiError::InvalidToken => Some("Please get a new token"),
            ApiError::AccessTokenRequired => Some("Please provide an access token"),
            ApiError::RefreshTokenRequired => Some("Please provide a refresh token"),
            ApiError::AccountNotVerified => {
                Some("Please check your email for verification details")
            }
            ApiError::TooManyRequests => Some("Please try again later"),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref source) = self {
            error!(error = ?source, "request failed");
        }

        let mut body = json!({
            "message": self.message(),
            "error_code": self.error_code(),
        });
        if let Some(resolution) = self.resolution() {
            body["resolution"] = json!(resolution);
        }

        (self.status_code(), Json(body)).into_response()
    }
}

/// Failing to sign a token is never the client's fault.
impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::Internal(anyhow::Error::new(err))
    }
}
