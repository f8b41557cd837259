use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::{debug, warn};

use crate::auth::claims::{Claims, TokenKind};
use crate::auth::repo_types::{Role, User};
use crate::errors::ApiError;
use crate::state::AppState;

/// Read the bearer credential out of the Authorization header.
fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::MissingCredential)?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or(ApiError::MissingCredential)
}

/// Shared session check: decode, consult the deny list, then make sure
/// the token is of the expected kind. Signature, expiry and revocation
/// all collapse into the same client-facing error.
async fn authenticate(
    parts: &Parts,
    state: &AppState,
    expected: TokenKind,
) -> Result<Claims, ApiError> {
    let token = bearer_token(parts)?;

    let claims = state.jwt.decode(token).map_err(|e| {
        debug!(error = %e, "token rejected");
        ApiError::InvalidToken
    })?;

    if state.deny_list.is_denied(claims.jti).await? {
        debug!(jti = %claims.jti, "token is on the deny list");
        return Err(ApiError::InvalidToken);
    }

    match (expected, claims.kind()) {
        (TokenKind::Access, TokenKind::Refresh) => Err(ApiError::AccessTokenRequired),
        (TokenKind::Refresh, TokenKind::Access) => Err(ApiError::RefreshTokenRequired),
        _ => Ok(claims),
    }
}

/// Claims of a validated access token.
pub struct AccessClaims(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AccessClaims {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(authenticate(parts, state, TokenKind::Access).await?))
    }
}

/// Claims of a validated refresh token.
pub struct RefreshClaims(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for RefreshClaims {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(authenticate(parts, state, TokenKind::Refresh).await?))
    }
}

/// The database record behind a validated access token. Resolving it on
/// every request means a deleted account stops working immediately, even
/// while its tokens are still within their lifetime.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = authenticate(parts, state, TokenKind::Access).await?;
        if claims.user.email.is_empty() {
            warn!(user_id = %claims.user.uid, "token carries no email claim");
            return Err(ApiError::MissingCredential);
        }
        let user = state
            .users
            .find_by_email(&claims.user.email)
            .await?
            .ok_or(ApiError::UserNotFound)?;
        Ok(Self(user))
    }
}

/// Allowed-role set fixed at route registration time, checked after the
/// session extractor has resolved a user.
#[derive(Debug, Clone, Copy)]
pub struct RoleGuard {
    allowed: &'static [Role],
}

/// Any signed-in account.
pub const ANY_USER: RoleGuard = RoleGuard::new(&[Role::Admin, Role::User]);
/// Administrators only.
pub const ADMIN_ONLY: RoleGuard = RoleGuard::new(&[Role::Admin]);

impl RoleGuard {
    pub const fn new(allowed: &'static [Role]) -> Self {
        Self { allowed }
    }

    pub fn check(&self, user: &User) -> Result<(), ApiError> {
        if self.allowed.contains(&user.role) {
            Ok(())
        } else {
            warn!(user_id = %user.uid, role = ?user.role, "role not allowed for this route");
            Err(ApiError::InsufficientPermission)
        }
    }
}
