use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::auth::claims::{TokenKind, UserClaims};
use crate::auth::dto::{
    LoginRequest, LoginResponse, MessageResponse, PublicUser, RefreshResponse, SignupRequest,
    SignupResponse,
};
use crate::auth::extractors::{AccessClaims, CurrentUser, RefreshClaims, ANY_USER};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::NewUser;
use crate::errors::ApiError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/verify/:token", get(verify_email))
        .route("/auth/login", post(login))
        .route("/auth/refresh_token", get(refresh_token))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    email.len() <= 40 && EMAIL_RE.is_match(email)
}

impl SignupRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if !is_valid_email(&self.email) {
            return Err(ApiError::InvalidInput("invalid email address".into()));
        }
        if self.password.len() < 6 || self.password.len() > 100 {
            return Err(ApiError::InvalidInput(
                "password must be between 6 and 100 characters".into(),
            ));
        }
        if self.username.len() < 3 || self.username.len() > 50 {
            return Err(ApiError::InvalidInput(
                "username must be between 3 and 50 characters".into(),
            ));
        }
        if self.first_name.is_empty()
            || self.first_name.len() > 50
            || self.last_name.is_empty()
            || self.last_name.len() > 50
        {
            return Err(ApiError::InvalidInput(
                "first and last name must be between 1 and 50 characters".into(),
            ));
        }
        Ok(())
    }
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();
    payload.first_name = payload.first_name.trim().to_string();
    payload.last_name = payload.last_name.trim().to_string();
    payload.validate()?;

    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "signup with an already registered email");
        return Err(ApiError::UserAlreadyExists);
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(NewUser {
            username: payload.username,
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            password_hash,
        })
        .await?;

    let token = state.verify_codec.issue(&user.email);
    let link = format!("http://{}/api/v1/auth/verify/{token}", state.config.domain);
    // The account exists either way; a mail failure only downgrades the
    // response with a warning.
    let warning = match state
        .mailer
        .enqueue_verification(&user.email, &user.first_name, &link)
        .await
    {
        Ok(()) => None,
        Err(e) => {
            warn!(error = %e, user_id = %user.uid, "could not queue the verification email");
            Some(
                "Account created, but the verification email could not be sent. \
                 Request a new link later."
                    .to_string(),
            )
        }
    };

    info!(user_id = %user.uid, email = %user.email, "user signed up");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Account created! Check your email to verify your account.".into(),
            user,
            warning,
        }),
    ))
}

#[instrument(skip(state, token))]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = state
        .verify_codec
        .decode(&token, state.config.verify_token_max_age_secs)
        .map_err(|e| {
            debug!(error = %e, "verification token rejected");
            ApiError::InvalidToken
        })?;

    // Re-verifying is a no-op, so a twice-clicked link still lands on 200.
    let user = state
        .users
        .mark_verified(&email)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    info!(user_id = %user.uid, "email verified");
    Ok(Json(MessageResponse {
        message: "Account verified successfully.".into(),
    }))
}

#[instrument(skip(state, payload, addr), fields(client = %addr.ip()))]
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if !state.login_limiter.allow(addr.ip()) {
        return Err(ApiError::TooManyRequests);
    }

    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password must be indistinguishable from
    // the outside.
    let Some(user) = state.users.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login with an unknown email");
        return Err(ApiError::InvalidCredentials);
    };
    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.uid, "login with a wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let snapshot = UserClaims::from(&user);
    let access_token = state.jwt.issue(snapshot.clone(), TokenKind::Access)?;
    let refresh_token = state.jwt.issue(snapshot, TokenKind::Refresh)?;

    info!(user_id = %user.uid, "user logged in");
    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        access_token,
        refresh_token,
        token_type: "bearer".into(),
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, claims))]
pub async fn refresh_token(
    State(state): State<AppState>,
    RefreshClaims(claims): RefreshClaims,
) -> Result<Json<RefreshResponse>, ApiError> {
    // Decoding has already checked exp; this guard stays because the
    // handler mints fresh credentials and must not trust a stale claim.
    if (claims.exp as i64) <= OffsetDateTime::now_utc().unix_timestamp() {
        return Err(ApiError::InvalidToken);
    }

    // The presented refresh token stays valid until its own expiry; it
    // is not rotated here.
    let access_token = state.jwt.issue(claims.user, TokenKind::Access)?;
    Ok(Json(RefreshResponse {
        access_token,
        token_type: "bearer".into(),
    }))
}

#[instrument(skip(state, claims))]
pub async fn logout(
    State(state): State<AppState>,
    AccessClaims(claims): AccessClaims,
) -> Result<Json<MessageResponse>, ApiError> {
    let remaining = claims.exp as i64 - OffsetDateTime::now_utc().unix_timestamp();
    // The deny write is awaited before answering; acknowledging a logout
    // that could still be replayed would be a lie.
    state
        .deny_list
        .deny(claims.jti, claims.user.uid, remaining, "logout")
        .await?;

    info!(user_id = %claims.user.uid, jti = %claims.jti, "session revoked");
    Ok(Json(MessageResponse {
        message: "Token has been revoked successfully.".into(),
    }))
}

#[instrument(skip(user))]
pub async fn me(CurrentUser(user): CurrentUser) -> Result<Json<crate::auth::repo_types::User>, ApiError> {
    ANY_USER.check(&user)?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use crate::auth::repo::{MemoryUserStore, UserStore};
    use crate::denylist::MemoryDenyList;
    use crate::mail::MailDispatch;
    use axum::body::{to_bytes, Body};
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_app(state: AppState) -> Router {
        build_app(state).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 52000))))
    }

    async fn request(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn signup_body(email: &str) -> Value {
        json!({
            "username": "janedoe",
            "email": email,
            "password": "sup3r-secret",
            "first_name": "Jane",
            "last_name": "Doe",
        })
    }

    async fn signup(app: &Router, email: &str) -> (StatusCode, Value) {
        request(
            app,
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(signup_body(email)),
        )
        .await
    }

    async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
        request(
            app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    #[tokio::test]
    async fn signup_creates_an_unverified_member() {
        let app = test_app(AppState::fake());
        let (status, body) = signup(&app, "jane@example.com").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "jane@example.com");
        assert_eq!(body["user"]["role"], "user");
        assert_eq!(body["user"]["is_verified"], false);
        assert!(body["user"].get("password_hash").is_none());
        assert!(body.get("warning").is_none());
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_emails() {
        let app = test_app(AppState::fake());
        signup(&app, "jane@example.com").await;
        let (status, body) = signup(&app, "jane@example.com").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "user_exists");
    }

    #[tokio::test]
    async fn signup_validates_the_payload() {
        let app = test_app(AppState::fake());

        let (status, body) = request(
            &app,
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "username": "janedoe",
                "email": "not-an-email",
                "password": "sup3r-secret",
                "first_name": "Jane",
                "last_name": "Doe",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "invalid_input");

        let (status, body) = request(
            &app,
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "username": "janedoe",
                "email": "jane@example.com",
                "password": "short",
                "first_name": "Jane",
                "last_name": "Doe",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "invalid_input");
    }

    #[tokio::test]
    async fn signup_warns_when_mail_cannot_be_queued() {
        struct FailingMailer;
        #[async_trait::async_trait]
        impl MailDispatch for FailingMailer {
            async fn enqueue_verification(&self, _: &str, _: &str, _: &str) -> anyhow::Result<()> {
                anyhow::bail!("queue full")
            }
        }

        let fake = AppState::fake();
        let state = AppState::from_parts(
            fake.db.clone(),
            fake.config.clone(),
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryDenyList::default()),
            Arc::new(FailingMailer),
        )
        .unwrap();
        let app = test_app(state);

        let (status, body) = signup(&app, "jane@example.com").await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["warning"].as_str().unwrap().contains("could not be sent"));
    }

    #[tokio::test]
    async fn verification_link_flips_the_flag_and_is_idempotent() {
        let state = AppState::fake();
        let app = test_app(state.clone());
        signup(&app, "jane@example.com").await;

        let token = state.verify_codec.issue("jane@example.com");
        let uri = format!("/api/v1/auth/verify/{token}");
        let (status, body) = request(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Account verified successfully.");

        let user = state
            .users
            .find_by_email("jane@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(user.is_verified);

        // A twice-clicked link still succeeds.
        let (status, _) = request(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn tampered_verification_token_is_rejected() {
        let state = AppState::fake();
        let app = test_app(state.clone());
        signup(&app, "jane@example.com").await;

        let mut token = state.verify_codec.issue("jane@example.com");
        token.push('0');
        let (status, body) =
            request(&app, Method::GET, &format!("/api/v1/auth/verify/{token}"), None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "invalid_token");
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_answer_identically() {
        let app = test_app(AppState::fake());
        signup(&app, "jane@example.com").await;

        let (unknown_status, unknown_body) = login(&app, "ghost@example.com", "sup3r-secret").await;
        let (wrong_status, wrong_body) = login(&app, "jane@example.com", "wrong-password").await;

        assert_eq!(unknown_status, StatusCode::BAD_REQUEST);
        assert_eq!(unknown_status, wrong_status);
        assert_eq!(unknown_body, wrong_body);
        assert_eq!(unknown_body["error_code"], "invalid_email_or_password");
    }

    #[tokio::test]
    async fn login_issues_a_usable_token_pair() {
        let app = test_app(AppState::fake());
        signup(&app, "jane@example.com").await;

        let (status, body) = login(&app, "jane@example.com", "sup3r-secret").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["user"]["email"], "jane@example.com");

        let access = body["access_token"].as_str().unwrap();
        let (status, body) =
            request(&app, Method::GET, "/api/v1/auth/me", Some(access), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "jane@example.com");
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn me_without_a_token_is_unauthorized() {
        let app = test_app(AppState::fake());
        let (status, body) = request(&app, Method::GET, "/api/v1/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "missing_credentials");
        assert_eq!(body["resolution"], "Please provide an Authorization header");
    }

    #[tokio::test]
    async fn me_rejects_a_refresh_token() {
        let app = test_app(AppState::fake());
        signup(&app, "jane@example.com").await;
        let (_, body) = login(&app, "jane@example.com", "sup3r-secret").await;

        let refresh = body["refresh_token"].as_str().unwrap();
        let (status, body) =
            request(&app, Method::GET, "/api/v1/auth/me", Some(refresh), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "access_token_required");
    }

    #[tokio::test]
    async fn refresh_rejects_an_access_token() {
        let app = test_app(AppState::fake());
        signup(&app, "jane@example.com").await;
        let (_, body) = login(&app, "jane@example.com", "sup3r-secret").await;

        let access = body["access_token"].as_str().unwrap();
        let (status, body) = request(
            &app,
            Method::GET,
            "/api/v1/auth/refresh_token",
            Some(access),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "refresh_token_required");
    }

    #[tokio::test]
    async fn refresh_mints_a_fresh_access_token() {
        let app = test_app(AppState::fake());
        signup(&app, "jane@example.com").await;
        let (_, body) = login(&app, "jane@example.com", "sup3r-secret").await;

        let refresh = body["refresh_token"].as_str().unwrap();
        let (status, body) = request(
            &app,
            Method::GET,
            "/api/v1/auth/refresh_token",
            Some(refresh),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");

        let access = body["access_token"].as_str().unwrap();
        let (status, body) =
            request(&app, Method::GET, "/api/v1/auth/me", Some(access), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "jane@example.com");
    }

    #[tokio::test]
    async fn logout_revokes_the_access_token() {
        let app = test_app(AppState::fake());
        signup(&app, "jane@example.com").await;
        let (_, body) = login(&app, "jane@example.com", "sup3r-secret").await;
        let access = body["access_token"].as_str().unwrap().to_string();

        let (status, body) = request(
            &app,
            Method::POST,
            "/api/v1/auth/logout",
            Some(&access),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Token has been revoked successfully.");

        // The revoked token reads exactly like an invalid one.
        let (status, body) =
            request(&app, Method::GET, "/api/v1/auth/me", Some(&access), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "invalid_token");
    }

    #[tokio::test]
    async fn login_is_rate_limited_per_address() {
        let app = test_app(AppState::fake());

        for _ in 0..5 {
            let (status, _) = login(&app, "ghost@example.com", "wrong").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        let (status, body) = login(&app, "ghost@example.com", "wrong").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error_code"], "too_many_requests");
    }

    #[tokio::test]
    async fn full_session_lifecycle() {
        let state = AppState::fake();
        let app = test_app(state.clone());

        let (status, _) = signup(&app, "alice@example.com").await;
        assert_eq!(status, StatusCode::CREATED);

        let token = state.verify_codec.issue("alice@example.com");
        let (status, _) =
            request(&app, Method::GET, &format!("/api/v1/auth/verify/{token}"), None, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = login(&app, "alice@example.com", "sup3r-secret").await;
        assert_eq!(status, StatusCode::OK);
        let access = body["access_token"].as_str().unwrap().to_string();

        let (status, body) =
            request(&app, Method::GET, "/api/v1/auth/me", Some(&access), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_verified"], true);

        let (status, _) = request(
            &app,
            Method::POST,
            "/api/v1/auth/logout",
            Some(&access),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) =
            request(&app, Method::GET, "/api/v1/auth/me", Some(&access), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
