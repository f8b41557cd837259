use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::dto::MessageResponse;
use crate::auth::extractors::{CurrentUser, ADMIN_ONLY, ANY_USER};
use crate::books::repo_types::Book;
use crate::errors::ApiError;
use crate::state::AppState;
use crate::tags::dto::{normalize_tag_name, TagAddRequest, TagCreateRequest};
use crate::tags::repo_types::Tag;

pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/:tag_uid", delete(delete_tag))
        .route("/tags/book/:book_uid", post(add_tags_to_book))
}

#[instrument(skip(state, user))]
pub async fn list_tags(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Tag>>, ApiError> {
    ANY_USER.check(&user)?;
    let tags = Tag::list(&state.db).await?;
    Ok(Json(tags))
}

#[instrument(skip(state, user, payload))]
pub async fn create_tag(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<TagCreateRequest>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    ANY_USER.check(&user)?;
    let name = normalize_tag_name(&payload.name)?;

    if Tag::find_by_name(&state.db, &name).await?.is_some() {
        warn!(name = %name, "tag already exists");
        return Err(ApiError::TagAlreadyExists);
    }

    let tag = Tag::create(&state.db, &name).await?;
    info!(tag_id = %tag.uid, name = %tag.name, "tag created");
    Ok((StatusCode::CREATED, Json(tag)))
}

/// Attaches every named tag to the book, creating the missing ones.
#[instrument(skip(state, user, payload))]
pub async fn add_tags_to_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(book_uid): Path<Uuid>,
    Json(payload): Json<TagAddRequest>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    ANY_USER.check(&user)?;
    if payload.tags.is_empty() {
        return Err(ApiError::InvalidInput("at least one tag is required".into()));
    }
    // All names must pass before anything is written.
    let names = payload
        .tags
        .iter()
        .map(|t| normalize_tag_name(&t.name))
        .collect::<Result<Vec<_>, _>>()?;

    let book = Book::find(&state.db, book_uid)
        .await?
        .ok_or(ApiError::BookNotFound)?;

    for name in &names {
        let tag = Tag::get_or_create(&state.db, name).await?;
        Tag::attach(&state.db, tag.uid, book.uid).await?;
    }
    info!(book_id = %book.uid, user_id = %user.uid, count = names.len(), "tags attached");

    let tags = Tag::list_by_book(&state.db, book.uid).await?;
    Ok(Json(tags))
}

#[instrument(skip(state, user))]
pub async fn delete_tag(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(tag_uid): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    // Deleting a tag detaches it everywhere, so members cannot do it.
    ADMIN_ONLY.check(&user)?;

    Tag::delete(&state.db, tag_uid)
        .await?
        .ok_or(ApiError::TagNotFound)?;

    info!(tag_id = %tag_uid, user_id = %user.uid, "tag deleted");
    Ok(Json(MessageResponse {
        message: "Tag deleted successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::app::build_app;
    use crate::state::AppState;
    use axum::body::{to_bytes, Body};
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use tower::ServiceExt;

    fn test_app(state: AppState) -> Router {
        build_app(state).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 52300))))
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

    async fn access_token(app: &Router) -> String {
        request(
            app,
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "username": "janedoe",
                "email": "jane@example.com",
                "password": "sup3r-secret",
                "first_name": "Jane",
                "last_name": "Doe",
            })),
        )
        .await;
        let (_, body) = request(
            app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "jane@example.com", "password": "sup3r-secret"})),
        )
        .await;
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn tags_require_an_access_token() {
        let app = test_app(AppState::fake());
        let (status, body) = request(&app, Method::GET, "/api/v1/tags", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "missing_credentials");
    }

    #[tokio::test]
    async fn create_rejects_a_reserved_name() {
        let app = test_app(AppState::fake());
        let access = access_token(&app).await;

        let (status, body) = request(
            &app,
            Method::POST,
            "/api/v1/tags",
            Some(&access),
            Some(json!({"name": "Admin"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "invalid_input");
    }

    #[tokio::test]
    async fn attach_validates_every_name_up_front() {
        let app = test_app(AppState::fake());
        let access = access_token(&app).await;
        let book_uid = uuid::Uuid::new_v4();

        let (status, body) = request(
            &app,
            Method::POST,
            &format!("/api/v1/tags/book/{book_uid}"),
            Some(&access),
            Some(json!({"tags": [{"name": "fantasy"}, {"name": "c++"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "invalid_input");

        let (status, body) = request(
            &app,
            Method::POST,
            &format!("/api/v1/tags/book/{book_uid}"),
            Some(&access),
            Some(json!({"tags": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "invalid_input");
    }

    #[tokio::test]
    async fn delete_requires_the_admin_role() {
        let app = test_app(AppState::fake());
        let access = access_token(&app).await;
        let tag_uid = uuid::Uuid::new_v4();

        let (status, body) = request(
            &app,
            Method::DELETE,
            &format!("/api/v1/tags/{tag_uid}"),
            Some(&access),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "insufficient_permissions");
    }
}
