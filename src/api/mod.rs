//! REST API
//!
//! JSON resources under `/api/v1`:
//! - users and groups (read-only)
//! - posts and their comments (read/write, author-only writes)
//! - token issuing for API clients
//!
//! Plus the operational endpoints (`/metrics`, `/health`).

mod comments;
mod directory;
mod dto;
pub mod metrics;
mod posts;
mod token;

use axum::{
    Json, Router, async_trait,
    extract::{
        FromRef, FromRequestParts, Path,
        rejection::{JsonRejection, PathRejection},
    },
    http::{Method, StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use serde_json::json;

use crate::AppState;
use crate::data::User;
use crate::error::AppError;
use crate::forms::FieldErrors;

pub use dto::*;
pub use metrics::ops_router;

/// Create REST API router
pub fn rest_api_router() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/token/", post(token::obtain_token))
        .route("/v1/users/", get(directory::list_users))
        .route("/v1/users/:id/", get(directory::get_user))
        .route("/v1/groups/", get(directory::list_groups))
        .route("/v1/groups/:id/", get(directory::get_group))
        .route("/v1/posts/", get(posts::list_posts).post(posts::create_post))
        .route(
            "/v1/posts/:id/",
            get(posts::get_post)
                .put(posts::replace_post)
                .patch(posts::patch_post)
                .delete(posts::delete_post),
        )
        .route(
            "/v1/posts/:post_id/comments/",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/v1/posts/:post_id/comments/:id/",
            get(comments::get_comment)
                .put(comments::replace_comment)
                .patch(comments::patch_comment)
                .delete(comments::delete_comment),
        )
}

/// Error body for API clients: `{"detail": ...}`, or a field map for
/// validation failures.
#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    Fields(FieldErrors),
    /// Body the JSON extractor refused (syntax, content type, shape)
    Body(StatusCode, String),
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        ApiError::App(error)
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Fields(errors)
    }
}

/// Ids in API paths that do not parse name nothing
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(%rejection, "Rejected API path");
        ApiError::App(AppError::NotFound)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection.status(), rejection.body_text())
    }
}

/// Path extractor answering with a JSON error body
pub(crate) type ApiPath<T> = WithRejection<Path<T>, ApiError>;

/// JSON body extractor answering with a JSON error body
pub(crate) type ApiJson<T> = WithRejection<Json<T>, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Fields(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            ApiError::Body(status, detail) => {
                crate::metrics::ERRORS_TOTAL
                    .with_label_values(&["bad_request"])
                    .inc();
                (status, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::App(error) => {
                error.record();
                let (status, _) = error.status_and_kind();
                let detail = match &error {
                    AppError::NotFound => "Not found.".to_string(),
                    AppError::Unauthorized => {
                        "Authentication credentials were not provided.".to_string()
                    }
                    AppError::Forbidden => {
                        "You do not have permission to perform this action.".to_string()
                    }
                    other => other.public_message(),
                };
                (status, Json(json!({ "detail": detail }))).into_response()
            }
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Extractor for the authenticated API caller; anonymous is a 401.
#[derive(Debug, Clone)]
pub struct ApiUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for ApiUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        crate::auth::authenticate(parts, &state)
            .await?
            .map(ApiUser)
            .ok_or(ApiError::App(AppError::Unauthorized))
    }
}

/// Object-level write rule: reads are open to any authenticated
/// caller, writes only to the object's author.
pub fn can_modify(method: &Method, user: &User, author_id: i64) -> bool {
    method.is_safe() || user.id == author_id
}

pub(crate) fn ensure_can_modify(method: &Method, user: &User, author_id: i64) -> ApiResult<()> {
    if can_modify(method, user, author_id) {
        Ok(())
    } else {
        tracing::info!(user_id = user.id, author_id, %method, "Rejected write by non-author");
        Err(AppError::Forbidden.into())
    }
}
