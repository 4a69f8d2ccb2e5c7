//! Comment resource, nested under a post

use axum::{
    Json,
    extract::{Path, State},
    http::{Method, StatusCode},
};
use axum_extra::extract::WithRejection;

use super::{ApiJson, ApiPath, ApiResult, ApiUser, CommentRequest, CommentResponse, ensure_can_modify};
use crate::AppState;
use crate::data::{CommentView, User};
use crate::error::AppError;
use crate::forms::CommentForm;
use crate::service::PostService;

async fn load_comment(state: &AppState, post_id: i64, id: i64) -> ApiResult<CommentView> {
    Ok(state
        .db
        .get_comment_view(post_id, id)
        .await?
        .ok_or(AppError::NotFound)?)
}

/// GET /api/v1/posts/:post_id/comments/
pub async fn list_comments(
    State(state): State<AppState>,
    ApiUser(_user): ApiUser,
    WithRejection(Path(post_id), _): ApiPath<i64>,
) -> ApiResult<Json<Vec<CommentResponse>>> {
    let comments = state.db.list_comments(post_id).await?;
    Ok(Json(comments.iter().map(CommentResponse::from).collect()))
}

/// POST /api/v1/posts/:post_id/comments/
pub async fn create_comment(
    State(state): State<AppState>,
    ApiUser(user): ApiUser,
    WithRejection(Path(post_id), _): ApiPath<i64>,
    WithRejection(Json(request), _): ApiJson<CommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentResponse>)> {
    let post = state.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;

    let form = CommentForm {
        text: request.text.unwrap_or_default(),
    };
    let comment = PostService::new(state.db.clone(), state.storage.clone())
        .create_comment(&user, post.id, &form)
        .await??;

    let view = load_comment(&state, post.id, comment.id).await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::from(&view))))
}

/// GET /api/v1/posts/:post_id/comments/:id/
pub async fn get_comment(
    State(state): State<AppState>,
    ApiUser(_user): ApiUser,
    WithRejection(Path((post_id, id)), _): ApiPath<(i64, i64)>,
) -> ApiResult<Json<CommentResponse>> {
    let view = load_comment(&state, post_id, id).await?;
    Ok(Json(CommentResponse::from(&view)))
}

async fn update(
    state: AppState,
    method: Method,
    user: User,
    (post_id, id): (i64, i64),
    request: CommentRequest,
    partial: bool,
) -> ApiResult<Json<CommentResponse>> {
    let current = load_comment(&state, post_id, id).await?;
    ensure_can_modify(&method, &user, current.author_id)?;

    let text = match request.text {
        Some(text) => text,
        None if partial => current.text.clone(),
        None => String::new(),
    };
    let text = CommentForm { text }.validate()?;
    state.db.update_comment(id, &text).await?;

    let view = load_comment(&state, post_id, id).await?;
    Ok(Json(CommentResponse::from(&view)))
}

/// PUT /api/v1/posts/:post_id/comments/:id/
pub async fn replace_comment(
    State(state): State<AppState>,
    method: Method,
    ApiUser(user): ApiUser,
    WithRejection(Path(ids), _): ApiPath<(i64, i64)>,
    WithRejection(Json(request), _): ApiJson<CommentRequest>,
) -> ApiResult<Json<CommentResponse>> {
    update(state, method, user, ids, request, false).await
}

/// PATCH /api/v1/posts/:post_id/comments/:id/
pub async fn patch_comment(
    State(state): State<AppState>,
    method: Method,
    ApiUser(user): ApiUser,
    WithRejection(Path(ids), _): ApiPath<(i64, i64)>,
    WithRejection(Json(request), _): ApiJson<CommentRequest>,
) -> ApiResult<Json<CommentResponse>> {
    update(state, method, user, ids, request, true).await
}

/// DELETE /api/v1/posts/:post_id/comments/:id/
pub async fn delete_comment(
    State(state): State<AppState>,
    method: Method,
    ApiUser(user): ApiUser,
    WithRejection(Path((post_id, id)), _): ApiPath<(i64, i64)>,
) -> ApiResult<StatusCode> {
    let comment = load_comment(&state, post_id, id).await?;
    ensure_can_modify(&method, &user, comment.author_id)?;
    state.db.delete_comment(comment.id).await?;
    tracing::info!(comment_id = comment.id, "Comment deleted");
    Ok(StatusCode::NO_CONTENT)
}
