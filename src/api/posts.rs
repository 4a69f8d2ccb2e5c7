//! Post resource

use axum::{
    Json,
    extract::{Path, State},
    http::{Method, StatusCode},
};
use axum_extra::extract::WithRejection;

use super::{ApiJson, ApiPath, ApiResult, ApiUser, PostRequest, PostResponse, ensure_can_modify};
use crate::AppState;
use crate::data::{Post, PostScope, Viewer};
use crate::error::AppError;
use crate::forms::{FieldErrors, INVALID_IMAGE_MESSAGE, PostForm, decode_base64_upload};
use crate::service::PostService;

fn posting(state: &AppState) -> PostService {
    PostService::new(state.db.clone(), state.storage.clone())
}

/// Turn a JSON body into the same form the HTML page submits.
///
/// Missing fields fall back to `current` (partial updates).
fn to_form(request: PostRequest, current: Option<&Post>) -> ApiResult<PostForm> {
    let text = request
        .text
        .or_else(|| current.map(|post| post.text.clone()))
        .unwrap_or_default();
    let group = request
        .group
        .or_else(|| current.and_then(|post| post.group_id))
        .map(|id| id.to_string());
    let image = match request.image.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            decode_base64_upload(raw)
                .ok_or_else(|| FieldErrors::single("image", INVALID_IMAGE_MESSAGE))?,
        ),
    };

    Ok(PostForm {
        text,
        group,
        image,
        crop_data: None,
    })
}

async fn render_post(state: &AppState, viewer: Viewer, id: i64) -> ApiResult<PostResponse> {
    let view = state
        .db
        .get_post_view(viewer, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(PostResponse::from_view(&view, &state.storage))
}

async fn load_post(state: &AppState, id: i64) -> ApiResult<Post> {
    Ok(state.db.get_post(id).await?.ok_or(AppError::NotFound)?)
}

/// GET /api/v1/posts/
pub async fn list_posts(
    State(state): State<AppState>,
    ApiUser(user): ApiUser,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let posts = state
        .db
        .list_post_views(Viewer::User(user.id), PostScope::All)
        .await?;
    Ok(Json(
        posts
            .iter()
            .map(|post| PostResponse::from_view(post, &state.storage))
            .collect(),
    ))
}

/// POST /api/v1/posts/
pub async fn create_post(
    State(state): State<AppState>,
    ApiUser(user): ApiUser,
    WithRejection(Json(request), _): ApiJson<PostRequest>,
) -> ApiResult<(StatusCode, Json<PostResponse>)> {
    let form = to_form(request, None)?;
    let post = posting(&state).create_post(&user, &form).await??;
    let response = render_post(&state, Viewer::User(user.id), post.id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/posts/:id/
pub async fn get_post(
    State(state): State<AppState>,
    ApiUser(user): ApiUser,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> ApiResult<Json<PostResponse>> {
    Ok(Json(render_post(&state, Viewer::User(user.id), id).await?))
}

async fn update(
    state: AppState,
    method: Method,
    user: crate::data::User,
    id: i64,
    request: PostRequest,
    partial: bool,
) -> ApiResult<Json<PostResponse>> {
    let post = load_post(&state, id).await?;
    ensure_can_modify(&method, &user, post.author_id)?;

    let form = to_form(request, partial.then_some(&post))?;
    posting(&state).update_post(&post, &form).await??;
    Ok(Json(render_post(&state, Viewer::User(user.id), id).await?))
}

/// PUT /api/v1/posts/:id/
pub async fn replace_post(
    State(state): State<AppState>,
    method: Method,
    ApiUser(user): ApiUser,
    WithRejection(Path(id), _): ApiPath<i64>,
    WithRejection(Json(request), _): ApiJson<PostRequest>,
) -> ApiResult<Json<PostResponse>> {
    update(state, method, user, id, request, false).await
}

/// PATCH /api/v1/posts/:id/
pub async fn patch_post(
    State(state): State<AppState>,
    method: Method,
    ApiUser(user): ApiUser,
    WithRejection(Path(id), _): ApiPath<i64>,
    WithRejection(Json(request), _): ApiJson<PostRequest>,
) -> ApiResult<Json<PostResponse>> {
    update(state, method, user, id, request, true).await
}

/// DELETE /api/v1/posts/:id/
pub async fn delete_post(
    State(state): State<AppState>,
    method: Method,
    ApiUser(user): ApiUser,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let post = load_post(&state, id).await?;
    ensure_can_modify(&method, &user, post.author_id)?;
    posting(&state).delete_post(&post).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored() -> Post {
        Post {
            id: 5,
            text: "old text".to_string(),
            pub_date: Utc::now(),
            author_id: 1,
            group_id: Some(3),
            image: None,
        }
    }

    #[test]
    fn partial_update_keeps_missing_fields() {
        let request = PostRequest {
            text: Some("new text".to_string()),
            ..Default::default()
        };
        let post = stored();
        let form = to_form(request, Some(&post)).unwrap();
        assert_eq!(form.text, "new text");
        assert_eq!(form.group.as_deref(), Some("3"));
    }

    #[test]
    fn full_update_clears_missing_group() {
        let request = PostRequest {
            text: Some("new text".to_string()),
            ..Default::default()
        };
        let form = to_form(request, None).unwrap();
        assert!(form.group.is_none());
    }

    #[test]
    fn undecodable_image_is_a_field_error() {
        let request = PostRequest {
            text: Some("hello".to_string()),
            image: Some("%%%not-base64%%%".to_string()),
            ..Default::default()
        };
        assert!(matches!(to_form(request, None), Err(super::super::ApiError::Fields(_))));
    }
}
