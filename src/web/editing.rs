//! Post, comment and group forms

use axum::{
    Form,
    extract::{Multipart, Path, State},
    response::{IntoResponse, Redirect, Response},
};

use super::{parse_id, post_url, read_post_form, render};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::forms::{CommentForm, FieldErrors, GroupForm};
use crate::service::PostService;

fn posting(state: &AppState) -> PostService {
    PostService::new(state.db.clone(), state.storage.clone())
}

/// GET /new/
pub async fn new_post_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let groups = state.db.list_groups().await?;
    let values = render::PostFormValues {
        text: "",
        group: None,
        editing: None,
    };
    Ok(render::post_form_page(values, &groups, &FieldErrors::new(), Some(&user)).into_response())
}

/// POST /new/
pub async fn new_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_post_form(multipart).await?;

    match posting(&state).create_post(&user, &form).await? {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(errors) => {
            let groups = state.db.list_groups().await?;
            let values = render::PostFormValues {
                text: &form.text,
                group: form.group.as_deref(),
                editing: None,
            };
            Ok(render::post_form_page(values, &groups, &errors, Some(&user)).into_response())
        }
    }
}

/// GET /:username/:post_id/edit/
pub async fn post_edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((username, post_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let post_id = parse_id(&post_id)?;
    let post = posting(&state).find_post(&username, post_id).await?;
    if post.author_id != user.id {
        return Ok(Redirect::to(&post_url(&username, post_id)).into_response());
    }

    let groups = state.db.list_groups().await?;
    let group = post.group_id.map(|id| id.to_string());
    let values = render::PostFormValues {
        text: &post.text,
        group: group.as_deref(),
        editing: Some((username.as_str(), post.id)),
    };
    Ok(render::post_form_page(values, &groups, &FieldErrors::new(), Some(&user)).into_response())
}

/// POST /:username/:post_id/edit/
///
/// Anyone but the author is sent back to the post untouched.
pub async fn post_edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((username, post_id)): Path<(String, String)>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let post_id = parse_id(&post_id)?;
    let service = posting(&state);
    let post = service.find_post(&username, post_id).await?;
    if post.author_id != user.id {
        tracing::info!(post_id, user_id = user.id, "Rejected edit by non-author");
        return Ok(Redirect::to(&post_url(&username, post_id)).into_response());
    }

    let form = read_post_form(multipart).await?;
    match service.update_post(&post, &form).await? {
        Ok(_) => Ok(Redirect::to(&post_url(&username, post_id)).into_response()),
        Err(errors) => {
            let groups = state.db.list_groups().await?;
            let values = render::PostFormValues {
                text: &form.text,
                group: form.group.as_deref(),
                editing: Some((username.as_str(), post.id)),
            };
            Ok(render::post_form_page(values, &groups, &errors, Some(&user)).into_response())
        }
    }
}

/// POST /:username/:post_id/comment
pub async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((username, post_id)): Path<(String, String)>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, AppError> {
    let post_id = parse_id(&post_id)?;
    posting(&state)
        .add_comment(&user, &username, post_id, &form)
        .await?;
    Ok(Redirect::to(&post_url(&username, post_id)))
}

/// GET /:username/:post_id/remove-comment/:comment_id
pub async fn del_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((username, post_id, comment_id)): Path<(String, String, String)>,
) -> Result<Redirect, AppError> {
    let post_id = parse_id(&post_id)?;
    let comment_id = parse_id(&comment_id)?;
    posting(&state).remove_comment(&user, comment_id).await?;
    Ok(Redirect::to(&post_url(&username, post_id)))
}

/// GET /groups/new/
pub async fn new_group_form(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    render::group_form_page("", "", &FieldErrors::new(), Some(&user))
}

/// POST /groups/new/
pub async fn new_group(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<GroupForm>,
) -> Result<Response, AppError> {
    match posting(&state).create_group(&form).await? {
        Ok(_) => Ok(Redirect::to("/groups/").into_response()),
        Err(errors) => Ok(render::group_form_page(
            &form.title,
            &form.description,
            &errors,
            Some(&user),
        )
        .into_response()),
    }
}
