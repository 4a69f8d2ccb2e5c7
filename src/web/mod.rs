//! Posts app pages
//!
//! HTML handlers mounted at the site root. Handlers extract the viewer,
//! call into the service layer and render or redirect.

mod editing;
mod feeds;
pub mod render;
mod social;

use axum::{
    Router,
    extract::{Multipart, OriginalUri},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::forms::{PostForm, Upload};

/// Largest accepted image upload
pub const MAX_IMAGE_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Create the posts app router
pub fn posts_router() -> Router<AppState> {
    Router::new()
        .route("/", get(feeds::index))
        .route("/group/:slug/", get(feeds::group_posts))
        .route("/groups/", get(feeds::groups_overview))
        .route("/groups/follow/", get(feeds::follow_groups))
        .route("/groups/new/", get(editing::new_group_form).post(editing::new_group))
        .route("/group/:slug/follow/", get(social::group_follow))
        .route("/group/:slug/unfollow/", get(social::group_unfollow))
        .route("/new/", get(editing::new_post_form).post(editing::new_post))
        .route("/follow/", get(feeds::follow_index))
        .route("/like/", get(social::post_like))
        .route("/removelike/", get(social::post_remove_like))
        .route("/liked/", get(feeds::liked_posts))
        .route("/:username/", get(feeds::profile))
        .route("/:username/follow/", get(social::profile_follow))
        .route("/:username/unfollow/", get(social::profile_unfollow))
        .route("/:username/:post_id/", get(feeds::post_view))
        .route(
            "/:username/:post_id/edit/",
            get(editing::post_edit_form).post(editing::post_edit),
        )
        .route("/:username/:post_id/comment", post(editing::add_comment))
        .route(
            "/:username/:post_id/remove-comment/:comment_id",
            get(editing::del_comment),
        )
}

/// Unknown routes
pub async fn not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    crate::metrics::ERRORS_TOTAL
        .with_label_values(&["not_found"])
        .inc();
    (StatusCode::NOT_FOUND, render::not_found_page(Some(uri.path())))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageQuery {
    page: Option<String>,
}

/// Numeric ids in paths; anything else is a missing page
pub(crate) fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

pub(crate) fn profile_url(username: &str) -> String {
    format!("/{}/", urlencoding::encode(username))
}

pub(crate) fn post_url(username: &str, post_id: i64) -> String {
    format!("/{}/{}/", urlencoding::encode(username), post_id)
}

pub(crate) fn group_url(slug: &str) -> String {
    format!("/group/{}/", urlencoding::encode(slug))
}

/// Collect the multipart post form
pub(crate) async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, AppError> {
    let mut form = PostForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to parse multipart: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(str::to_string);

                let mut data = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {}", e)))?
                {
                    if data.len() + chunk.len() > MAX_IMAGE_UPLOAD_BYTES {
                        return Err(AppError::Validation(format!(
                            "File too large: exceeds {} bytes",
                            MAX_IMAGE_UPLOAD_BYTES
                        )));
                    }
                    data.extend_from_slice(&chunk);
                }

                form.image = Some(Upload {
                    filename,
                    content_type,
                    data,
                });
            }
            "text" | "group" | "crop_data" => {
                let value = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read {}: {}", field_name, e))
                })?;
                match field_name.as_str() {
                    "text" => form.text = value,
                    "group" => form.group = Some(value),
                    _ => form.crop_data = Some(value),
                }
            }
            _ => {}
        }
    }

    Ok(form)
}
