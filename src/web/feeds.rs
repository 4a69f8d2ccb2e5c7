//! Listing and read-only pages

use axum::{
    extract::{Path, Query, State},
    response::Html,
};

use super::{PageQuery, parse_id, render};
use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::AppError;
use crate::service::FeedService;

fn feeds(state: &AppState) -> FeedService {
    FeedService::new(state.db.clone())
}

/// GET /
pub async fn index(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let page = feeds(&state)
        .index(viewer.viewer(), query.page.as_deref())
        .await?;
    Ok(render::feed_page("Latest posts", &page, viewer.0.as_ref(), &state.storage))
}

/// GET /group/:slug/
pub async fn group_posts(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let feed = feeds(&state)
        .group(viewer.viewer(), &slug, query.page.as_deref())
        .await?;
    Ok(render::group_page(
        &feed.group,
        feed.is_followed,
        &feed.page,
        viewer.0.as_ref(),
        &state.storage,
    ))
}

/// GET /groups/
pub async fn groups_overview(
    State(state): State<AppState>,
    viewer: MaybeUser,
) -> Result<Html<String>, AppError> {
    let groups = feeds(&state).groups_overview(viewer.viewer()).await?;
    Ok(render::groups_overview_page(&groups, viewer.0.as_ref()))
}

/// GET /:username/
pub async fn profile(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let profile = feeds(&state)
        .profile(viewer.viewer(), &username, query.page.as_deref())
        .await?;
    Ok(render::profile_page(
        &profile.author,
        profile.follow,
        profile.last_seen,
        &profile.page,
        viewer.0.as_ref(),
        &state.storage,
    ))
}

/// GET /:username/:post_id/
pub async fn post_view(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path((username, post_id)): Path<(String, String)>,
) -> Result<Html<String>, AppError> {
    let post_id = parse_id(&post_id)?;
    let detail = feeds(&state)
        .post_detail(viewer.viewer(), &username, post_id)
        .await?;
    Ok(render::post_page(
        render::PostPage {
            post: &detail.post,
            author: &detail.author,
            comments: &detail.comments,
            follow: detail.follow,
            last_seen: detail.last_seen,
        },
        viewer.0.as_ref(),
        &state.storage,
    ))
}

/// GET /follow/
pub async fn follow_index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let page = feeds(&state)
        .follow_index(&user, query.page.as_deref())
        .await?;
    Ok(render::feed_page("Following", &page, Some(&user), &state.storage))
}

/// GET /groups/follow/
pub async fn follow_groups(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let page = feeds(&state)
        .follow_groups(&user, query.page.as_deref())
        .await?;
    Ok(render::feed_page("My groups", &page, Some(&user), &state.storage))
}

/// GET /liked/
pub async fn liked_posts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let page = feeds(&state).liked(&user, query.page.as_deref()).await?;
    Ok(render::feed_page("Liked posts", &page, Some(&user), &state.storage))
}
