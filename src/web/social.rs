//! Like and follow toggles

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;

use super::{group_url, parse_id, profile_url};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::{LikeResponse, SocialService};

fn social(state: &AppState) -> SocialService {
    SocialService::new(state.db.clone())
}

#[derive(Debug, Deserialize)]
pub struct LikeQuery {
    post_id: Option<String>,
    /// Count currently displayed by the client
    num_likes: Option<String>,
}

impl LikeQuery {
    fn post_id(&self) -> Result<i64, AppError> {
        parse_id(self.post_id.as_deref().unwrap_or("").trim())
    }
}

/// GET /like/?post_id=&num_likes=
pub async fn post_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LikeQuery>,
) -> Result<Json<LikeResponse>, AppError> {
    social(&state).like(&user, query.post_id()?).await?;
    Ok(Json(LikeResponse::liked(query.num_likes.as_deref())))
}

/// GET /removelike/?post_id=&num_likes=
pub async fn post_remove_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LikeQuery>,
) -> Result<Json<LikeResponse>, AppError> {
    social(&state).unlike(&user, query.post_id()?).await?;
    Ok(Json(LikeResponse::unliked(query.num_likes.as_deref())))
}

/// GET /:username/follow/
pub async fn profile_follow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    social(&state).follow(&user, &username).await?;
    Ok(Redirect::to(&profile_url(&username)))
}

/// GET /:username/unfollow/
pub async fn profile_unfollow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    social(&state).unfollow(&user, &username).await?;
    Ok(Redirect::to(&profile_url(&username)))
}

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    overview: Option<String>,
}

impl OverviewQuery {
    /// Back to the groups overview, or to the group page
    fn redirect(&self, slug: &str) -> Redirect {
        match self.overview.as_deref() {
            Some(flag) if !flag.is_empty() => Redirect::to("/groups/"),
            _ => Redirect::to(&group_url(slug)),
        }
    }
}

/// GET /group/:slug/follow/
pub async fn group_follow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
    Query(query): Query<OverviewQuery>,
) -> Result<Redirect, AppError> {
    social(&state).follow_group(&user, &slug).await?;
    Ok(query.redirect(&slug))
}

/// GET /group/:slug/unfollow/
pub async fn group_unfollow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
    Query(query): Query<OverviewQuery>,
) -> Result<Redirect, AppError> {
    social(&state).unfollow_group(&user, &slug).await?;
    Ok(query.redirect(&slug))
}
