//! Read-only user and group resources

use axum::{
    Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;

use super::{ApiPath, ApiResult, GroupResponse, UserResponse};
use crate::AppState;
use crate::error::AppError;

/// GET /api/v1/users/
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = state.db.list_users().await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// GET /api/v1/users/:id/
pub async fn get_user(
    State(state): State<AppState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> ApiResult<Json<UserResponse>> {
    let user = state.db.get_user(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(UserResponse::from(&user)))
}

/// GET /api/v1/groups/
pub async fn list_groups(State(state): State<AppState>) -> ApiResult<Json<Vec<GroupResponse>>> {
    let groups = state.db.list_groups().await?;
    Ok(Json(groups.iter().map(GroupResponse::from).collect()))
}

/// GET /api/v1/groups/:id/
pub async fn get_group(
    State(state): State<AppState>,
    WithRejection(Path(id), _): ApiPath<i64>,
) -> ApiResult<Json<GroupResponse>> {
    let group = state.db.get_group(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(GroupResponse::from(&group)))
}
