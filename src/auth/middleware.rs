//! Authentication extractors
//!
//! A request is authenticated by a signed session token, taken from the
//! `Authorization: Bearer` header or the `session` cookie. The token only
//! names the user; the user row is loaded on every request so deleted
//! accounts lose access immediately.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::session::{SESSION_COOKIE, Session, verify_session_token};
use crate::AppState;
use crate::data::{User, Viewer};
use crate::error::AppError;

/// Where a token was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Bearer,
    Cookie,
}

pub(crate) fn extract_token_from_headers(headers: &HeaderMap) -> Option<(String, TokenSource)> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| (token.to_owned(), TokenSource::Bearer))
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(SESSION_COOKIE)
                .map(|cookie| (cookie.value().to_owned(), TokenSource::Cookie))
        })
}

/// Resolve the request's user, if any.
///
/// Invalid or expired tokens count as anonymous. The session may already
/// have been verified by the activity middleware.
pub(crate) async fn authenticate(
    parts: &mut Parts,
    state: &AppState,
) -> Result<Option<User>, AppError> {
    if let Some(user) = parts.extensions.get::<User>() {
        return Ok(Some(user.clone()));
    }

    let session = match parts.extensions.get::<Session>() {
        Some(session) => Some(session.clone()),
        None => extract_token_from_headers(&parts.headers).and_then(|(token, _)| {
            verify_session_token(&token, &state.config.auth.session_secret).ok()
        }),
    };
    let Some(session) = session else {
        return Ok(None);
    };

    let user = state.db.get_user(session.user_id).await?;
    if let Some(user) = &user {
        parts.extensions.insert(user.clone());
    } else {
        tracing::debug!(user_id = session.user_id, "Session for a missing user");
    }

    Ok(user)
}

/// Redirect to the login page, remembering where the user was going
#[derive(Debug)]
pub enum LoginRequired {
    Redirect(String),
    Failed(AppError),
}

pub fn login_url(next: &str) -> String {
    format!("/auth/login/?next={}", urlencoding::encode(next))
}

impl IntoResponse for LoginRequired {
    fn into_response(self) -> Response {
        match self {
            LoginRequired::Redirect(next) => Redirect::to(&login_url(&next)).into_response(),
            LoginRequired::Failed(error) => error.into_response(),
        }
    }
}

/// Extractor for the logged-in user on pages that require one.
///
/// Anonymous requests are redirected to `/auth/login/?next=<path>`.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = LoginRequired;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        match authenticate(parts, &state).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| "/".to_string());
                Err(LoginRequired::Redirect(next))
            }
            Err(error) => Err(LoginRequired::Failed(error)),
        }
    }
}

/// Optional current user extractor
///
/// Returns None if not authenticated, instead of redirecting.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn viewer(&self) -> Viewer {
        match &self.0 {
            Some(user) => Viewer::User(user.id),
            None => Viewer::Anonymous,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(MaybeUser(authenticate(parts, &state).await?))
    }
}
