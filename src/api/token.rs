//! Token issuing for API clients

use axum::{Json, extract::State};
use axum_extra::extract::WithRejection;

use super::{ApiJson, ApiResult, TokenRequest, TokenResponse};
use crate::AppState;
use crate::auth::{Session, check_credentials, create_session_token};
use crate::forms::FieldErrors;

/// POST /api/v1/auth/token/
///
/// Exchanges username and password for a bearer token. The token is the
/// same signed session the web pages keep in their cookie.
pub async fn obtain_token(
    State(state): State<AppState>,
    WithRejection(Json(request), _): ApiJson<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let mut errors = FieldErrors::new();
    if request.username.trim().is_empty() {
        errors.add("username", crate::forms::REQUIRED_MESSAGE);
    }
    if request.password.is_empty() {
        errors.add("password", crate::forms::REQUIRED_MESSAGE);
    }
    errors.finish(())?;

    let Some(user) = check_credentials(&state, request.username.trim(), &request.password).await? else {
        tracing::info!(username = %request.username, "Rejected token request");
        return Err(FieldErrors::single(
            "non_field_errors",
            "Unable to log in with provided credentials.",
        )
        .into());
    };

    let session = Session::new(&user, state.config.auth.session_max_age);
    let token = create_session_token(&session, &state.config.auth.session_secret)?;
    tracing::info!(user_id = user.id, "Issued API token");

    Ok(Json(TokenResponse {
        token,
        expires_at: session.expires_at,
    }))
}
