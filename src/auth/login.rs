//! Account pages: signup, login, logout

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use serde::Deserialize;

use super::session::{SESSION_COOKIE, Session, create_session_token};
use super::session_cookie;
use crate::AppState;
use crate::data::{NewUser, User, is_unique_violation};
use crate::error::AppError;
use crate::forms::{FieldErrors, LoginForm, SignupForm};
use crate::web::render;

const USERNAME_TAKEN_MESSAGE: &str = "A user with that username already exists.";
const BAD_CREDENTIALS_MESSAGE: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Create auth router
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup/", get(signup_form).post(signup))
        .route("/auth/login/", get(login_form).post(login))
        .route("/auth/logout/", get(logout).post(logout))
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Encryption(format!("Failed to hash password: {}", e)))
}

/// A malformed stored hash never verifies
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(error) => {
            tracing::warn!(%error, "Stored password hash is malformed");
            false
        }
    }
}

/// Only same-site absolute paths are followed after login
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

/// Issue a session for `user` and add its cookie to the jar
pub(crate) fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
) -> Result<CookieJar, AppError> {
    let session = Session::new(user, state.config.auth.session_max_age);
    let token = create_session_token(&session, &state.config.auth.session_secret)?;
    Ok(jar.add(session_cookie(token, state.config.should_use_secure_cookies())))
}

/// Register a new account from a validated signup
pub async fn register(state: &AppState, form: &SignupForm) -> Result<Result<User, FieldErrors>, AppError> {
    let clean = match form.validate() {
        Ok(clean) => clean,
        Err(errors) => return Ok(Err(errors)),
    };
    if state.db.username_exists(&clean.username).await? {
        return Ok(Err(FieldErrors::single("username", USERNAME_TAKEN_MESSAGE)));
    }

    let new_user = NewUser {
        username: clean.username,
        first_name: clean.first_name,
        last_name: clean.last_name,
        email: clean.email,
        password_hash: hash_password(&clean.password)?,
    };
    match state.db.insert_user(&new_user).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, username = %user.username, "User registered");
            Ok(Ok(user))
        }
        Err(AppError::Database(e)) if is_unique_violation(&e) => {
            Ok(Err(FieldErrors::single("username", USERNAME_TAKEN_MESSAGE)))
        }
        Err(e) => Err(e),
    }
}

/// Look up a user by credentials
pub async fn check_credentials(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    let user = state.db.get_user_by_username(username).await?;
    Ok(user.filter(|user| verify_password(password, &user.password_hash)))
}

async fn signup_form() -> impl IntoResponse {
    render::signup_page(&SignupForm::default(), &FieldErrors::new())
}

async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    match register(&state, &form).await? {
        Ok(user) => {
            let jar = start_session(&state, jar, &user)?;
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(errors) => Ok(render::signup_page(&form, &errors).into_response()),
    }
}

#[derive(Debug, Deserialize)]
struct NextQuery {
    next: Option<String>,
}

async fn login_form(Query(query): Query<NextQuery>) -> impl IntoResponse {
    let form = LoginForm {
        next: query.next,
        ..Default::default()
    };
    render::login_page(&form, &FieldErrors::new())
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let (username, password) = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => return Ok(render::login_page(&form, &errors).into_response()),
    };

    let Some(user) = check_credentials(&state, &username, &password).await? else {
        tracing::info!(username = %username, "Failed login attempt");
        let errors = FieldErrors::single(FieldErrors::NON_FIELD, BAD_CREDENTIALS_MESSAGE);
        return Ok(render::login_page(&form, &errors).into_response());
    };

    tracing::info!(user_id = user.id, "User logged in");
    let jar = start_session(&state, jar, &user)?;
    let next = safe_next(form.next.as_deref()).to_string();
    Ok((jar, Redirect::to(&next)).into_response())
}

/// Clears session cookie and redirects home
async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/"))
}
