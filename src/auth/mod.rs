//! Accounts and sessions
//!
//! Handles:
//! - Signup, login and logout pages
//! - Signed session tokens (cookie or bearer)
//! - Request extractors for the current user
//! - Last-seen activity tracking

pub mod activity;
mod login;
mod middleware;
pub mod session;

use axum_extra::extract::cookie::{Cookie, SameSite};

pub use activity::{is_stale, track_activity};
pub use login::{auth_router, check_credentials, hash_password, register, safe_next, verify_password};
pub use middleware::{CurrentUser, LoginRequired, MaybeUser, login_url};
pub(crate) use middleware::authenticate;
pub use session::{SESSION_COOKIE, Session, create_session_token, verify_session_token};

/// The session cookie. No max-age: expiry is carried in the token.
pub(crate) fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}
