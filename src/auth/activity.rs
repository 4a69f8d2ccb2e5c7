//! Last-seen tracking
//!
//! Every request from a logged-in user may bump that user's activity
//! row. The session carries the time of the last recorded bump so the
//! database is written at most once per configured interval.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, header::SET_COOKIE},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};

use super::middleware::{TokenSource, extract_token_from_headers};
use super::session::{Session, create_session_token, verify_session_token};
use super::session_cookie;
use crate::AppState;
use crate::metrics::ACTIVITY_UPDATES_TOTAL;

/// Whether the stored timestamp is missing, unreadable, or older than
/// `now - interval`.
pub fn is_stale(stored: Option<&str>, now: DateTime<Utc>, interval: Duration) -> bool {
    match stored.and_then(|raw| DateTime::parse_from_rfc3339(raw).ok()) {
        Some(last) => last.with_timezone(&Utc) < now - interval,
        None => true,
    }
}

/// Middleware wrapping the whole router.
///
/// Verifies the session once and hands it to the extractors through the
/// request extensions. After the handler ran, records activity if the
/// last recorded time is stale and re-issues the session cookie.
pub async fn track_activity(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let session = extract_token_from_headers(request.headers()).and_then(|(token, source)| {
        verify_session_token(&token, &state.config.auth.session_secret)
            .ok()
            .map(|session| (session, source))
    });
    if let Some((session, _)) = &session {
        request.extensions_mut().insert(session.clone());
    }

    let mut response = next.run(request).await;

    let Some((session, source)) = session else {
        return response;
    };
    let now = Utc::now();
    let interval = Duration::seconds(state.config.activity.interval_seconds);
    let Some(stored) = last_recorded(&state, &session, source).await else {
        return response;
    };
    if !is_stale(stored.as_deref(), now, interval) {
        return response;
    }

    if let Err(error) = state.db.touch_activity(session.user_id, now).await {
        tracing::warn!(%error, user_id = session.user_id, "Failed to record activity");
        return response;
    }
    ACTIVITY_UPDATES_TOTAL.inc();
    tracing::debug!(user_id = session.user_id, "Recorded activity");

    // Bearer clients keep their token; a handler that set the cookie
    // itself (login, logout) takes precedence.
    if source == TokenSource::Cookie && !response.headers().contains_key(SET_COOKIE) {
        refresh_cookie(&state, session, now, &mut response);
    }

    response
}

/// Timestamp of the last recorded activity.
///
/// Cookie sessions carry it themselves. Bearer tokens are never re-issued,
/// so for them the stored activity row is the reference. `None` means the
/// lookup failed and nothing should be written.
async fn last_recorded(
    state: &AppState,
    session: &Session,
    source: TokenSource,
) -> Option<Option<String>> {
    match source {
        TokenSource::Cookie => Some(session.last_activity.clone()),
        TokenSource::Bearer => match state.db.get_last_seen(session.user_id).await {
            Ok(time) => Some(time.map(|time| time.to_rfc3339())),
            Err(error) => {
                tracing::warn!(%error, user_id = session.user_id, "Failed to read activity");
                None
            }
        },
    }
}

fn refresh_cookie(state: &AppState, mut session: Session, now: DateTime<Utc>, response: &mut Response) {
    session.last_activity = Some(now.to_rfc3339());
    let token = match create_session_token(&session, &state.config.auth.session_secret) {
        Ok(token) => token,
        Err(error) => {
            tracing::warn!(%error, "Failed to refresh session token");
            return;
        }
    };

    let cookie = session_cookie(token, state.config.should_use_secure_cookies());
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(error) => tracing::warn!(%error, "Session cookie is not a valid header"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval() -> Duration {
        Duration::seconds(300)
    }

    #[test]
    fn missing_timestamp_is_stale() {
        assert!(is_stale(None, Utc::now(), interval()));
    }

    #[test]
    fn malformed_timestamp_is_stale() {
        assert!(is_stale(Some("yesterday-ish"), Utc::now(), interval()));
        assert!(is_stale(Some(""), Utc::now(), interval()));
    }

    #[test]
    fn recent_timestamp_is_fresh() {
        let now = Utc::now();
        let recent = (now - Duration::seconds(299)).to_rfc3339();
        assert!(!is_stale(Some(&recent), now, interval()));
    }

    #[test]
    fn old_timestamp_is_stale() {
        let now = Utc::now();
        let old = (now - Duration::seconds(301)).to_rfc3339();
        assert!(is_stale(Some(&old), now, interval()));
    }

    #[test]
    fn accepts_offsets_other_than_utc() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        // 13:58 at +02:00 is 11:58 UTC, two minutes ago
        assert!(!is_stale(Some("2024-05-01T13:58:00+02:00"), now, interval()));
        // 13:50 at +02:00 is ten minutes ago
        assert!(is_stale(Some("2024-05-01T13:50:00+02:00"), now, interval()));
    }
}
