//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::data::User;
use crate::error::AppError;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// User session data
///
/// Stored in a signed cookie, or sent as a bearer token by API clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
    /// RFC 3339 time of the last recorded activity. Kept as text so a
    /// garbled value is simply treated as stale.
    #[serde(default)]
    pub last_activity: Option<String>,
}

impl Session {
    /// Fresh session for a user who just authenticated
    pub fn new(user: &User, max_age_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id: user.id,
            username: user.username.clone(),
            created_at: now,
            expires_at: now + Duration::seconds(max_age_seconds),
            last_activity: None,
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// Returns `Unauthorized` if the signature is invalid, the token is
/// malformed, or the session has expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let session: Session =
        serde_json::from_slice(&payload_bytes).map_err(|_| AppError::Unauthorized)?;

    if session.is_expired() {
        return Err(AppError::Unauthorized);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn session(expires_in: i64) -> Session {
        let now = Utc::now();
        Session {
            user_id: 3,
            username: "alice".to_string(),
            created_at: now,
            expires_at: now + Duration::seconds(expires_in),
            last_activity: None,
        }
    }

    #[test]
    fn token_roundtrip() {
        let token = create_session_token(&session(60), SECRET).unwrap();
        let decoded = verify_session_token(&token, SECRET).unwrap();
        assert_eq!(decoded.user_id, 3);
        assert_eq!(decoded.username, "alice");
    }

    #[test]
    fn rejects_other_secret_and_tampering() {
        let token = create_session_token(&session(60), SECRET).unwrap();
        assert!(verify_session_token(&token, "another-secret-another-secret-xx").is_err());

        let (payload, signature) = token.split_once('.').unwrap();
        let tampered = format!("{}A.{}", payload, signature);
        assert!(verify_session_token(&tampered, SECRET).is_err());
        assert!(verify_session_token("garbage", SECRET).is_err());
    }

    #[test]
    fn rejects_expired_session() {
        let token = create_session_token(&session(-1), SECRET).unwrap();
        assert!(matches!(
            verify_session_token(&token, SECRET),
            Err(AppError::Unauthorized)
        ));
    }
}
