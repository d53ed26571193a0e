//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::data::User;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// User session data
///
/// Stored in a signed cookie. Holds the user reference only;
/// credits and ideas are attached when the session is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    /// Provider used for this sign-in
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for a user that just signed in
    pub fn for_user(user: &User, provider: &str, max_age_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            image: user.image.clone(),
            provider: provider.to_string(),
            created_at: now,
            expires_at: now + Duration::seconds(max_age_seconds),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

fn mac_for(secret: &str) -> Result<HmacSha256, AppError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| AppError::Encryption(e.to_string()))
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, AppError> {
    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = mac_for(secret)?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// Returns error if signature is invalid, token is malformed or the
/// session has expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    let Some((payload_b64, signature_b64)) = token.split_once('.') else {
        return Err(AppError::Unauthorized);
    };

    let mut mac = mac_for(secret)?;
    mac.update(payload_b64.as_bytes());

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;

    mac.verify_slice(&signature)
        .map_err(|_| AppError::InvalidSignature)?;

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

    fn session(expires_in: Duration) -> Session {
        let now = Utc::now();
        Session {
            user_id: "01HZX5N4Q4Y1S3V2W0K8M6T9RA".to_string(),
            name: Some("Ada".to_string()),
            email: Some("ada@example.com".to_string()),
            image: None,
            provider: "github".to_string(),
            created_at: now,
            expires_at: now + expires_in,
        }
    }

    #[test]
    fn token_verifies_with_same_secret() {
        let original = session(Duration::hours(1));
        let token = create_session_token(&original, SECRET).unwrap();

        let decoded = verify_session_token(&token, SECRET).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = create_session_token(&session(Duration::hours(1)), SECRET).unwrap();

        let error = verify_session_token(&token, "another-secret-another-secret-xx").unwrap_err();
        assert!(matches!(error, AppError::InvalidSignature));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = create_session_token(&session(Duration::hours(1)), SECRET).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let mut forged = session(Duration::hours(1));
        forged.user_id = "someone-else".to_string();
        let forged_payload = general_purpose::URL_SAFE_NO_PAD
            .encode(serde_json::to_string(&forged).unwrap().as_bytes());

        let error =
            verify_session_token(&format!("{forged_payload}.{signature}"), SECRET).unwrap_err();
        assert!(matches!(error, AppError::InvalidSignature));
    }

    #[test]
    fn expired_session_is_rejected() {
        let token = create_session_token(&session(Duration::seconds(-5)), SECRET).unwrap();

        let error = verify_session_token(&token, SECRET).unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(matches!(
            verify_session_token("no-dot-here", SECRET),
            Err(AppError::Unauthorized)
        ));
    }
}
