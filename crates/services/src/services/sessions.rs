//! Session and OAuth state tokens.

use chrono::Duration;
use db::models::line_user::LineUser;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;
use utils::jwt::{Hs256Signer, JwtError, issued_now};

pub const SESSION_TTL_DAYS: i64 = 7;
pub const STATE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Invalid token payload")]
    InvalidPayload,
    #[error("User not found")]
    UserNotFound,
    #[error("failed to sign token: {0}")]
    Sign(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<JwtError> for SessionError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Sign(message) => SessionError::Sign(message),
            JwtError::Expired | JwtError::Invalid(_) => SessionError::InvalidToken,
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionClaims {
    #[serde(rename = "userId")]
    user_id: i64,
    iat: i64,
    exp: i64,
}

/// Payload of the OAuth `state` parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    #[serde(rename = "redirectUrl", default)]
    pub redirect_url: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct SessionTokens {
    signer: Hs256Signer,
}

impl SessionTokens {
    pub fn new(secret: &SecretString) -> Self {
        Self {
            signer: Hs256Signer::new(secret.expose_secret().as_bytes()),
        }
    }

    pub fn issue(&self, user: &LineUser) -> Result<String, SessionError> {
        self.issue_for_user_id(user.id)
    }

    pub fn issue_for_user_id(&self, user_id: i64) -> Result<String, SessionError> {
        let (iat, exp) = issued_now(Duration::days(SESSION_TTL_DAYS));
        Ok(self.signer.sign(&SessionClaims { user_id, iat, exp })?)
    }

    /// Check signature and expiry and extract the `userId` claim.
    pub fn user_id_from_token(&self, token: &str) -> Result<i64, SessionError> {
        let claims: Value = self.signer.verify(token)?;
        claims
            .get("userId")
            .and_then(Value::as_i64)
            .ok_or(SessionError::InvalidPayload)
    }

    /// Resolve a bearer token to the user it was issued for.
    pub async fn authenticate(
        &self,
        pool: &SqlitePool,
        token: &str,
    ) -> Result<LineUser, SessionError> {
        let user_id = self.user_id_from_token(token)?;
        match LineUser::find_by_id(pool, user_id).await? {
            Some(user) => Ok(user),
            None => {
                debug!(user_id, "Session token refers to a missing user");
                Err(SessionError::UserNotFound)
            }
        }
    }

    pub fn issue_state(&self, redirect_url: &str) -> Result<String, SessionError> {
        let (iat, exp) = issued_now(Duration::minutes(STATE_TTL_MINUTES));
        Ok(self.signer.sign(&OAuthState {
            redirect_url: Some(redirect_url.to_string()),
            iat,
            exp,
        })?)
    }

    pub fn verify_state(&self, token: &str) -> Result<OAuthState, SessionError> {
        Ok(self.signer.verify(token)?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::DBService;

    use super::*;

    fn tokens() -> SessionTokens {
        SessionTokens::new(&SecretString::from("test-secret".to_string()))
    }

    #[tokio::test]
    async fn test_issue_and_authenticate() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = LineUser::create(&db.pool, "U1", "Amy", "").await.unwrap();
        let tokens = tokens();

        let token = tokens.issue(&user).unwrap();
        let resolved = tokens.authenticate(&db.pool, &token).await.unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let db = DBService::new_in_memory().await.unwrap();
        let token = tokens().issue_for_user_id(99).unwrap();
        let err = tokens().authenticate(&db.pool, &token).await.unwrap_err();
        assert!(matches!(err, SessionError::UserNotFound));
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let other = SessionTokens::new(&SecretString::from("other-secret".to_string()));
        let token = other.issue_for_user_id(1).unwrap();
        let err = tokens().user_id_from_token(&token).unwrap_err();
        assert_eq!(err.to_string(), "Invalid or expired token");
    }

    #[test]
    fn test_rejects_non_integer_user_id() {
        let signer = Hs256Signer::new(b"test-secret");
        let now = Utc::now().timestamp();
        let token = signer
            .sign(&serde_json::json!({"userId": "1", "iat": now, "exp": now + 60}))
            .unwrap();
        let err = tokens().user_id_from_token(&token).unwrap_err();
        assert_eq!(err.to_string(), "Invalid token payload");
    }

    #[test]
    fn test_rejects_expired_token() {
        let signer = Hs256Signer::new(b"test-secret");
        let now = Utc::now().timestamp();
        let token = signer
            .sign(&serde_json::json!({"userId": 1, "iat": now - 120, "exp": now - 60}))
            .unwrap();
        assert!(matches!(
            tokens().user_id_from_token(&token),
            Err(SessionError::InvalidToken)
        ));
    }

    #[test]
    fn test_state_round_trip() {
        let tokens = tokens();
        let state = tokens.issue_state("https://liff.example.com/home").unwrap();
        let decoded = tokens.verify_state(&state).unwrap();
        assert_eq!(
            decoded.redirect_url.as_deref(),
            Some("https://liff.example.com/home")
        );
        assert!(decoded.exp - decoded.iat == STATE_TTL_MINUTES * 60);
        assert!(tokens.verify_state("garbage").is_err());
    }
}
