//! LINE Login client: ID token verification and authorization code exchange.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use url::Url;

pub const LINE_VERIFY_URL: &str = "https://api.line.me/oauth2/v2.1/verify";
pub const LINE_TOKEN_URL: &str = "https://api.line.me/oauth2/v2.1/token";
pub const LINE_AUTHORIZE_URL: &str = "https://access.line.me/oauth2/v2.1/authorize";
pub const LINE_LOGIN_SCOPE: &str = "profile openid";

#[derive(Debug, Clone, Error)]
pub enum LineApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("{context}")]
    Rejected {
        context: &'static str,
        status: u16,
        body: String,
    },
    #[error("LINE verify response missing sub")]
    MissingSubject,
    #[error("LINE token response missing id_token")]
    MissingIdToken,
    #[error("json error: {0}")]
    Serde(String),
}

impl LineApiError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Rejected { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

pub(crate) fn map_reqwest_error(e: reqwest::Error) -> LineApiError {
    if e.is_timeout() {
        LineApiError::Timeout
    } else {
        LineApiError::Transport(e.to_string())
    }
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, LineApiError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("nightdesk/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| LineApiError::Transport(e.to_string()))
}

pub(crate) fn retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(250))
        .with_max_delay(Duration::from_secs(4))
        .with_max_times(2)
        .with_jitter()
}

/// Claims returned by the verify endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineProfile {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineTokens {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[async_trait]
pub trait LineIdentityProvider: Send + Sync {
    async fn verify_id_token(&self, id_token: &str) -> Result<LineProfile, LineApiError>;

    async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<LineTokens, LineApiError>;
}

#[derive(Debug, Clone)]
pub struct LineLoginClient {
    http: Client,
    channel_id: String,
    channel_secret: SecretString,
}

impl LineLoginClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(channel_id: String, channel_secret: SecretString) -> Result<Self, LineApiError> {
        Ok(Self {
            http: build_http_client(Self::REQUEST_TIMEOUT)?,
            channel_id,
            channel_secret,
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        context: &'static str,
    ) -> Result<Value, LineApiError> {
        let res = self
            .http
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(LineApiError::Rejected {
                context,
                status: status.as_u16(),
                body,
            });
        }
        res.json::<Value>()
            .await
            .map_err(|e| LineApiError::Serde(e.to_string()))
    }
}

#[async_trait]
impl LineIdentityProvider for LineLoginClient {
    async fn verify_id_token(&self, id_token: &str) -> Result<LineProfile, LineApiError> {
        let form = [("id_token", id_token), ("client_id", self.channel_id.as_str())];
        let data = (|| async { self.post_form(LINE_VERIFY_URL, &form, "LINE verify failed").await })
            .retry(retry_policy())
            .when(|e: &LineApiError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "LINE verify call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await?;
        parse_profile(data)
    }

    async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<LineTokens, LineApiError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.channel_id.as_str()),
            ("client_secret", self.channel_secret.expose_secret()),
        ];
        let data = (|| async {
            self.post_form(LINE_TOKEN_URL, &form, "LINE token exchange failed")
                .await
        })
        .retry(retry_policy())
        .when(|e: &LineApiError| e.should_retry())
        .notify(|e, dur| {
            warn!(
                "LINE token exchange failed, retrying after {:.2}s: {}",
                dur.as_secs_f64(),
                e
            )
        })
        .await?;
        serde_json::from_value(data).map_err(|e| LineApiError::Serde(e.to_string()))
    }
}

fn parse_profile(data: Value) -> Result<LineProfile, LineApiError> {
    match data.get("sub").and_then(Value::as_str) {
        Some(sub) if !sub.is_empty() => {}
        _ => return Err(LineApiError::MissingSubject),
    }
    serde_json::from_value(data).map_err(|e| LineApiError::Serde(e.to_string()))
}

/// LINE authorize URL the browser is sent to at the start of the handshake.
pub fn authorize_url(channel_id: &str, redirect_uri: &str, state: &str) -> String {
    match Url::parse_with_params(
        LINE_AUTHORIZE_URL,
        &[
            ("response_type", "code"),
            ("client_id", channel_id),
            ("redirect_uri", redirect_uri),
            ("state", state),
            ("scope", LINE_LOGIN_SCOPE),
        ],
    ) {
        Ok(url) => url.to_string(),
        Err(_) => LINE_AUTHORIZE_URL.to_string(),
    }
}
