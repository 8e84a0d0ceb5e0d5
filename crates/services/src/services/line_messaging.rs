//! LINE Messaging API reply client.

use std::time::Duration;

use async_trait::async_trait;
use backon::Retryable;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::warn;

use super::line_login::{LineApiError, build_http_client, map_reqwest_error, retry_policy};

pub const LINE_REPLY_URL: &str = "https://api.line.me/v2/bot/message/reply";

#[async_trait]
pub trait LineReplier: Send + Sync {
    async fn reply(&self, reply_token: &str, messages: Vec<Value>) -> Result<(), LineApiError>;
}

#[derive(Debug, Clone)]
pub struct LineMessagingClient {
    http: Client,
    access_token: SecretString,
}

impl LineMessagingClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(access_token: SecretString) -> Result<Self, LineApiError> {
        Ok(Self {
            http: build_http_client(Self::REQUEST_TIMEOUT)?,
            access_token,
        })
    }

    async fn send_reply(&self, body: &Value) -> Result<(), LineApiError> {
        let res = self
            .http
            .post(LINE_REPLY_URL)
            .bearer_auth(self.access_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }
        let body = res.text().await.unwrap_or_default();
        Err(LineApiError::Rejected {
            context: "LINE reply failed",
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl LineReplier for LineMessagingClient {
    async fn reply(&self, reply_token: &str, messages: Vec<Value>) -> Result<(), LineApiError> {
        let body = json!({ "replyToken": reply_token, "messages": messages });
        (|| async { self.send_reply(&body).await })
            .retry(retry_policy())
            .when(|e: &LineApiError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "LINE reply failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }
}
