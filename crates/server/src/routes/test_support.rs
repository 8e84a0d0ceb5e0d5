use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use db::{
    DBService,
    models::{
        line_user::LineUser,
        sweet::{Sweet, UpsertSweet},
    },
};
use deployment::Deployment;
use serde_json::Value;
use services::services::{
    config::Config,
    line_login::{LineApiError, LineIdentityProvider, LineProfile, LineTokens},
    line_messaging::LineReplier,
    user::UserService,
};
use tower::ServiceExt;

use crate::{DeploymentImpl, routes};

pub(crate) const CHANNEL_SECRET: &str = "test-channel-secret";

const BASE_ENV: [(&str, &str); 7] = [
    ("JWT_SECRET", "test-jwt-secret"),
    ("LINE_CHANNEL_ACCESS_TOKEN", "test-access-token"),
    ("LINE_CHANNEL_SECRET", CHANNEL_SECRET),
    ("LINE_LOGIN_CHANNEL_ID", "1650000000"),
    ("LINE_LOGIN_CHANNEL_SECRET", "test-login-secret"),
    ("BASE_URL", "https://api.example.com"),
    ("LIFF_BASE_URL", "https://liff.example.com"),
];

/// Accepts `id-<sub>` ID tokens and `code-<sub>` authorization codes.
pub(crate) struct FakeLineIdentity;

#[async_trait]
impl LineIdentityProvider for FakeLineIdentity {
    async fn verify_id_token(&self, id_token: &str) -> Result<LineProfile, LineApiError> {
        match id_token.strip_prefix("id-") {
            Some(sub) => Ok(LineProfile {
                sub: sub.to_string(),
                name: Some(format!("user {sub}")),
                picture: None,
            }),
            None => Err(LineApiError::Rejected {
                context: "LINE verify failed",
                status: 400,
                body: String::new(),
            }),
        }
    }

    async fn exchange_authorization_code(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<LineTokens, LineApiError> {
        match code.strip_prefix("code-") {
            Some(sub) => Ok(LineTokens {
                access_token: "access".to_string(),
                id_token: Some(format!("id-{sub}")),
                expires_in: None,
                refresh_token: None,
                scope: None,
                token_type: None,
            }),
            None => Err(LineApiError::Rejected {
                context: "LINE token exchange failed",
                status: 400,
                body: String::new(),
            }),
        }
    }
}

#[derive(Default)]
pub(crate) struct RecordingReplier {
    pub replies: Mutex<Vec<(String, Vec<Value>)>>,
}

#[async_trait]
impl LineReplier for RecordingReplier {
    async fn reply(&self, reply_token: &str, messages: Vec<Value>) -> Result<(), LineApiError> {
        self.replies
            .lock()
            .unwrap()
            .push((reply_token.to_string(), messages));
        Ok(())
    }
}

pub(crate) struct TestApp {
    pub deployment: DeploymentImpl,
    pub replier: Arc<RecordingReplier>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_env(&[]).await
    }

    /// Blank values in `overrides` unset the variable.
    pub async fn with_env(overrides: &[(&str, &str)]) -> Self {
        let mut env: HashMap<String, String> = BASE_ENV
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (key, value) in overrides {
            env.insert(key.to_string(), value.to_string());
        }
        let config = Config::from_lookup(|key| env.get(key).cloned()).unwrap();
        let db = DBService::new_in_memory().await.unwrap();
        let replier = Arc::new(RecordingReplier::default());
        let deployment =
            DeploymentImpl::from_parts(config, db, Arc::new(FakeLineIdentity), replier.clone());
        Self {
            deployment,
            replier,
        }
    }

    pub fn router(&self) -> Router {
        routes::router(self.deployment.clone())
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body)
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let (status, _, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// A stored user and a session token for it.
    pub async fn login(&self, line_user_id: &str) -> (LineUser, String) {
        let user = UserService::upsert_line_user(
            &self.deployment.db().pool,
            line_user_id,
            Some("Tester"),
            None,
        )
        .await
        .unwrap();
        let token = self.deployment.sessions().issue(&user).unwrap();
        (user, token)
    }

    pub async fn create_sweet(&self, name: &str, location_slug: &str) -> Sweet {
        let pool = &self.deployment.db().pool;
        let location = db::models::location::Location::find_by_slug(pool, location_slug)
            .await
            .unwrap()
            .unwrap();
        Sweet::create(
            pool,
            &UpsertSweet {
                name: name.to_string(),
                location_id: Some(location.id),
                image_url: format!("/sweets/{location_slug}/{name}.jpg"),
                tag: location.name.clone(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }
}
