//! Browser-side LINE Login: send the user to LINE, then back to the frontend
//! with a session token or an error message in the query string.

use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use deployment::Deployment;
use serde::Deserialize;
use services::services::{
    line_login::authorize_url,
    user::{LoginError, UserService},
};
use tracing::{error, warn};
use utils::redirect::{redirect_with_params, sanitize_redirect};

use crate::{DeploymentImpl, error::ApiError};

const MISSING_STATE: &str = "缺少驗證資訊，請重新登入";
const INVALID_STATE: &str = "登入驗證逾時或來源不正確，請重新登入";
const MISSING_CODE: &str = "缺少授權碼，登入失敗";
const LOGIN_FAILED: &str = "登入失敗，請稍後再試";

#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeQuery {
    pub redirect: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn redirect_with_error(target: &str, message: &str) -> Response {
    found(redirect_with_params(target, &[("error", message)]))
}

fn fallback_redirect(deployment: &DeploymentImpl) -> Result<String, ApiError> {
    deployment
        .config()
        .default_redirect()
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::BadRequest(
                "LIFF_BASE_URL or CORS_ORIGIN must be configured for redirect".to_string(),
            )
        })
}

/// `BASE_URL` when configured, else the scheme and host the request came in on.
fn server_base_url(deployment: &DeploymentImpl, headers: &HeaderMap) -> String {
    if let Some(base) = &deployment.config().base_url {
        return base.clone();
    }
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .filter(|v| *v == "https")
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}")
}

fn callback_url(deployment: &DeploymentImpl, headers: &HeaderMap) -> String {
    format!("{}/line/callback", server_base_url(deployment, headers))
}

pub async fn authorize(
    State(deployment): State<DeploymentImpl>,
    headers: HeaderMap,
    Query(query): Query<AuthorizeQuery>,
) -> Result<Response, ApiError> {
    let fallback = fallback_redirect(&deployment)?;
    let target = sanitize_redirect(query.redirect.as_deref(), &fallback);
    let state = deployment.sessions().issue_state(&target)?;

    let url = authorize_url(
        &deployment.config().line.login_channel_id,
        &callback_url(&deployment, &headers),
        &state,
    );
    Ok(found(url))
}

pub async fn callback(
    State(deployment): State<DeploymentImpl>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let fallback = fallback_redirect(&deployment)?;

    let Some(state) = query.state.as_deref().filter(|s| !s.is_empty()) else {
        return Ok(redirect_with_error(&fallback, MISSING_STATE));
    };
    let target = match deployment.sessions().verify_state(state) {
        Ok(state) => sanitize_redirect(state.redirect_url.as_deref(), &fallback),
        Err(e) => {
            warn!(error = %e, "Rejected LINE login state");
            return Ok(redirect_with_error(&fallback, INVALID_STATE));
        }
    };

    if let Some(provider_error) = query.error.as_deref().filter(|e| !e.is_empty()) {
        let description = query
            .error_description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(provider_error);
        return Ok(redirect_with_error(&target, description));
    }

    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        return Ok(redirect_with_error(&target, MISSING_CODE));
    };

    let result = UserService::login_with_authorization_code(
        &deployment.db().pool,
        deployment.line_identity(),
        deployment.sessions(),
        code,
        &callback_url(&deployment, &headers),
    )
    .await;

    match result {
        Ok(login) => Ok(found(redirect_with_params(
            &target,
            &[("token", login.token.as_str())],
        ))),
        Err(LoginError::Line(e)) => {
            warn!(error = %e, "LINE login failed");
            Ok(redirect_with_error(&target, &e.to_string()))
        }
        Err(e) => {
            error!(error = %e, "LINE login failed");
            Ok(redirect_with_error(&target, LOGIN_FAILED))
        }
    }
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/line",
        Router::new()
            .route("/authorize", get(authorize))
            .route("/callback", get(callback)),
    )
}
