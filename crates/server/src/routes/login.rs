use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::line_user::LineUser;
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::user::UserService;
use tracing::info;
use ts_rs::TS;

use crate::{DeploymentImpl, error::ApiError, extract::ApiJson, middleware::AuthUser};

#[derive(Debug, Deserialize, TS)]
pub struct LoginRequest {
    #[serde(rename = "idToken")]
    pub id_token: String,
}

#[derive(Debug, Serialize, TS)]
pub struct LoginResponse {
    pub token: String,
    pub user: LineUser,
}

#[derive(Debug, Serialize, TS)]
pub struct UserResponse {
    pub user: LineUser,
}

/// Exchange a LIFF ID token for a session token
pub async fn login(
    State(deployment): State<DeploymentImpl>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<ResponseJson<LoginResponse>, ApiError> {
    let id_token = request.id_token.trim();
    if id_token.is_empty() {
        return Err(ApiError::BadRequest("Invalid request body".to_string()));
    }

    let result = UserService::login_with_id_token(
        &deployment.db().pool,
        deployment.line_identity(),
        deployment.sessions(),
        id_token,
    )
    .await?;
    info!(user_id = result.user.id, "User logged in");

    Ok(ResponseJson(LoginResponse {
        token: result.token,
        user: result.user,
    }))
}

pub async fn me(AuthUser(user): AuthUser) -> ResponseJson<UserResponse> {
    ResponseJson(UserResponse { user })
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/login", post(login))
        .route("/login/me", get(me))
}
