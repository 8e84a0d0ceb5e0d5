use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use db::models::line_user::LineUser;
use deployment::Deployment;

use crate::{DeploymentImpl, error::ApiError};

/// The user behind the request's `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub LineUser);

impl FromRequestParts<DeploymentImpl> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;
        let token = header
            .to_str()
            .ok()
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header".to_string()))?;

        let user = deployment
            .sessions()
            .authenticate(&deployment.db().pool, token)
            .await?;
        Ok(AuthUser(user))
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
