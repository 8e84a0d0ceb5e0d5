use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::line_user::{LineUser, MAX_REWARD_POINTS};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::reward::{RewardService, RewardSummary};
use ts_rs::TS;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{ApiJson, positive_id},
    middleware::AuthUser,
};

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RewardUpdate {
    #[ts(type = "number")]
    pub reward_points: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, TS)]
pub struct RewardResponse {
    pub reward: RewardSummary,
}

#[derive(Debug, Serialize, TS)]
pub struct RewardUpdateResponse {
    pub user: LineUser,
    #[ts(type = "number")]
    pub delta: i64,
}

fn own_user_id(raw: &str, caller: &LineUser, forbidden: &str) -> Result<i64, ApiError> {
    let user_id = positive_id(raw, "Invalid userId")?;
    if user_id != caller.id {
        return Err(ApiError::Forbidden(forbidden.to_string()));
    }
    Ok(user_id)
}

pub async fn get_reward(
    State(deployment): State<DeploymentImpl>,
    AuthUser(user): AuthUser,
    Path(user_id): Path<String>,
) -> Result<ResponseJson<RewardResponse>, ApiError> {
    let user_id = own_user_id(&user_id, &user, "Cannot view other users' rewards")?;
    let reward = RewardService::summary(&deployment.db().pool, user_id).await?;
    Ok(ResponseJson(RewardResponse { reward }))
}

/// Overwrite the caller's balance
pub async fn update_reward(
    State(deployment): State<DeploymentImpl>,
    AuthUser(user): AuthUser,
    Path(user_id): Path<String>,
    ApiJson(update): ApiJson<RewardUpdate>,
) -> Result<ResponseJson<RewardUpdateResponse>, ApiError> {
    let user_id = own_user_id(&user_id, &user, "Cannot update other users' rewards")?;
    if !(0..=MAX_REWARD_POINTS).contains(&update.reward_points) {
        return Err(ApiError::BadRequest("Invalid request body".to_string()));
    }
    let (user, delta) = RewardService::set(
        &deployment.db().pool,
        user_id,
        update.reward_points,
        update.reason.as_deref(),
    )
    .await?;
    Ok(ResponseJson(RewardUpdateResponse { user, delta }))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/reward/{user_id}", get(get_reward).put(update_reward))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use db::models::line_user::MAX_REWARD_POINTS;
    use serde_json::json;

    use crate::routes::test_support::TestApp;

    #[tokio::test]
    async fn test_set_reward_points_logs_delta() {
        let app = TestApp::new().await;
        let (user, token) = app.login("U1").await;
        let uri = format!("/api/reward/{}", user.id);

        let (status, body) = app
            .json(
                Method::PUT,
                &uri,
                Some(&token),
                Some(json!({ "rewardPoints": 120 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["delta"], 120);
        assert_eq!(body["user"]["reward_points"], 120);

        let (_, body) = app
            .json(
                Method::PUT,
                &uri,
                Some(&token),
                Some(json!({ "rewardPoints": 100, "reason": "兌換" })),
            )
            .await;
        assert_eq!(body["delta"], -20);

        let (status, body) = app.json(Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let logs = body["reward"]["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0]["delta"], -20);
        assert_eq!(logs[0]["reason"], "兌換");
        assert_eq!(logs[1]["reason"], "調整積分");
    }

    #[tokio::test]
    async fn test_reward_rejections() {
        let app = TestApp::new().await;
        let (user, token) = app.login("U1").await;
        let (other, _) = app.login("U2").await;

        let (status, body) = app
            .json(
                Method::PUT,
                &format!("/api/reward/{}", user.id),
                Some(&token),
                Some(json!({ "rewardPoints": -1 })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request body");

        let (status, body) = app
            .json(
                Method::GET,
                &format!("/api/reward/{}", other.id),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Cannot view other users' rewards");

        let (status, body) = app
            .json(
                Method::PUT,
                &format!("/api/reward/{}", other.id),
                Some(&token),
                Some(json!({ "rewardPoints": 10 })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Cannot update other users' rewards");

        let (status, body) = app
            .json(Method::GET, "/api/reward/abc", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid userId");
    }

    #[tokio::test]
    async fn test_balance_above_limit_is_rejected() {
        let app = TestApp::new().await;
        let (user, token) = app.login("U1").await;
        let uri = format!("/api/reward/{}", user.id);

        let (status, body) = app
            .json(
                Method::PUT,
                &uri,
                Some(&token),
                Some(json!({ "rewardPoints": i64::MAX })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request body");

        let (status, body) = app
            .json(
                Method::PUT,
                &uri,
                Some(&token),
                Some(json!({ "rewardPoints": MAX_REWARD_POINTS })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["reward_points"], MAX_REWARD_POINTS);

        let sweet = app.create_sweet("小晴", "kaohsiung").await;
        let (status, body) = app
            .json(
                Method::POST,
                "/api/booking",
                Some(&token),
                Some(json!({ "sweetId": sweet.id, "date": "2025-06-01", "timeSlot": "20:00" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Reward balance limit reached");

        // The account still loads and can be repaired.
        let (status, body) = app
            .json(
                Method::PUT,
                &uri,
                Some(&token),
                Some(json!({ "rewardPoints": 0 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["reward_points"], 0);
    }
}
