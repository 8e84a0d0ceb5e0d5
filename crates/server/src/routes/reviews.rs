use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
};
use deployment::Deployment;
use services::services::review::{CreatedReview, NewReview, ReviewService, SweetReviews};

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{ApiJson, positive_id},
    middleware::AuthUser,
};

pub async fn list_reviews(
    State(deployment): State<DeploymentImpl>,
    _user: AuthUser,
    Path(sweet_id): Path<String>,
) -> Result<ResponseJson<SweetReviews>, ApiError> {
    let sweet_id = positive_id(&sweet_id, "Invalid sweetId")?;
    let reviews = ReviewService::list(&deployment.db().pool, sweet_id).await?;
    Ok(ResponseJson(reviews))
}

pub async fn create_review(
    State(deployment): State<DeploymentImpl>,
    AuthUser(user): AuthUser,
    Path(sweet_id): Path<String>,
    ApiJson(review): ApiJson<NewReview>,
) -> Result<(StatusCode, ResponseJson<CreatedReview>), ApiError> {
    let sweet_id = positive_id(&sweet_id, "Invalid sweetId")?;
    let created = ReviewService::create(&deployment.db().pool, &user, sweet_id, &review).await?;
    Ok((StatusCode::CREATED, ResponseJson(created)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route(
        "/sweets/{sweet_id}/reviews",
        get(list_reviews).post(create_review),
    )
}
