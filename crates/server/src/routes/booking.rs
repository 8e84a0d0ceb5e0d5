use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::booking::BookingWithSweet;
use deployment::Deployment;
use serde::Serialize;
use services::services::booking::{BookingService, NewBooking};
use ts_rs::TS;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{ApiJson, positive_id},
    middleware::AuthUser,
};

#[derive(Debug, Serialize, TS)]
pub struct BookingResponse {
    pub booking: BookingWithSweet,
}

#[derive(Debug, Serialize, TS)]
pub struct BookingsResponse {
    pub bookings: Vec<BookingWithSweet>,
}

fn validate(request: &NewBooking) -> Result<(), ApiError> {
    if request.sweet_id < 1
        || request.date.trim().is_empty()
        || request.time_slot.trim().is_empty()
    {
        return Err(ApiError::BadRequest("Invalid request body".to_string()));
    }
    Ok(())
}

/// Book a sweet for the caller and credit the booking reward
pub async fn create_booking(
    State(deployment): State<DeploymentImpl>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<NewBooking>,
) -> Result<(StatusCode, ResponseJson<BookingResponse>), ApiError> {
    validate(&request)?;
    let booking = BookingService::create(
        &deployment.db().pool,
        user.id,
        &request,
        deployment.config().utc_offset,
    )
    .await?;
    Ok((StatusCode::CREATED, ResponseJson(BookingResponse { booking })))
}

pub async fn list_bookings(
    State(deployment): State<DeploymentImpl>,
    AuthUser(user): AuthUser,
    Path(user_id): Path<String>,
) -> Result<ResponseJson<BookingsResponse>, ApiError> {
    let user_id = positive_id(&user_id, "Invalid userId")?;
    if user_id != user.id {
        return Err(ApiError::Forbidden(
            "Cannot view other users' bookings".to_string(),
        ));
    }
    let bookings = BookingService::list_for_user(&deployment.db().pool, user_id).await?;
    Ok(ResponseJson(BookingsResponse { bookings }))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/booking", post(create_booking))
        .route("/booking/{user_id}", get(list_bookings))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::test_support::TestApp;

    #[tokio::test]
    async fn test_create_booking_credits_reward() {
        let app = TestApp::new().await;
        let (user, token) = app.login("U1").await;
        let sweet = app.create_sweet("小晴", "taipei").await;

        let (status, body) = app
            .json(
                Method::POST,
                "/api/booking",
                Some(&token),
                Some(json!({
                    "sweetId": sweet.id,
                    "date": "2025-06-01",
                    "timeSlot": "20:00",
                    "note": "晚一點到"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["booking"]["status"], "PENDING");
        assert_eq!(body["booking"]["time_slot"], "20:00");
        assert_eq!(body["booking"]["sweet"]["name"], "小晴");

        let (status, body) = app
            .json(
                Method::GET,
                &format!("/api/booking/{}", user.id),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bookings"].as_array().unwrap().len(), 1);

        let (_, body) = app
            .json(
                Method::GET,
                &format!("/api/reward/{}", user.id),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(body["reward"]["user"]["reward_points"], 50);
    }

    #[tokio::test]
    async fn test_booking_rejections() {
        let app = TestApp::new().await;
        let (user, token) = app.login("U1").await;
        let sweet = app.create_sweet("小晴", "taipei").await;

        let (status, body) = app
            .json(
                Method::POST,
                "/api/booking",
                Some(&token),
                Some(json!({ "sweetId": 0, "date": "2025-06-01", "timeSlot": "20:00" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request body");

        let (status, body) = app
            .json(
                Method::POST,
                "/api/booking",
                Some(&token),
                Some(json!({ "sweetId": sweet.id, "date": "next friday", "timeSlot": "20:00" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid booking date");

        let (status, body) = app
            .json(
                Method::POST,
                "/api/booking",
                Some(&token),
                Some(json!({ "sweetId": 9999, "date": "2025-06-01", "timeSlot": "20:00" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Sweet not found");

        let (status, body) = app
            .json(Method::GET, "/api/booking/0", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid userId");

        let (status, body) = app
            .json(
                Method::GET,
                &format!("/api/booking/{}", user.id + 1),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Cannot view other users' bookings");
    }
}
