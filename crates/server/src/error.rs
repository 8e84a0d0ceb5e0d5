use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    booking::BookingError, review::ReviewError, reward::RewardError, sessions::SessionError,
    user::LoginError,
};
use thiserror::Error;
use utils::response::ErrorBody;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error(transparent)]
    Reward(#[from] RewardError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Login(#[from] LoginError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Invalid request body")]
    InvalidBody(#[from] JsonRejection),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Booking(err) => match err {
                BookingError::InvalidDate => StatusCode::BAD_REQUEST,
                BookingError::SweetNotFound | BookingError::UserNotFound => StatusCode::NOT_FOUND,
                BookingError::RewardLimit => StatusCode::CONFLICT,
                BookingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Reward(err) => match err {
                RewardError::NegativeBalance | RewardError::BalanceLimit => StatusCode::BAD_REQUEST,
                RewardError::UserNotFound => StatusCode::NOT_FOUND,
                RewardError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Review(err) => match err {
                ReviewError::InvalidRating | ReviewError::CommentTooLong => StatusCode::BAD_REQUEST,
                ReviewError::SweetNotFound => StatusCode::NOT_FOUND,
                ReviewError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Session(err) | ApiError::Login(LoginError::Session(err)) => match err {
                SessionError::Database(_) | SessionError::Sign(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::UNAUTHORIZED,
            },
            ApiError::Login(LoginError::Line(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Login(LoginError::Database(_)) | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::InvalidBody(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            ErrorBody::new("Internal server error")
        } else {
            match &self {
                ApiError::InvalidBody(rejection) => ErrorBody::new(self.to_string())
                    .with_details(serde_json::Value::String(rejection.body_text())),
                _ => ErrorBody::new(self.to_string()),
            }
        };
        (status, Json(body)).into_response()
    }
}
