use axum::extract::FromRequest;

use crate::error::ApiError;

/// `Json` whose rejection renders as the API's `{"error": ...}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Parse a positive numeric path segment.
pub fn positive_id(raw: &str, message: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_id() {
        assert_eq!(positive_id("12", "bad").unwrap(), 12);
        assert!(positive_id("0", "bad").is_err());
        assert!(positive_id("-3", "bad").is_err());
        assert!(positive_id("abc", "bad").is_err());
    }
}
