use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json as ResponseJson,
    routing::get,
};
use deployment::Deployment;
use secrecy::ExposeSecret;
use services::services::line_bot::{LineBot, WebhookPayload, signature};
use tracing::{debug, warn};
use utils::response::StatusBody;

use crate::{DeploymentImpl, error::ApiError};

pub const SIGNATURE_HEADER: &str = "x-line-signature";

pub async fn probe() -> ResponseJson<StatusBody> {
    ResponseJson(StatusBody {
        message: Some("Use POST to deliver LINE events".to_string()),
        ..StatusBody::ok()
    })
}

/// Verify and dispatch a LINE webhook delivery
pub async fn receive(
    State(deployment): State<DeploymentImpl>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ResponseJson<StatusBody>, ApiError> {
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing LINE signature".to_string()))?;

    let secret = deployment.config().line.channel_secret.expose_secret();
    if !signature::verify(secret.as_bytes(), &body, provided) {
        warn!("Rejected webhook delivery with a bad signature");
        return Err(ApiError::Unauthorized("Invalid signature".to_string()));
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Invalid payload".to_string()))?;
    debug!(events = payload.events.len(), "Webhook delivery received");

    let bot = LineBot::new(
        &deployment.db().pool,
        deployment.line_replier(),
        deployment.image_base(),
    );
    let handled = bot.handle_events(&payload.events).await?;

    Ok(ResponseJson(StatusBody {
        status: "processed".to_string(),
        message: None,
        events: Some(handled),
    }))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/webhook", get(probe).post(receive))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::{Value, json};

    use super::*;
    use crate::routes::test_support::{CHANNEL_SECRET, TestApp};

    fn delivery(body: &str, signature: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/webhook").header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn text_event(text: &str) -> String {
        json!({
            "destination": "Uxxxx",
            "events": [{
                "type": "message",
                "replyToken": "reply-1",
                "message": { "type": "text", "id": "1", "text": text }
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_probe() {
        let app = TestApp::new().await;
        let (status, body) = app.json(Method::GET, "/webhook", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "ok", "message": "Use POST to deliver LINE events" })
        );
    }

    #[tokio::test]
    async fn test_signed_delivery_is_answered() {
        let app = TestApp::new().await;
        let body = text_event("甜心列表");
        let sig = signature::sign(CHANNEL_SECRET.as_bytes(), body.as_bytes());

        let (status, _, bytes) = app.send(delivery(&body, Some(&sig))).await;
        assert_eq!(status, StatusCode::OK);
        let response: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(response, json!({ "status": "processed", "events": 1 }));

        let replies = app.replier.replies.lock().unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].0, "reply-1");
        assert!(replies[0].1[0]["quickReply"]["items"].is_array());
    }

    #[tokio::test]
    async fn test_signature_and_payload_checks() {
        let app = TestApp::new().await;
        let body = text_event("客服");

        let (status, _, _) = app.send(delivery(&body, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let forged = signature::sign(b"other-secret", body.as_bytes());
        let (status, _, _) = app.send(delivery(&body, Some(&forged))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let garbage = "{not json";
        let sig = signature::sign(CHANNEL_SECRET.as_bytes(), garbage.as_bytes());
        let (status, _, bytes) = app.send(delivery(garbage, Some(&sig))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let response: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(response["error"], "Invalid payload");

        assert!(app.replier.replies.lock().unwrap().is_empty());
    }
}
