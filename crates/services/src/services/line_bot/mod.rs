//! Chatbot that answers LINE webhook message events.

pub mod messages;
pub mod signature;

use db::models::location::Location;
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, error};

use self::messages::ImageBase;
use super::{catalog::{CatalogService, match_location}, line_messaging::LineReplier};

pub const MENU_COMMAND: &str = "甜心列表";
pub const RULES_COMMAND: &str = "預約規則";
pub const CUSTOMER_SERVICE_COMMAND: &str = "客服";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "replyToken", default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub message: Option<EventMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl WebhookEvent {
    /// Trimmed text of a text message event.
    pub fn text(&self) -> Option<&str> {
        if self.kind != "message" {
            return None;
        }
        let message = self.message.as_ref()?;
        if message.kind != "text" {
            return None;
        }
        Some(message.text.as_deref().unwrap_or_default().trim())
    }
}

pub struct LineBot<'a> {
    pool: &'a SqlitePool,
    replier: &'a dyn LineReplier,
    images: &'a ImageBase,
}

impl<'a> LineBot<'a> {
    pub fn new(pool: &'a SqlitePool, replier: &'a dyn LineReplier, images: &'a ImageBase) -> Self {
        Self {
            pool,
            replier,
            images,
        }
    }

    /// Handle every event in order. Database failures abort; reply failures
    /// are only logged.
    pub async fn handle_events(&self, events: &[WebhookEvent]) -> Result<usize, sqlx::Error> {
        for event in events {
            self.handle_event(event).await?;
        }
        Ok(events.len())
    }

    pub async fn handle_event(&self, event: &WebhookEvent) -> Result<(), sqlx::Error> {
        let Some(text) = event.text() else {
            debug!(kind = %event.kind, "Ignoring non-text event");
            return Ok(());
        };
        let reply = self.reply_for_text(text).await?;

        let Some(reply_token) = event.reply_token.as_deref() else {
            error!("Failed to send LINE reply: event has no reply token");
            return Ok(());
        };
        if let Err(e) = self.replier.reply(reply_token, vec![reply]).await {
            error!(error = %e, "Failed to send LINE reply");
        }
        Ok(())
    }

    pub async fn reply_for_text(&self, text: &str) -> Result<Value, sqlx::Error> {
        if text == MENU_COMMAND {
            let locations = CatalogService::list_locations(self.pool).await?;
            return Ok(messages::location_menu(&locations));
        }

        let locations: Vec<Location> = CatalogService::list_locations(self.pool).await?;
        if let Some(location) = match_location(&locations, text) {
            let sweets = CatalogService::list_sweets(self.pool, Some(&location.slug)).await?;
            let title = format!("{}甜心", location.name);
            return Ok(messages::sweet_carousel(&sweets, Some(&title), self.images));
        }

        Ok(match text {
            RULES_COMMAND => messages::rules_message(),
            CUSTOMER_SERVICE_COMMAND => messages::customer_service_message(),
            _ => messages::default_message(),
        })
    }
}
