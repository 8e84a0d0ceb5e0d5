use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Body of every non-2xx JSON response.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Body of simple status endpoints (`/healthz`, webhook probes).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct StatusBody {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub events: Option<usize>,
}

impl StatusBody {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: None,
            events: None,
        }
    }
}
