//! Runtime configuration read from environment variables.

use chrono::FixedOffset;
use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_DATABASE_URL: &str = "sqlite://nightdesk.db";
const DEFAULT_TZ_OFFSET: &str = "+08:00";

const REQUIRED_KEYS: [&str; 5] = [
    "JWT_SECRET",
    "LINE_CHANNEL_ACCESS_TOKEN",
    "LINE_CHANNEL_SECRET",
    "LINE_LOGIN_CHANNEL_ID",
    "LINE_LOGIN_CHANNEL_SECRET",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug)]
pub struct LineConfig {
    pub channel_access_token: SecretString,
    pub channel_secret: SecretString,
    pub login_channel_id: String,
    pub login_channel_secret: SecretString,
}

#[derive(Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: SecretString,
    pub line: LineConfig,
    pub base_url: Option<String>,
    pub liff_base_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub allowed_hosts: Vec<String>,
    /// Offset applied to booking dates given without one.
    pub utc_offset: FixedOffset,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }
        let required = |key: &'static str| get(key).unwrap_or_default();

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                message: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let raw_offset = get("TZ_OFFSET").unwrap_or_else(|| DEFAULT_TZ_OFFSET.to_string());
        let utc_offset = raw_offset
            .parse::<FixedOffset>()
            .map_err(|e| ConfigError::Invalid {
                key: "TZ_OFFSET",
                message: format!("{raw_offset}: {e}"),
            })?;

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            jwt_secret: SecretString::from(required("JWT_SECRET")),
            line: LineConfig {
                channel_access_token: SecretString::from(required("LINE_CHANNEL_ACCESS_TOKEN")),
                channel_secret: SecretString::from(required("LINE_CHANNEL_SECRET")),
                login_channel_id: required("LINE_LOGIN_CHANNEL_ID"),
                login_channel_secret: SecretString::from(required("LINE_LOGIN_CHANNEL_SECRET")),
            },
            base_url: get("BASE_URL").map(|v| v.trim_end_matches('/').to_string()),
            liff_base_url: get("LIFF_BASE_URL").map(|v| v.trim_end_matches('/').to_string()),
            cors_origins: split_list(get("CORS_ORIGIN")),
            allowed_hosts: split_list(get("ALLOWED_HOSTS")),
            utc_offset,
        })
    }

    /// Where the browser is sent after the LINE login handshake when the
    /// caller gave no usable target.
    pub fn default_redirect(&self) -> Option<&str> {
        self.liff_base_url
            .as_deref()
            .or_else(|| self.cors_origins.first().map(String::as_str))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
