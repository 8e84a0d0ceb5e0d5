use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use deployment::Deployment;
use services::services::config::Config;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::DeploymentImpl;

pub mod booking;
pub mod catalog;
pub mod health;
pub mod line_login;
pub mod login;
pub mod reviews;
pub mod reward;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;

pub fn router(deployment: DeploymentImpl) -> Router {
    let api = Router::new()
        .merge(login::router(&deployment))
        .merge(catalog::router(&deployment))
        .merge(reviews::router(&deployment))
        .merge(booking::router(&deployment))
        .merge(reward::router(&deployment));

    Router::new()
        .merge(health::router(&deployment))
        .merge(line_login::router(&deployment))
        .merge(webhook::router(&deployment))
        .nest("/api", api)
        .layer(cors_layer(deployment.config()))
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}

/// Configured origins may send credentials; with none configured any origin
/// is accepted.
fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}
