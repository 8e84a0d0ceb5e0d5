use async_trait::async_trait;
use db::DBService;
use services::services::{
    config::{Config, ConfigError},
    line_bot::messages::ImageBase,
    line_login::{LineApiError, LineIdentityProvider},
    line_messaging::LineReplier,
    sessions::SessionTokens,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    LineApi(#[from] LineApiError),
}

/// Everything a request handler needs: configuration, storage and the LINE
/// platform clients.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Config;

    fn db(&self) -> &DBService;

    fn sessions(&self) -> &SessionTokens;

    fn line_identity(&self) -> &dyn LineIdentityProvider;

    fn line_replier(&self) -> &dyn LineReplier;

    fn image_base(&self) -> &ImageBase;
}
