use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    config::Config,
    line_bot::messages::ImageBase,
    line_login::{LineIdentityProvider, LineLoginClient},
    line_messaging::{LineMessagingClient, LineReplier},
    sessions::SessionTokens,
};
use tracing::info;

#[derive(Clone)]
pub struct LocalDeployment {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    db: DBService,
    sessions: SessionTokens,
    line_identity: Arc<dyn LineIdentityProvider>,
    line_replier: Arc<dyn LineReplier>,
    image_base: ImageBase,
}

impl LocalDeployment {
    /// Connect to the configured database and build the LINE clients.
    pub async fn from_config(config: Config) -> Result<Self, DeploymentError> {
        let db = DBService::new(&config.database_url).await?;
        let line_identity = Arc::new(LineLoginClient::new(
            config.line.login_channel_id.clone(),
            config.line.login_channel_secret.clone(),
        )?);
        let line_replier = Arc::new(LineMessagingClient::new(
            config.line.channel_access_token.clone(),
        )?);
        info!(database_url = %config.database_url, "Deployment ready");
        Ok(Self::from_parts(config, db, line_identity, line_replier))
    }

    /// Assemble a deployment from already-built parts.
    pub fn from_parts(
        config: Config,
        db: DBService,
        line_identity: Arc<dyn LineIdentityProvider>,
        line_replier: Arc<dyn LineReplier>,
    ) -> Self {
        let sessions = SessionTokens::new(&config.jwt_secret);
        let image_base = ImageBase::from_config(&config);
        Self {
            inner: Arc::new(Inner {
                config,
                db,
                sessions,
                line_identity,
                line_replier,
                image_base,
            }),
        }
    }
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = Config::from_env()?;
        Self::from_config(config).await
    }

    fn config(&self) -> &Config {
        &self.inner.config
    }

    fn db(&self) -> &DBService {
        &self.inner.db
    }

    fn sessions(&self) -> &SessionTokens {
        &self.inner.sessions
    }

    fn line_identity(&self) -> &dyn LineIdentityProvider {
        self.inner.line_identity.as_ref()
    }

    fn line_replier(&self) -> &dyn LineReplier {
        self.inner.line_replier.as_ref()
    }

    fn image_base(&self) -> &ImageBase {
        &self.inner.image_base
    }
}
