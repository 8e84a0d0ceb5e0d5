use db::models::line_user::{DEFAULT_DISPLAY_NAME, LineUser};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

use super::{
    line_login::{LineApiError, LineIdentityProvider},
    sessions::{SessionError, SessionTokens},
};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error(transparent)]
    Line(#[from] LineApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug)]
pub struct LoginResult {
    pub user: LineUser,
    pub token: String,
}

pub struct UserService;

impl UserService {
    /// Create the user on first login, otherwise refresh the stored profile
    /// with whatever LINE sent this time. A missing avatar keeps the stored
    /// one; an empty one clears it.
    pub async fn upsert_line_user(
        pool: &SqlitePool,
        line_user_id: &str,
        display_name: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<LineUser, sqlx::Error> {
        let display_name = display_name.map(str::trim).filter(|name| !name.is_empty());

        let existing = match LineUser::find_by_line_user_id(pool, line_user_id).await? {
            Some(user) => user,
            None => {
                let created = LineUser::create(
                    pool,
                    line_user_id,
                    display_name.unwrap_or(DEFAULT_DISPLAY_NAME),
                    avatar.unwrap_or_default(),
                )
                .await;
                match created {
                    Ok(user) => {
                        info!(user_id = user.id, line_user_id, "Created LINE user");
                        return Ok(user);
                    }
                    // Lost a race with a concurrent first login.
                    Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                        LineUser::find_by_line_user_id(pool, line_user_id)
                            .await?
                            .ok_or(sqlx::Error::RowNotFound)?
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        let mut next_name = existing.display_name.clone();
        if let Some(name) = display_name {
            next_name = name.to_string();
        } else if next_name.is_empty() {
            next_name = DEFAULT_DISPLAY_NAME.to_string();
        }
        let next_avatar = avatar.unwrap_or(existing.avatar.as_str()).to_string();

        if next_name == existing.display_name && next_avatar == existing.avatar {
            return Ok(existing);
        }
        debug!(user_id = existing.id, "Refreshing LINE profile");
        LineUser::update_profile(pool, existing.id, &next_name, &next_avatar).await
    }

    /// Verify a LIFF ID token, sync the user and issue a session token.
    pub async fn login_with_id_token(
        pool: &SqlitePool,
        provider: &dyn LineIdentityProvider,
        sessions: &SessionTokens,
        id_token: &str,
    ) -> Result<LoginResult, LoginError> {
        let profile = provider.verify_id_token(id_token).await?;
        let user = Self::upsert_line_user(
            pool,
            &profile.sub,
            profile.name.as_deref(),
            profile.picture.as_deref(),
        )
        .await?;
        let token = sessions.issue(&user)?;
        Ok(LoginResult { user, token })
    }

    pub async fn login_with_authorization_code(
        pool: &SqlitePool,
        provider: &dyn LineIdentityProvider,
        sessions: &SessionTokens,
        code: &str,
        redirect_uri: &str,
    ) -> Result<LoginResult, LoginError> {
        let tokens = provider
            .exchange_authorization_code(code, redirect_uri)
            .await?;
        let id_token = tokens.id_token.ok_or(LineApiError::MissingIdToken)?;
        Self::login_with_id_token(pool, provider, sessions, &id_token).await
    }
}
