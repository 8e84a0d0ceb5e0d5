use db::models::{
    line_user::{LineUser, MAX_REWARD_POINTS},
    reward_log::RewardLog,
};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;

pub const DEFAULT_ADJUST_REASON: &str = "調整積分";

#[derive(Debug, Error)]
pub enum RewardError {
    #[error("User not found")]
    UserNotFound,
    #[error("rewardPoints must be greater than or equal to 0")]
    NegativeBalance,
    #[error("rewardPoints must not exceed 2147483647")]
    BalanceLimit,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct RewardSummary {
    pub user: LineUser,
    pub logs: Vec<RewardLog>,
}

pub struct RewardService;

impl RewardService {
    /// Add `delta` (possibly negative) to the balance and record it.
    pub async fn adjust(
        pool: &SqlitePool,
        user_id: i64,
        delta: i64,
        reason: &str,
    ) -> Result<LineUser, RewardError> {
        let mut tx = pool.begin().await?;
        if LineUser::add_reward_points(&mut *tx, user_id, delta).await? == 0 {
            return Err(match LineUser::find_by_id(&mut *tx, user_id).await? {
                Some(_) => RewardError::BalanceLimit,
                None => RewardError::UserNotFound,
            });
        }
        RewardLog::create(&mut *tx, user_id, delta, reason).await?;
        let user = LineUser::find_by_id(&mut *tx, user_id)
            .await?
            .ok_or(RewardError::UserNotFound)?;
        tx.commit().await?;
        Ok(user)
    }

    /// Overwrite the balance. Returns the user and the applied difference.
    /// The row is always saved; a log entry is written only when the balance
    /// actually changed.
    pub async fn set(
        pool: &SqlitePool,
        user_id: i64,
        reward_points: i64,
        reason: Option<&str>,
    ) -> Result<(LineUser, i64), RewardError> {
        if reward_points < 0 {
            return Err(RewardError::NegativeBalance);
        }
        if reward_points > MAX_REWARD_POINTS {
            return Err(RewardError::BalanceLimit);
        }
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ADJUST_REASON);

        let mut tx = pool.begin().await?;
        if !LineUser::lock(&mut *tx, user_id).await? {
            return Err(RewardError::UserNotFound);
        }
        let current = LineUser::find_by_id(&mut *tx, user_id)
            .await?
            .ok_or(RewardError::UserNotFound)?;
        let delta = reward_points - current.reward_points;

        LineUser::set_reward_points(&mut *tx, user_id, reward_points).await?;
        if delta != 0 {
            RewardLog::create(&mut *tx, user_id, delta, reason).await?;
        }
        let user = LineUser::find_by_id(&mut *tx, user_id)
            .await?
            .ok_or(RewardError::UserNotFound)?;
        tx.commit().await?;

        if delta != 0 {
            info!(user_id, delta, reward_points, "Reward balance set");
        }
        Ok((user, delta))
    }

    pub async fn summary(pool: &SqlitePool, user_id: i64) -> Result<RewardSummary, RewardError> {
        let user = LineUser::find_by_id(pool, user_id)
            .await?
            .ok_or(RewardError::UserNotFound)?;
        let logs = RewardLog::find_by_user_id(pool, user_id).await?;
        Ok(RewardSummary { user, logs })
    }
}
