use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

/// One entry of the reward ledger
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct RewardLog {
    #[ts(type = "number")]
    pub id: i64,
    #[serde(skip_serializing)]
    #[ts(skip)]
    pub user_id: i64,
    #[ts(type = "number")]
    pub delta: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl RewardLog {
    pub async fn create<'e, E>(
        executor: E,
        user_id: i64,
        delta: i64,
        reason: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, RewardLog>(
            r#"INSERT INTO reward_logs (user_id, delta, reason, created_at)
               VALUES ($1, $2, $3, $4)
               RETURNING id, user_id, delta, reason, created_at"#,
        )
        .bind(user_id)
        .bind(delta)
        .bind(reason)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RewardLog>(
            r#"SELECT id, user_id, delta, reason, created_at
               FROM reward_logs
               WHERE user_id = $1
               ORDER BY created_at DESC, id DESC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
