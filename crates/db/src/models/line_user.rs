use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

/// Largest balance a user can hold.
pub const MAX_REWARD_POINTS: i64 = i32::MAX as i64;

/// Display name used when LINE does not provide one.
pub const DEFAULT_DISPLAY_NAME: &str = "小夜用戶";

/// Domain user synchronized from LINE Login
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct LineUser {
    #[ts(type = "number")]
    pub id: i64,
    pub line_user_id: String,
    pub display_name: String,
    pub avatar: String,
    #[ts(type = "number")]
    pub reward_points: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LineUser {
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, LineUser>(
            r#"SELECT id, line_user_id, display_name, avatar, reward_points, created_at, updated_at
               FROM users
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_line_user_id(
        pool: &SqlitePool,
        line_user_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, LineUser>(
            r#"SELECT id, line_user_id, display_name, avatar, reward_points, created_at, updated_at
               FROM users
               WHERE line_user_id = $1"#,
        )
        .bind(line_user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        line_user_id: &str,
        display_name: &str,
        avatar: &str,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, LineUser>(
            r#"INSERT INTO users (line_user_id, display_name, avatar, reward_points, created_at, updated_at)
               VALUES ($1, $2, $3, 0, $4, $4)
               RETURNING id, line_user_id, display_name, avatar, reward_points, created_at, updated_at"#,
        )
        .bind(line_user_id)
        .bind(display_name)
        .bind(avatar)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn update_profile(
        pool: &SqlitePool,
        id: i64,
        display_name: &str,
        avatar: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, LineUser>(
            r#"UPDATE users
               SET display_name = $2, avatar = $3, updated_at = $4
               WHERE id = $1
               RETURNING id, line_user_id, display_name, avatar, reward_points, created_at, updated_at"#,
        )
        .bind(id)
        .bind(display_name)
        .bind(avatar)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    /// Add `delta` to the balance. Returns the number of rows touched: 0 when
    /// the user does not exist or the result would pass [`MAX_REWARD_POINTS`].
    pub async fn add_reward_points<'e, E>(
        executor: E,
        id: i64,
        delta: i64,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"UPDATE users
               SET reward_points = reward_points + $2, updated_at = $3
               WHERE id = $1 AND reward_points <= $4 - $2"#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .bind(MAX_REWARD_POINTS)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_reward_points<'e, E>(
        executor: E,
        id: i64,
        reward_points: i64,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result =
            sqlx::query("UPDATE users SET reward_points = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(reward_points)
                .bind(Utc::now())
                .execute(executor)
                .await?;
        Ok(result.rows_affected())
    }

    /// Take the write lock on the user row inside the current transaction.
    pub async fn lock<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE users SET id = id WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let db = DBService::new_in_memory().await.unwrap();
        let created = LineUser::create(&db.pool, "U100", "Amy", "").await.unwrap();
        assert_eq!(created.reward_points, 0);

        let by_line_id = LineUser::find_by_line_user_id(&db.pool, "U100")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_line_id.id, created.id);

        let by_id = LineUser::find_by_id(&db.pool, created.id).await.unwrap();
        assert_eq!(by_id.map(|u| u.display_name), Some("Amy".to_string()));
    }

    #[tokio::test]
    async fn test_duplicate_line_user_id_rejected() {
        let db = DBService::new_in_memory().await.unwrap();
        LineUser::create(&db.pool, "U100", "Amy", "").await.unwrap();
        assert!(LineUser::create(&db.pool, "U100", "Bob", "").await.is_err());
    }

    #[tokio::test]
    async fn test_reward_point_updates() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = LineUser::create(&db.pool, "U100", "Amy", "").await.unwrap();

        assert_eq!(LineUser::add_reward_points(&db.pool, user.id, 50).await.unwrap(), 1);
        assert_eq!(LineUser::add_reward_points(&db.pool, 9999, 50).await.unwrap(), 0);
        LineUser::set_reward_points(&db.pool, user.id, 10).await.unwrap();
        LineUser::add_reward_points(&db.pool, user.id, 5).await.unwrap();

        let user = LineUser::find_by_id(&db.pool, user.id).await.unwrap().unwrap();
        assert_eq!(user.reward_points, 15);
    }

    #[tokio::test]
    async fn test_credit_stops_at_max_balance() {
        let db = DBService::new_in_memory().await.unwrap();
        let user = LineUser::create(&db.pool, "U100", "Amy", "").await.unwrap();
        LineUser::set_reward_points(&db.pool, user.id, MAX_REWARD_POINTS - 10)
            .await
            .unwrap();

        assert_eq!(LineUser::add_reward_points(&db.pool, user.id, 50).await.unwrap(), 0);
        assert_eq!(LineUser::add_reward_points(&db.pool, user.id, 10).await.unwrap(), 1);

        let user = LineUser::find_by_id(&db.pool, user.id).await.unwrap().unwrap();
        assert_eq!(user.reward_points, MAX_REWARD_POINTS);
    }
}
