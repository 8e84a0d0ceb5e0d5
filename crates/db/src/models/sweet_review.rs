use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

use super::{line_user::DEFAULT_DISPLAY_NAME, round_rating};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct SweetReview {
    #[ts(type = "number")]
    pub id: i64,
    #[ts(type = "number")]
    pub sweet_id: i64,
    #[ts(type = "number")]
    pub user_id: i64,
    #[ts(type = "number")]
    pub rating: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review as shown publicly: no user ids, only the author's display name
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct PublicReview {
    #[ts(type = "number")]
    pub id: i64,
    #[ts(type = "number")]
    pub rating: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "userDisplayName")]
    pub user_display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub average_rating: f64,
    #[ts(type = "number")]
    pub review_count: i64,
}

impl SweetReview {
    pub async fn create(
        pool: &SqlitePool,
        sweet_id: i64,
        user_id: i64,
        rating: i64,
        comment: &str,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, SweetReview>(
            r#"INSERT INTO sweet_reviews (sweet_id, user_id, rating, comment, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $5)
               RETURNING id, sweet_id, user_id, rating, comment, created_at, updated_at"#,
        )
        .bind(sweet_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    /// Reviews of a sweet, newest first, with the author's display name
    /// (falling back to the default name when blank or the user is gone).
    pub async fn find_public_by_sweet_id(
        pool: &SqlitePool,
        sweet_id: i64,
    ) -> Result<Vec<PublicReview>, sqlx::Error> {
        sqlx::query_as::<_, PublicReview>(
            r#"SELECT r.id, r.rating, r.comment, r.created_at,
                      COALESCE(NULLIF(u.display_name, ''), $2) AS user_display_name
               FROM sweet_reviews r
               LEFT JOIN users u ON u.id = r.user_id
               WHERE r.sweet_id = $1
               ORDER BY r.created_at DESC, r.id DESC"#,
        )
        .bind(sweet_id)
        .bind(DEFAULT_DISPLAY_NAME)
        .fetch_all(pool)
        .await
    }

    pub async fn summary(pool: &SqlitePool, sweet_id: i64) -> Result<ReviewSummary, sqlx::Error> {
        let (average, count): (f64, i64) = sqlx::query_as(
            r#"SELECT COALESCE(AVG(rating), 0.0), COUNT(id)
               FROM sweet_reviews
               WHERE sweet_id = $1"#,
        )
        .bind(sweet_id)
        .fetch_one(pool)
        .await?;

        Ok(ReviewSummary {
            average_rating: round_rating(average),
            review_count: count,
        })
    }

    /// Review as shown publicly, with `display_name` of its author.
    pub fn into_public(self, display_name: &str) -> PublicReview {
        let user_display_name = if display_name.is_empty() {
            DEFAULT_DISPLAY_NAME.to_string()
        } else {
            display_name.to_string()
        };
        PublicReview {
            id: self.id,
            rating: self.rating,
            comment: self.comment,
            created_at: self.created_at,
            user_display_name,
        }
    }
}
