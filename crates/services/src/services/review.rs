use db::models::{
    line_user::LineUser,
    sweet::Sweet,
    sweet_review::{PublicReview, ReviewSummary, SweetReview},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;
pub const MAX_COMMENT_CHARS: usize = 1000;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Sweet not found")]
    SweetNotFound,
    #[error("Rating must be between 1 and 5")]
    InvalidRating,
    #[error("Comment must be at most 1000 characters")]
    CommentTooLong,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct NewReview {
    #[ts(type = "number")]
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct SweetReviews {
    pub reviews: Vec<PublicReview>,
    pub summary: ReviewSummary,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct CreatedReview {
    pub review: PublicReview,
    pub summary: ReviewSummary,
}

pub struct ReviewService;

impl ReviewService {
    pub async fn list(pool: &SqlitePool, sweet_id: i64) -> Result<SweetReviews, ReviewError> {
        ensure_sweet(pool, sweet_id).await?;
        let reviews = SweetReview::find_public_by_sweet_id(pool, sweet_id).await?;
        let summary = SweetReview::summary(pool, sweet_id).await?;
        Ok(SweetReviews { reviews, summary })
    }

    pub async fn create(
        pool: &SqlitePool,
        user: &LineUser,
        sweet_id: i64,
        input: &NewReview,
    ) -> Result<CreatedReview, ReviewError> {
        if !(MIN_RATING..=MAX_RATING).contains(&input.rating) {
            return Err(ReviewError::InvalidRating);
        }
        let comment = input.comment.as_deref().unwrap_or_default().trim();
        if comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(ReviewError::CommentTooLong);
        }
        ensure_sweet(pool, sweet_id).await?;

        let review = SweetReview::create(pool, sweet_id, user.id, input.rating, comment).await?;
        info!(
            review_id = review.id,
            sweet_id,
            user_id = user.id,
            rating = input.rating,
            "Review created"
        );
        let summary = SweetReview::summary(pool, sweet_id).await?;
        Ok(CreatedReview {
            review: review.into_public(&user.display_name),
            summary,
        })
    }

    pub async fn summary(pool: &SqlitePool, sweet_id: i64) -> Result<ReviewSummary, ReviewError> {
        Ok(SweetReview::summary(pool, sweet_id).await?)
    }
}

async fn ensure_sweet(pool: &SqlitePool, sweet_id: i64) -> Result<(), ReviewError> {
    match Sweet::find_by_id(pool, sweet_id).await? {
        Some(_) => Ok(()),
        None => Err(ReviewError::SweetNotFound),
    }
}

#[cfg(test)]
mod tests {
    use db::{DBService, models::sweet::UpsertSweet};

    use super::*;

    async fn seed(db: &DBService) -> (LineUser, Sweet) {
        let user = LineUser::create(&db.pool, "U1", "Amy", "").await.unwrap();
        let sweet = Sweet::create(
            &db.pool,
            &UpsertSweet {
                name: "小晴".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (user, sweet)
    }

    fn review(rating: i64, comment: &str) -> NewReview {
        NewReview {
            rating,
            comment: Some(comment.to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let db = DBService::new_in_memory().await.unwrap();
        let (user, sweet) = seed(&db).await;

        let created = ReviewService::create(&db.pool, &user, sweet.id, &review(4, " 很準時 "))
            .await
            .unwrap();
        assert_eq!(created.review.comment, "很準時");
        assert_eq!(created.review.user_display_name, "Amy");
        assert_eq!(created.summary.review_count, 1);

        ReviewService::create(&db.pool, &user, sweet.id, &review(5, ""))
            .await
            .unwrap();
        let listed = ReviewService::list(&db.pool, sweet.id).await.unwrap();
        assert_eq!(listed.reviews.len(), 2);
        assert_eq!(listed.summary.average_rating, 4.5);
    }

    #[tokio::test]
    async fn test_validation() {
        let db = DBService::new_in_memory().await.unwrap();
        let (user, sweet) = seed(&db).await;

        for rating in [0, 6] {
            let err = ReviewService::create(&db.pool, &user, sweet.id, &review(rating, ""))
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "Rating must be between 1 and 5");
        }

        let long = "好".repeat(MAX_COMMENT_CHARS + 1);
        assert!(matches!(
            ReviewService::create(&db.pool, &user, sweet.id, &review(3, &long)).await,
            Err(ReviewError::CommentTooLong)
        ));
        let exact = "好".repeat(MAX_COMMENT_CHARS);
        assert!(
            ReviewService::create(&db.pool, &user, sweet.id, &review(3, &exact))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_missing_sweet() {
        let db = DBService::new_in_memory().await.unwrap();
        let (user, _) = seed(&db).await;
        assert!(matches!(
            ReviewService::list(&db.pool, 999).await,
            Err(ReviewError::SweetNotFound)
        ));
        assert!(matches!(
            ReviewService::create(&db.pool, &user, 999, &review(5, "")).await,
            Err(ReviewError::SweetNotFound)
        ));
    }
}
