use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

use super::{
    location::{Location, LocationSummary},
    round_rating,
};

/// Catalog entry that can be booked
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Sweet {
    #[ts(type = "number")]
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub tag: String,
    pub environment: String,
    pub service_type: String,
    #[ts(type = "number | null")]
    pub long_duration_minutes: Option<i64>,
    #[ts(type = "number | null")]
    pub short_duration_minutes: Option<i64>,
    #[ts(type = "number | null")]
    pub long_price: Option<i64>,
    #[ts(type = "number | null")]
    pub short_price: Option<i64>,
    pub update_time: Option<DateTime<Utc>>,
    #[ts(type = "number | null")]
    pub location_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sweet as returned by listings: display code, review aggregates and location
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SweetListing {
    #[serde(flatten)]
    #[ts(flatten)]
    pub sweet: Sweet,
    pub code: String,
    pub average_rating: f64,
    #[ts(type = "number")]
    pub review_count: i64,
    pub location: Option<LocationSummary>,
}

impl std::ops::Deref for SweetListing {
    type Target = Sweet;
    fn deref(&self) -> &Self::Target {
        &self.sweet
    }
}

#[derive(FromRow)]
struct SweetListingRow {
    #[sqlx(flatten)]
    sweet: Sweet,
    location_slug: Option<String>,
    location_name: Option<String>,
    average_rating: f64,
    review_count: i64,
}

impl From<SweetListingRow> for SweetListing {
    fn from(row: SweetListingRow) -> Self {
        let location = match (row.sweet.location_id, row.location_slug, row.location_name) {
            (Some(id), Some(slug), Some(name)) => Some(LocationSummary { id, slug, name }),
            _ => None,
        };
        let code = Sweet::code(row.sweet.id, location.as_ref().map(|l| l.slug.as_str()));
        SweetListing {
            sweet: row.sweet,
            code,
            average_rating: round_rating(row.average_rating),
            review_count: row.review_count,
            location,
        }
    }
}

/// Fields written by the import command
#[derive(Debug, Clone, Default)]
pub struct UpsertSweet {
    pub name: String,
    pub location_id: Option<i64>,
    pub description: String,
    pub image_url: String,
    pub tag: String,
    pub environment: String,
    pub service_type: String,
    pub long_duration_minutes: Option<i64>,
    pub short_duration_minutes: Option<i64>,
    pub long_price: Option<i64>,
    pub short_price: Option<i64>,
    pub update_time: Option<DateTime<Utc>>,
}

const LISTING_SELECT: &str = r#"SELECT
    s.id, s.name, s.description, s.image_url, s.tag, s.environment, s.service_type,
    s.long_duration_minutes, s.short_duration_minutes, s.long_price, s.short_price,
    s.update_time, s.location_id, s.created_at, s.updated_at,
    l.slug AS location_slug,
    l.name AS location_name,
    COALESCE(AVG(r.rating), 0.0) AS average_rating,
    COUNT(r.id) AS review_count
FROM sweets s
LEFT JOIN locations l ON l.id = s.location_id
LEFT JOIN sweet_reviews r ON r.sweet_id = s.id"#;

impl Sweet {
    /// Display code: location prefix plus the last four digits of the
    /// zero-padded id, e.g. `KS0007`.
    pub fn code(id: i64, location_slug: Option<&str>) -> String {
        let padded = format!("{:04}", id);
        let digits = &padded[padded.len() - 4..];
        format!("{}{}", Location::code_prefix(location_slug), digits)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Sweet>(
            r#"SELECT id, name, description, image_url, tag, environment, service_type,
                      long_duration_minutes, short_duration_minutes, long_price, short_price,
                      update_time, location_id, created_at, updated_at
               FROM sweets
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Take the write lock on the sweet row inside the current transaction.
    /// Returns false when the row does not exist.
    pub async fn lock<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE sweets SET id = id WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All sweets with aggregates, optionally restricted to one location slug.
    pub async fn list_with_stats(
        pool: &SqlitePool,
        location_slug: Option<&str>,
    ) -> Result<Vec<SweetListing>, sqlx::Error> {
        let sql = format!(
            "{LISTING_SELECT}\nWHERE ($1 IS NULL OR l.slug = $1)\nGROUP BY s.id\nORDER BY s.id ASC"
        );
        let rows = sqlx::query_as::<_, SweetListingRow>(&sql)
            .bind(location_slug)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(SweetListing::from).collect())
    }

    pub async fn find_with_stats<'e, E>(
        executor: E,
        id: i64,
    ) -> Result<Option<SweetListing>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{LISTING_SELECT}\nWHERE s.id = $1\nGROUP BY s.id");
        let row = sqlx::query_as::<_, SweetListingRow>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row.map(SweetListing::from))
    }

    pub async fn find_by_name_and_location(
        pool: &SqlitePool,
        name: &str,
        location_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Sweet>(
            r#"SELECT id, name, description, image_url, tag, environment, service_type,
                      long_duration_minutes, short_duration_minutes, long_price, short_price,
                      update_time, location_id, created_at, updated_at
               FROM sweets
               WHERE name = $1 AND location_id = $2"#,
        )
        .bind(name)
        .bind(location_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(pool: &SqlitePool, data: &UpsertSweet) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Sweet>(
            r#"INSERT INTO sweets (name, description, image_url, tag, environment, service_type,
                                  long_duration_minutes, short_duration_minutes, long_price, short_price,
                                  update_time, location_id, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
               RETURNING id, name, description, image_url, tag, environment, service_type,
                         long_duration_minutes, short_duration_minutes, long_price, short_price,
                         update_time, location_id, created_at, updated_at"#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.image_url)
        .bind(&data.tag)
        .bind(&data.environment)
        .bind(&data.service_type)
        .bind(data.long_duration_minutes)
        .bind(data.short_duration_minutes)
        .bind(data.long_price)
        .bind(data.short_price)
        .bind(data.update_time)
        .bind(data.location_id)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &UpsertSweet,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Sweet>(
            r#"UPDATE sweets
               SET name = $2, description = $3, image_url = $4, tag = $5, environment = $6,
                   service_type = $7, long_duration_minutes = $8, short_duration_minutes = $9,
                   long_price = $10, short_price = $11, update_time = $12, location_id = $13,
                   updated_at = $14
               WHERE id = $1
               RETURNING id, name, description, image_url, tag, environment, service_type,
                         long_duration_minutes, short_duration_minutes, long_price, short_price,
                         update_time, location_id, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.image_url)
        .bind(&data.tag)
        .bind(&data.environment)
        .bind(&data.service_type)
        .bind(data.long_duration_minutes)
        .bind(data.short_duration_minutes)
        .bind(data.long_price)
        .bind(data.short_price)
        .bind(data.update_time)
        .bind(data.location_id)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    /// Insert or update the sweet identified by (name, location).
    pub async fn upsert_by_name_and_location(
        pool: &SqlitePool,
        data: &UpsertSweet,
    ) -> Result<(Self, bool), sqlx::Error> {
        let existing = match data.location_id {
            Some(location_id) => {
                Self::find_by_name_and_location(pool, &data.name, location_id).await?
            }
            None => None,
        };
        match existing {
            Some(sweet) => Ok((Self::update(pool, sweet.id, data).await?, false)),
            None => Ok((Self::create(pool, data).await?, true)),
        }
    }
}
