use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

/// Sweet code prefix used when a sweet has no location.
pub const FALLBACK_CODE_PREFIX: &str = "SW";

const CODE_PREFIXES: &[(&str, &str)] = &[
    ("taipei", "TP"),
    ("newtaipei", "NT"),
    ("taoyuan", "TY"),
    ("taichung", "TC"),
    ("tainan", "TN"),
    ("kaohsiung", "KS"),
];

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Location {
    #[ts(type = "number")]
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Location as embedded in sweet listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct LocationSummary {
    #[ts(type = "number")]
    pub id: i64,
    pub slug: String,
    pub name: String,
}

impl From<&Location> for LocationSummary {
    fn from(location: &Location) -> Self {
        Self {
            id: location.id,
            slug: location.slug.clone(),
            name: location.name.clone(),
        }
    }
}

impl Location {
    /// Two-letter prefix for sweet codes in this location.
    pub fn code_prefix(slug: Option<&str>) -> String {
        let Some(slug) = slug.filter(|s| !s.is_empty()) else {
            return FALLBACK_CODE_PREFIX.to_string();
        };
        CODE_PREFIXES
            .iter()
            .find(|(known, _)| *known == slug)
            .map(|(_, prefix)| prefix.to_string())
            .unwrap_or_else(|| slug.chars().take(2).collect::<String>().to_uppercase())
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Location>(
            r#"SELECT id, slug, name, created_at, updated_at
               FROM locations
               ORDER BY name ASC, id ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Location>(
            r#"SELECT id, slug, name, created_at, updated_at
               FROM locations
               WHERE slug = $1"#,
        )
        .bind(slug)
        .fetch_optional(pool)
        .await
    }

    /// Fetch the location with `slug`, creating it with `name` when missing.
    /// The boolean is true when a row was inserted.
    pub async fn find_or_create(
        pool: &SqlitePool,
        slug: &str,
        name: &str,
    ) -> Result<(Self, bool), sqlx::Error> {
        if let Some(existing) = Self::find_by_slug(pool, slug).await? {
            return Ok((existing, false));
        }
        let now = Utc::now();
        let created = sqlx::query_as::<_, Location>(
            r#"INSERT INTO locations (slug, name, created_at, updated_at)
               VALUES ($1, $2, $3, $3)
               RETURNING id, slug, name, created_at, updated_at"#,
        )
        .bind(slug)
        .bind(name)
        .bind(now)
        .fetch_one(pool)
        .await?;
        Ok((created, true))
    }
}
