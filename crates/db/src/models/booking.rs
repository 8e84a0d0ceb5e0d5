use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use super::sweet::SweetListing;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "booking_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Booking {
    #[ts(type = "number")]
    pub id: i64,
    #[ts(type = "number")]
    pub user_id: i64,
    #[ts(type = "number")]
    pub sweet_id: i64,
    pub date: DateTime<Utc>,
    pub time_slot: String,
    pub status: BookingStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking with the booked sweet embedded, as the frontend renders it
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct BookingWithSweet {
    #[serde(flatten)]
    #[ts(flatten)]
    pub booking: Booking,
    pub sweet: SweetListing,
}

#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub user_id: i64,
    pub sweet_id: i64,
    pub date: DateTime<Utc>,
    pub time_slot: String,
    pub status: BookingStatus,
    pub note: String,
}

impl Booking {
    pub async fn create<'e, E>(executor: E, data: &CreateBooking) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, Booking>(
            r#"INSERT INTO bookings (user_id, sweet_id, date, time_slot, status, note, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
               RETURNING id, user_id, sweet_id, date, time_slot, status, note, created_at, updated_at"#,
        )
        .bind(data.user_id)
        .bind(data.sweet_id)
        .bind(data.date)
        .bind(&data.time_slot)
        .bind(data.status)
        .bind(&data.note)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"SELECT id, user_id, sweet_id, date, time_slot, status, note, created_at, updated_at
               FROM bookings
               WHERE user_id = $1
               ORDER BY created_at DESC, id DESC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: i64,
        status: BookingStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
