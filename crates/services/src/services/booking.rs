use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use db::models::{
    booking::{Booking, BookingStatus, BookingWithSweet, CreateBooking},
    line_user::LineUser,
    reward_log::RewardLog,
    sweet::{Sweet, SweetListing},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

/// Points credited for every booking.
pub const BOOKING_REWARD_POINTS: i64 = 50;

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const OFFSET_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Invalid booking date")]
    InvalidDate,
    #[error("Sweet not found")]
    SweetNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Reward balance limit reached")]
    RewardLimit,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    #[ts(type = "number")]
    pub sweet_id: i64,
    pub date: String,
    pub time_slot: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Parse a booking date. Values without an offset are read in `offset`.
pub fn parse_booking_date(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, OFFSET_DATETIME_FORMAT) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

pub struct BookingService;

impl BookingService {
    /// Record a pending booking and credit the booking reward, all in one
    /// transaction.
    pub async fn create(
        pool: &SqlitePool,
        user_id: i64,
        request: &NewBooking,
        offset: FixedOffset,
    ) -> Result<BookingWithSweet, BookingError> {
        let date = parse_booking_date(&request.date, offset).ok_or(BookingError::InvalidDate)?;

        let mut tx = pool.begin().await?;

        if !Sweet::lock(&mut *tx, request.sweet_id).await? {
            return Err(BookingError::SweetNotFound);
        }
        let sweet = Sweet::find_by_id(&mut *tx, request.sweet_id)
            .await?
            .ok_or(BookingError::SweetNotFound)?;

        let booking = Booking::create(
            &mut *tx,
            &CreateBooking {
                user_id,
                sweet_id: sweet.id,
                date,
                time_slot: request.time_slot.clone(),
                status: BookingStatus::Pending,
                note: request.note.clone().unwrap_or_default(),
            },
        )
        .await?;

        if LineUser::add_reward_points(&mut *tx, user_id, BOOKING_REWARD_POINTS).await? == 0 {
            return Err(match LineUser::find_by_id(&mut *tx, user_id).await? {
                Some(_) => BookingError::RewardLimit,
                None => BookingError::UserNotFound,
            });
        }
        RewardLog::create(
            &mut *tx,
            user_id,
            BOOKING_REWARD_POINTS,
            &format!("預約 {}", sweet.name),
        )
        .await?;

        let listing = Sweet::find_with_stats(&mut *tx, sweet.id)
            .await?
            .ok_or(BookingError::SweetNotFound)?;

        tx.commit().await?;

        info!(
            booking_id = booking.id,
            user_id,
            sweet_id = sweet.id,
            "Booking created"
        );
        Ok(BookingWithSweet {
            booking,
            sweet: listing,
        })
    }

    /// Bookings of a user with their sweets, newest first.
    pub async fn list_for_user(
        pool: &SqlitePool,
        user_id: i64,
    ) -> Result<Vec<BookingWithSweet>, BookingError> {
        let bookings = Booking::find_by_user_id(pool, user_id).await?;
        let mut sweets: HashMap<i64, SweetListing> = HashMap::new();
        let mut result = Vec::with_capacity(bookings.len());

        for booking in bookings {
            if !sweets.contains_key(&booking.sweet_id) {
                match Sweet::find_with_stats(pool, booking.sweet_id).await? {
                    Some(listing) => {
                        sweets.insert(booking.sweet_id, listing);
                    }
                    None => {
                        warn!(
                            booking_id = booking.id,
                            sweet_id = booking.sweet_id,
                            "Booking refers to a missing sweet, skipping"
                        );
                        continue;
                    }
                }
            }
            if let Some(sweet) = sweets.get(&booking.sweet_id) {
                result.push(BookingWithSweet {
                    sweet: sweet.clone(),
                    booking,
                });
            }
        }
        Ok(result)
    }
}
