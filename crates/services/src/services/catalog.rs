use std::cmp::Reverse;

use db::models::{location::Location, sweet::{Sweet, SweetListing}};
use sqlx::SqlitePool;

/// Words stripped from chat text before looking for a location slug.
const LOCATION_NOISE: [&str; 3] = ["甜心列表", "甜心", "地區"];

pub struct CatalogService;

impl CatalogService {
    pub async fn list_locations(pool: &SqlitePool) -> Result<Vec<Location>, sqlx::Error> {
        Location::find_all(pool).await
    }

    /// Sweets with review aggregates, optionally restricted to a location slug.
    pub async fn list_sweets(
        pool: &SqlitePool,
        location_slug: Option<&str>,
    ) -> Result<Vec<SweetListing>, sqlx::Error> {
        let slug = location_slug.map(str::trim).filter(|s| !s.is_empty());
        Sweet::list_with_stats(pool, slug).await
    }

    pub async fn find_location_from_text(
        pool: &SqlitePool,
        text: &str,
    ) -> Result<Option<Location>, sqlx::Error> {
        let locations = Location::find_all(pool).await?;
        Ok(match_location(&locations, text).cloned())
    }
}

/// Location mentioned in chat text: its name appears in the text, or its
/// slug appears in the lower-cased text once the menu words are removed.
/// When several match, the longest name or slug is taken.
pub fn match_location<'a>(locations: &'a [Location], text: &str) -> Option<&'a Location> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut cleaned = text.to_string();
    for noise in LOCATION_NOISE {
        cleaned = cleaned.replace(noise, "");
    }
    let cleaned = match cleaned.trim() {
        "" => text.to_lowercase(),
        rest => rest.to_lowercase(),
    };

    // Longest match wins so `newtaipei` is not read as `taipei`.
    locations
        .iter()
        .filter_map(|location| {
            let by_name = (!location.name.is_empty() && text.contains(&location.name))
                .then(|| location.name.chars().count());
            let slug = location.slug.to_lowercase();
            let by_slug =
                (!slug.is_empty() && cleaned.contains(&slug)).then(|| slug.chars().count());
            by_name.max(by_slug).map(|len| (len, location))
        })
        .min_by_key(|(len, _)| Reverse(*len))
        .map(|(_, location)| location)
}
