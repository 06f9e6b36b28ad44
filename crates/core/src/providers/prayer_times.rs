//! Daily prayer times for a city
//!
//! Geocode the city, resolve its timezone, then ask HalalTrip for the
//! timings of the requested (or current) day.

use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::{str_field, HalalTripApi, SERVICE};
use crate::error::{FarahError, Result};
use crate::geo::Geocoder;
use crate::types::{CityCountry, Prayer};

/// Timings for one day
#[derive(Debug, Clone, PartialEq)]
pub struct PrayerTimes {
    /// Date key as returned by the API (`dd-mm-yyyy`)
    pub date: String,
    pub timings: Vec<(Prayer, String)>,
}

impl PrayerTimes {
    pub fn get(&self, prayer: Prayer) -> Option<&str> {
        self.timings
            .iter()
            .find(|(p, _)| *p == prayer)
            .map(|(_, time)| time.as_str())
    }
}

pub struct PrayerTimesProvider {
    api: Arc<dyn HalalTripApi>,
    geocoder: Arc<dyn Geocoder>,
}

impl PrayerTimesProvider {
    pub fn new(api: Arc<dyn HalalTripApi>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { api, geocoder }
    }

    pub async fn times_for(
        &self,
        place: &CityCountry,
        date: Option<NaiveDate>,
    ) -> Result<PrayerTimes> {
        let address = format!("{}, {}", place.city, place.country);
        let point = self
            .geocoder
            .geocode(&address)
            .await?
            .ok_or_else(|| FarahError::not_found("geocoding", address.clone()))?
            .coordinates;
        let timezone = self.geocoder.timezone(point).await?;

        info!(city = %place.city, country = %place.country, timezone = %timezone, "Fetching prayer times");

        let date_param = date.map(|d| d.format("%d-%m-%Y").to_string());
        let mut query = vec![
            ("lat", point.latitude.to_string()),
            ("lng", point.longitude.to_string()),
            ("timeZoneId", timezone),
        ];
        if let Some(d) = &date_param {
            query.push(("date", d.clone()));
        }

        let body = self.api.get("prayertimes/", &query).await?;
        parse_prayer_times(&body, date_param.as_deref())
            .ok_or_else(|| FarahError::decode(SERVICE, "prayer times missing from response"))
    }
}

/// Pick the day matching `date_key`, else the first day in the response
fn parse_prayer_times(body: &Value, date_key: Option<&str>) -> Option<PrayerTimes> {
    let days = body.get("prayer")?.as_object()?;
    let (date, timings) = date_key
        .and_then(|key| days.iter().find(|(k, _)| k.as_str() == key))
        .or_else(|| days.iter().next())?;

    let timings: Vec<(Prayer, String)> = Prayer::ALL
        .iter()
        .filter_map(|p| str_field(timings, p.display_name()).map(|t| (*p, t)))
        .collect();
    if timings.is_empty() {
        return None;
    }

    Some(PrayerTimes {
        date: date.clone(),
        timings,
    })
}

// ============================================================================
// Formatting
// ============================================================================

pub fn format_all(place: &CityCountry, times: &PrayerTimes) -> String {
    let mut reply = format!(
        "**🕌 Here are the prayer times for {}, {} on {}:**\n\n",
        place.city, place.country, times.date
    );
    for prayer in Prayer::ALL {
        reply.push_str(&format!(
            "**{}** ⏰: {}\n",
            prayer.display_name(),
            times.get(prayer).unwrap_or("N/A")
        ));
    }
    reply
}

pub fn format_single(prayer: Prayer, place: &CityCountry, times: &PrayerTimes) -> String {
    match times.get(prayer) {
        Some(time) => format!(
            "The time for **{}** prayer in {}, {} on {} is:\n\n{}",
            prayer.display_name(),
            place.city,
            place.country,
            times.date,
            time
        ),
        None => format!("{} time not available.", prayer.display_name()),
    }
}
