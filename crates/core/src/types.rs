//! Domain models shared across the assistant
//!
//! This module contains the core types used throughout the dispatcher, including:
//! - Intent labels (known set plus a catch-all for unrecognized oracle output)
//! - Geographic and flight value types
//! - Date resolution utilities

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use std::fmt;

// ============================================================================
// Intents
// ============================================================================

/// Intent labels handled by the dispatcher
///
/// The classifier oracle is free-form, so anything outside the known set is
/// kept verbatim in [`Intent::Other`] and routed to the default handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Intent {
    Greeting,
    MosqueQuery,
    MosqueNearMe,
    RestaurantQuery,
    RestaurantCuisineQuery,
    RestaurantNearMe,
    RestaurantServiceQuery,
    RestaurantOperatingHoursQuery,
    RestaurantSpecialRequest,
    RestaurantDetailQuery,
    /// Continuation only: the user picked a restaurant off a presented list
    RestaurantNameProvided,
    PrayerTimeQuery,
    InflightPrayerTimes,
    QiblaDirection,
    PackageQuery,
    /// Continuation of a package listing, or a direct lookup by id
    PackageDetailQuery,
    OutOfScope,
    GeneralQuestion,
    Other(String),
}

impl Intent {
    /// Parse a raw oracle label. Returns `None` for blank output.
    pub fn from_label(raw: &str) -> Option<Self> {
        let line = raw.lines().find(|l| !l.trim().is_empty())?;
        let lower = line.trim().to_lowercase();
        let label = lower
            .strip_prefix("intent:")
            .unwrap_or(&lower)
            .trim()
            .trim_matches(|c: char| !(c.is_alphanumeric() || c == '_'));

        if label.is_empty() {
            return None;
        }

        let intent = match label {
            "greeting" => Intent::Greeting,
            "mosque_query" => Intent::MosqueQuery,
            "mosque_near_me" => Intent::MosqueNearMe,
            "restaurant_query" => Intent::RestaurantQuery,
            "restaurant_cuisine_query" => Intent::RestaurantCuisineQuery,
            "restaurant_near_me" => Intent::RestaurantNearMe,
            "restaurant_service_query" => Intent::RestaurantServiceQuery,
            "restaurant_operating_hours_query" => Intent::RestaurantOperatingHoursQuery,
            "restaurant_special_request" => Intent::RestaurantSpecialRequest,
            "restaurant_detail_query" => Intent::RestaurantDetailQuery,
            "restaurant_name_provided" => Intent::RestaurantNameProvided,
            "prayer_time_query" => Intent::PrayerTimeQuery,
            "inflight_prayer_times" => Intent::InflightPrayerTimes,
            "qibla_direction" => Intent::QiblaDirection,
            "package_query" => Intent::PackageQuery,
            "package_detail_query" => Intent::PackageDetailQuery,
            "out_of_scope" => Intent::OutOfScope,
            "general_question" | "default" => Intent::GeneralQuestion,
            other => Intent::Other(other.to_string()),
        };
        Some(intent)
    }

    /// Label as used in prompts and logs
    pub fn as_str(&self) -> &str {
        match self {
            Intent::Greeting => "greeting",
            Intent::MosqueQuery => "mosque_query",
            Intent::MosqueNearMe => "mosque_near_me",
            Intent::RestaurantQuery => "restaurant_query",
            Intent::RestaurantCuisineQuery => "restaurant_cuisine_query",
            Intent::RestaurantNearMe => "restaurant_near_me",
            Intent::RestaurantServiceQuery => "restaurant_service_query",
            Intent::RestaurantOperatingHoursQuery => "restaurant_operating_hours_query",
            Intent::RestaurantSpecialRequest => "restaurant_special_request",
            Intent::RestaurantDetailQuery => "restaurant_detail_query",
            Intent::RestaurantNameProvided => "restaurant_name_provided",
            Intent::PrayerTimeQuery => "prayer_time_query",
            Intent::InflightPrayerTimes => "inflight_prayer_times",
            Intent::QiblaDirection => "qibla_direction",
            Intent::PackageQuery => "package_query",
            Intent::PackageDetailQuery => "package_detail_query",
            Intent::OutOfScope => "out_of_scope",
            Intent::GeneralQuestion => "general_question",
            Intent::Other(label) => label,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Geography
// ============================================================================

/// A point on the globe in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Providers use (0, 0) for "no coordinates on record"
    pub fn is_unset(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

/// A resolved (city, country) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityCountry {
    pub city: String,
    pub country: String,
}

// ============================================================================
// Prayers and flights
// ============================================================================

/// The five daily prayers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    /// Lowercase name used for fuzzy matching
    pub fn as_str(&self) -> &'static str {
        match self {
            Prayer::Fajr => "fajr",
            Prayer::Dhuhr => "dhuhr",
            Prayer::Asr => "asr",
            Prayer::Maghrib => "maghrib",
            Prayer::Isha => "isha",
        }
    }

    /// Capitalized name, as keyed in prayer-time responses
    pub fn display_name(&self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }
}

/// A flight leg extracted from free text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightDetails {
    pub departure_airport: String,
    pub departure_datetime: NaiveDateTime,
    pub arrival_airport: String,
    pub arrival_datetime: NaiveDateTime,
}

impl FlightDetails {
    pub fn departure_param(&self) -> String {
        format_datetime(self.departure_datetime)
    }

    pub fn arrival_param(&self) -> String {
        format_datetime(self.arrival_datetime)
    }
}

/// Format a NaiveDateTime as YYYY-MM-DD HH:MM
pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

// ============================================================================
// Date Resolution
// ============================================================================

/// Resolve a relative date word against `today`
pub fn resolve_relative_date(date_str: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lower = date_str.to_lowercase();
    let trimmed = lower.trim();

    match trimmed {
        "today" => Some(today),
        "tomorrow" => Some(today + Days::new(1)),
        _ => {
            // "next <weekday>" patterns
            if let Some(weekday_str) = trimmed.strip_prefix("next ") {
                return parse_weekday(weekday_str.trim()).map(|w| next_weekday(today, w));
            }
            // Standalone weekday means "this coming <weekday>"
            parse_weekday(trimmed).map(|w| next_weekday(today, w))
        }
    }
}

/// Parse weekday name to chrono::Weekday
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.to_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Find the next occurrence of a weekday (1-7 days from `from`)
pub fn next_weekday(from: NaiveDate, target: Weekday) -> NaiveDate {
    let current = from.weekday();
    let days_ahead = (target.num_days_from_monday() as i64
        - current.num_days_from_monday() as i64
        + 7)
        % 7;

    // If it's the same day, go to next week
    let days_ahead = if days_ahead == 0 { 7 } else { days_ahead as u64 };

    from + Days::new(days_ahead)
}

// ============================================================================
// Tests
// ============================================================================
