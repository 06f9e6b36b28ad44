//! Travel-data providers
//!
//! All listing data comes from the HalalTrip API. Listings are paginated
//! (`?page=1, 2, ...` until an empty page) and cached whole; every filter runs
//! over the cached listing.

pub mod cache;
pub mod inflight;
pub mod mosques;
pub mod packages;
pub mod prayer_times;
pub mod restaurants;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::HalalTripConfig;
use crate::error::{send_json, FarahError, Result};
use crate::types::Coordinates;

pub use cache::TtlCache;
pub use inflight::InflightProvider;
pub use mosques::{Mosque, MosqueProvider};
pub use packages::{Package, PackageProvider};
pub use prayer_times::{PrayerTimes, PrayerTimesProvider};
pub use restaurants::{NameLookup, Restaurant, RestaurantProvider};

pub(crate) const SERVICE: &str = "halaltrip";

// ============================================================================
// API Trait
// ============================================================================

#[async_trait]
pub trait HalalTripApi: Send + Sync {
    /// Records on one page of a listing resource (`mosques`, `restaurants`, `packages`)
    async fn fetch_page(&self, resource: &str, page: u32) -> Result<Vec<Value>>;

    /// Raw JSON body of a GET request
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value>;
}

/// HalalTrip REST client (`APIKEY` / `TOKEN` header auth)
pub struct HalalTripClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    token: String,
}

impl HalalTripClient {
    pub fn new(
        config: &HalalTripConfig,
        api_key: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FarahError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl HalalTripApi for HalalTripClient {
    async fn fetch_page(&self, resource: &str, page: u32) -> Result<Vec<Value>> {
        let body = self.get(resource, &[("page", page.to_string())]).await?;
        match body.get("data") {
            Some(Value::Array(records)) => Ok(records.clone()),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(FarahError::decode(
                SERVICE,
                format!("expected a 'data' array for {}, got {}", resource, other),
            )),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(url = %url, "HalalTrip request");
        let request = self
            .client
            .get(url)
            .header("APIKEY", &self.api_key)
            .header("TOKEN", &self.token)
            .query(query);
        send_json(SERVICE, request).await
    }
}

/// Fetch every page of a listing resource
///
/// Stops at the first empty page. Any failed page aborts the whole fetch.
pub async fn fetch_all(api: &dyn HalalTripApi, resource: &str) -> Result<Vec<Value>> {
    let mut records = Vec::new();
    let mut page = 1;

    loop {
        let batch = api.fetch_page(resource, page).await?;
        if batch.is_empty() {
            debug!(resource, page, "Empty page, ending pagination");
            break;
        }
        debug!(resource, page, count = batch.len(), "Fetched page");
        records.extend(batch);
        page += 1;
    }

    info!(resource, total = records.len(), "Fetched listing");
    Ok(records)
}

/// Fetch a listing and decode it, skipping records that do not decode
pub(crate) async fn fetch_decoded<T>(
    api: &dyn HalalTripApi,
    resource: &str,
    decode: fn(&Value) -> Option<T>,
) -> Result<Vec<T>> {
    let raw = fetch_all(api, resource).await?;
    let total = raw.len();
    let records: Vec<T> = raw.iter().filter_map(decode).collect();
    if records.len() < total {
        warn!(
            resource,
            skipped = total - records.len(),
            "Skipped undecodable records"
        );
    }
    Ok(records)
}

// ============================================================================
// Lenient Field Access
// ============================================================================

/// String field; numbers are rendered, blanks are `None`
pub(crate) fn str_field(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric field given as a number or a numeric string
pub(crate) fn f64_field(record: &Value, key: &str) -> Option<f64> {
    match record.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A `{"name": ...}` object or a plain string
pub(crate) fn named_field(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::Object(_) => record.get(key).and_then(|v| str_field(v, "name")),
        _ => str_field(record, key),
    }
}

/// Coordinates from `latitude`/`longitude`; (0, 0) counts as missing
pub(crate) fn coordinates_field(record: &Value) -> Option<Coordinates> {
    let point = Coordinates::new(
        f64_field(record, "latitude")?,
        f64_field(record, "longitude")?,
    );
    (!point.is_unset()).then_some(point)
}

// ============================================================================
// Reply Formatting
// ============================================================================

/// Google Maps search link from coordinates, else from the address
pub fn maps_link(coordinates: Option<Coordinates>, address: &str) -> String {
    let query = match coordinates {
        Some(point) => format!("{},{}", point.latitude, point.longitude),
        None => urlencoding::encode(address).replace("%20", "+"),
    };
    format!("https://www.google.com/maps/search/?api=1&query={}", query)
}

/// All whitespace-separated keywords of `area` occur in `haystack` (lowercased)
pub(crate) fn matches_area(area: &str, haystack: &str) -> bool {
    let haystack = haystack.to_lowercase();
    area.to_lowercase()
        .split_whitespace()
        .all(|keyword| haystack.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHalalTrip;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_all_stops_at_empty_page() {
        let api = FakeHalalTrip::new().with_listing(
            "mosques",
            vec![vec![json!({"id": 1}), json!({"id": 2})], vec![json!({"id": 3})]],
        );
        let records = fetch_all(&api, "mosques").await.unwrap();
        assert_eq!(records.len(), 3);
        // Two full pages plus the terminating empty page
        assert_eq!(api.page_requests("mosques"), 3);
    }

    #[tokio::test]
    async fn test_fetch_all_aborts_on_failed_page() {
        let api = FakeHalalTrip::new()
            .with_listing("mosques", vec![vec![json!({"id": 1})]])
            .failing_page("mosques", 2);
        let err = fetch_all(&api, "mosques").await.unwrap_err();
        assert!(matches!(err, FarahError::Status { status: 503, .. }));
    }

    #[test]
    fn test_lenient_fields() {
        let record = json!({
            "id": 12,
            "name": "  Masjid Sultan ",
            "latitude": "1.3022",
            "longitude": 103.8590,
            "city": {"name": "Singapore"},
            "country": "Singapore",
            "blank": "  "
        });
        assert_eq!(str_field(&record, "id").as_deref(), Some("12"));
        assert_eq!(str_field(&record, "name").as_deref(), Some("Masjid Sultan"));
        assert_eq!(str_field(&record, "blank"), None);
        assert_eq!(named_field(&record, "city").as_deref(), Some("Singapore"));
        assert_eq!(named_field(&record, "country").as_deref(), Some("Singapore"));
        assert_eq!(
            coordinates_field(&record),
            Some(Coordinates::new(1.3022, 103.8590))
        );
        assert_eq!(
            coordinates_field(&json!({"latitude": 0, "longitude": "0"})),
            None
        );
    }

    #[test]
    fn test_maps_link() {
        assert_eq!(
            maps_link(Some(Coordinates::new(1.5, 103.25)), "ignored"),
            "https://www.google.com/maps/search/?api=1&query=1.5,103.25"
        );
        assert_eq!(
            maps_link(None, "10 Bedok North Ave, Singapore"),
            "https://www.google.com/maps/search/?api=1&query=10+Bedok+North+Ave%2C+Singapore"
        );
    }

    #[test]
    fn test_matches_area() {
        assert!(matches_area("Bedok Singapore", "Masjid Al-Ansar 155 Bedok North Ave 1 Singapore"));
        assert!(!matches_area("Bedok Malaysia", "155 Bedok North Ave 1 Singapore"));
    }
}
