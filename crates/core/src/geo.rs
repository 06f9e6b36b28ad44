//! Geocoding and great-circle distance
//!
//! Wraps the Google Maps geocoding and timezone endpoints behind [`Geocoder`]
//! and resolves extracted location spans into a (city, country) pair.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GoogleConfig;
use crate::error::{send_json, FarahError, Result};
use crate::types::{CityCountry, Coordinates};

const SERVICE: &str = "google-maps";

/// Mean Earth radius in kilometres
const EARTH_RADIUS_KM: f64 = 6371.0;

// ============================================================================
// Geocoder Trait
// ============================================================================

/// A geocoded address
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub coordinates: Coordinates,
    /// Long name of the `locality` component, if any
    pub city: Option<String>,
    /// Long name of the `country` component, if any
    pub country: Option<String>,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocode a free-text address; `Ok(None)` when nothing matches
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedPlace>>;

    /// IANA timezone id for a point
    async fn timezone(&self, point: Coordinates) -> Result<String>;
}

// ============================================================================
// Google Maps Client
// ============================================================================

#[derive(Deserialize, Debug)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize, Debug)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    geometry: Geometry,
}

#[derive(Deserialize, Debug)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct Geometry {
    location: LatLng,
}

#[derive(Deserialize, Debug)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TimezoneResponse {
    #[serde(default)]
    status: String,
    time_zone_id: Option<String>,
}

impl GeocodeResult {
    fn component(&self, kind: &str) -> Option<String> {
        self.address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.long_name.clone())
    }

    fn into_place(self) -> GeocodedPlace {
        GeocodedPlace {
            coordinates: Coordinates::new(self.geometry.location.lat, self.geometry.location.lng),
            city: self.component("locality"),
            country: self.component("country"),
        }
    }
}

/// Google Maps geocoding/timezone client
pub struct GoogleMapsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleMapsClient {
    pub fn new(config: &GoogleConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FarahError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Geocoder for GoogleMapsClient {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedPlace>> {
        let request = self
            .client
            .get(format!("{}/geocode/json", self.base_url))
            .query(&[("address", address), ("key", self.api_key.as_str())]);

        let body = send_json(SERVICE, request).await?;
        let response: GeocodeResponse =
            serde_json::from_value(body).map_err(|e| FarahError::decode(SERVICE, e))?;

        let place = response.results.into_iter().next().map(GeocodeResult::into_place);
        debug!(address, found = place.is_some(), "Geocoded address");
        Ok(place)
    }

    async fn timezone(&self, point: Coordinates) -> Result<String> {
        let location = format!("{},{}", point.latitude, point.longitude);
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let request = self
            .client
            .get(format!("{}/timezone/json", self.base_url))
            .query(&[
                ("location", location.as_str()),
                ("timestamp", timestamp.as_str()),
                ("key", self.api_key.as_str()),
            ]);

        let body = send_json(SERVICE, request).await?;
        let response: TimezoneResponse =
            serde_json::from_value(body).map_err(|e| FarahError::decode(SERVICE, e))?;

        match response.time_zone_id {
            Some(zone) if response.status == "OK" => Ok(zone),
            _ => Err(FarahError::not_found(SERVICE, location)),
        }
    }
}

// ============================================================================
// Location Resolution
// ============================================================================

/// Resolve the first location span that geocodes to both a city and a country
///
/// A place with a country but no locality whose name equals the country
/// (Singapore, Monaco) counts as its own city. Geocoding failures for one
/// span are logged and the next span is tried.
pub async fn detect_city_country(
    geocoder: &dyn Geocoder,
    locations: &[String],
) -> Option<CityCountry> {
    for location in locations {
        let place = match geocoder.geocode(location).await {
            Ok(Some(place)) => place,
            Ok(None) => continue,
            Err(e) => {
                warn!(location = %location, error = %e, "Geocoding failed");
                continue;
            }
        };

        let country = match place.country {
            Some(country) => country,
            None => continue,
        };
        let city = place
            .city
            .or_else(|| country.eq_ignore_ascii_case(location).then(|| country.clone()));

        if let Some(city) = city {
            return Some(CityCountry { city, country });
        }
    }
    None
}

/// Great-circle distance in kilometres (haversine)
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGeocoder;

    #[test]
    fn test_haversine_known_distance() {
        let kl = Coordinates::new(3.1390, 101.6869);
        let singapore = Coordinates::new(1.3521, 103.8198);
        let d = haversine_km(kl, singapore);
        assert!((d - 309.0).abs() < 5.0, "got {}", d);
        assert_eq!(haversine_km(kl, kl), 0.0);
    }

    #[test]
    fn test_geocode_response_components() {
        let body = serde_json::json!({
            "results": [{
                "address_components": [
                    {"long_name": "Dubai", "types": ["locality", "political"]},
                    {"long_name": "United Arab Emirates", "types": ["country", "political"]}
                ],
                "geometry": {"location": {"lat": 25.2, "lng": 55.27}}
            }],
            "status": "OK"
        });
        let response: GeocodeResponse = serde_json::from_value(body).unwrap();
        let place = response.results.into_iter().next().unwrap().into_place();
        assert_eq!(place.city.as_deref(), Some("Dubai"));
        assert_eq!(place.country.as_deref(), Some("United Arab Emirates"));
        assert_eq!(place.coordinates, Coordinates::new(25.2, 55.27));
    }

    #[tokio::test]
    async fn test_city_state_fallback() {
        let geocoder = FakeGeocoder::new().with_place("Singapore", None, Some("Singapore"));
        let resolved = detect_city_country(&geocoder, &["Singapore".to_string()])
            .await
            .unwrap();
        assert_eq!(resolved.city, "Singapore");
        assert_eq!(resolved.country, "Singapore");
    }

    #[tokio::test]
    async fn test_skips_unresolvable_spans() {
        let geocoder = FakeGeocoder::new()
            .with_place("Bedok", None, Some("Singapore"))
            .with_place("Paris", Some("Paris"), Some("France"));
        let resolved = detect_city_country(
            &geocoder,
            &["Atlantis".to_string(), "Bedok".to_string(), "Paris".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(resolved.city, "Paris");
        assert_eq!(resolved.country, "France");
    }

    #[tokio::test]
    async fn test_nothing_resolves() {
        let geocoder = FakeGeocoder::new();
        assert!(detect_city_country(&geocoder, &["Atlantis".to_string()]).await.is_none());
    }
}
