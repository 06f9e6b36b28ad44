//! Inflight prayer times for a flight leg

use std::sync::Arc;
use tracing::info;

use super::{HalalTripApi, SERVICE};
use crate::error::{FarahError, Result};
use crate::types::FlightDetails;

pub struct InflightProvider {
    api: Arc<dyn HalalTripApi>,
}

impl InflightProvider {
    pub fn new(api: Arc<dyn HalalTripApi>) -> Self {
        Self { api }
    }

    /// (prayer, time) pairs in the order the API returns them
    pub async fn times(&self, flight: &FlightDetails) -> Result<Vec<(String, String)>> {
        info!(
            from = %flight.departure_airport,
            to = %flight.arrival_airport,
            "Fetching inflight prayer times"
        );

        let query = [
            ("departureAP", flight.departure_airport.clone()),
            ("departureDateTime", flight.departure_param()),
            ("arrivalAP", flight.arrival_airport.clone()),
            ("arrivalDateTime", flight.arrival_param()),
        ];
        let body = self.api.get("inflight/", &query).await?;

        let times: Vec<(String, String)> = body
            .get("data")
            .and_then(|d| d.as_object())
            .map(|data| {
                data.iter()
                    .map(|(prayer, time)| {
                        let time = match time {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (prayer.clone(), time)
                    })
                    .collect()
            })
            .unwrap_or_default();

        if times.is_empty() {
            return Err(FarahError::not_found(
                SERVICE,
                format!("{} to {}", flight.departure_airport, flight.arrival_airport),
            ));
        }
        Ok(times)
    }
}

pub fn format_times(flight: &FlightDetails, times: &[(String, String)]) -> String {
    let mut reply = format!(
        "**🛫 Inflight Prayer Times:**\n\nFrom **{}** to **{}**\nDeparture: {}\nArrival: {}\n\n",
        flight.departure_airport,
        flight.arrival_airport,
        flight.departure_param(),
        flight.arrival_param(),
    );
    for (prayer, time) in times {
        let mut name = prayer.to_lowercase();
        if let Some(first) = name.get(..1) {
            name = first.to_uppercase() + &name[1..];
        }
        reply.push_str(&format!("**{}**: {}\n", name, time));
    }
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHalalTrip;
    use chrono::NaiveDate;
    use serde_json::json;

    fn flight() -> FlightDetails {
        let day = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        FlightDetails {
            departure_airport: "SIN".to_string(),
            departure_datetime: day.and_hms_opt(10, 0, 0).unwrap(),
            arrival_airport: "DEL".to_string(),
            arrival_datetime: day.and_hms_opt(14, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_times_query_params() {
        let api = Arc::new(FakeHalalTrip::new().with_response(
            "inflight/",
            json!({"data": {"dhuhr": "12:41", "asr": "15:58"}}),
        ));
        let provider = InflightProvider::new(api.clone());
        let times = provider.times(&flight()).await.unwrap();
        assert_eq!(times.len(), 2);

        let (_, query) = api.last_get().unwrap();
        assert!(query.contains(&("departureAP".to_string(), "SIN".to_string())));
        assert!(query.contains(&(
            "arrivalDateTime".to_string(),
            "2024-02-28 14:00".to_string()
        )));
    }

    #[tokio::test]
    async fn test_empty_data_is_not_found() {
        let api = Arc::new(FakeHalalTrip::new().with_response("inflight/", json!({"data": {}})));
        let err = InflightProvider::new(api).times(&flight()).await.unwrap_err();
        assert!(matches!(err, FarahError::NotFound { .. }));
    }

    #[test]
    fn test_format_times() {
        let reply = format_times(&flight(), &[("dhuhr".to_string(), "12:41".to_string())]);
        assert!(reply.contains("From **SIN** to **DEL**"));
        assert!(reply.contains("Departure: 2024-02-28 10:00"));
        assert!(reply.ends_with("**Dhuhr**: 12:41\n"));
    }
}
