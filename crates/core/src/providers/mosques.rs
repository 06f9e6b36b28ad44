//! Mosque listings: area keyword search and radius search

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::{coordinates_field, fetch_decoded, maps_link, matches_area, str_field};
use super::{HalalTripApi, TtlCache};
use crate::error::Result;
use crate::extract::title_case;
use crate::geo::haversine_km;
use crate::types::Coordinates;

const RESOURCE: &str = "mosques";

#[derive(Debug, Clone, PartialEq)]
pub struct Mosque {
    pub id: String,
    pub name: String,
    pub address: String,
    pub coordinates: Option<Coordinates>,
}

impl Mosque {
    pub fn from_value(record: &Value) -> Option<Self> {
        Some(Self {
            id: str_field(record, "id")?,
            name: str_field(record, "name")?,
            address: str_field(record, "address").unwrap_or_default(),
            coordinates: coordinates_field(record),
        })
    }
}

pub struct MosqueProvider {
    api: Arc<dyn HalalTripApi>,
    cache: TtlCache<Mosque>,
}

impl MosqueProvider {
    pub fn new(api: Arc<dyn HalalTripApi>, ttl: Duration) -> Self {
        Self {
            api,
            cache: TtlCache::new(RESOURCE, ttl),
        }
    }

    pub async fn all(&self) -> Result<Arc<Vec<Mosque>>> {
        self.cache
            .get_or_refresh(|| fetch_decoded(self.api.as_ref(), RESOURCE, Mosque::from_value))
            .await
    }

    /// Mosques whose name and address contain every area keyword, de-duplicated by id
    pub async fn by_area(&self, area: &str) -> Result<Vec<Mosque>> {
        let all = self.all().await?;
        let mut seen = std::collections::HashSet::new();
        Ok(all
            .iter()
            .filter(|m| matches_area(area, &format!("{} {}", m.name, m.address)))
            .filter(|m| seen.insert(m.id.clone()))
            .cloned()
            .collect())
    }

    /// Mosques within `radius_km` of `point`, nearest first
    pub async fn nearby(&self, point: Coordinates, radius_km: f64) -> Result<Vec<(Mosque, f64)>> {
        let all = self.all().await?;
        Ok(within_radius(&all, point, radius_km))
    }
}

fn within_radius(mosques: &[Mosque], point: Coordinates, radius_km: f64) -> Vec<(Mosque, f64)> {
    let mut matches: Vec<(Mosque, f64)> = mosques
        .iter()
        .filter_map(|m| {
            let distance = haversine_km(point, m.coordinates?);
            (distance <= radius_km).then(|| (m.clone(), distance))
        })
        .collect();
    matches.sort_by(|a, b| a.1.total_cmp(&b.1));
    matches
}

// ============================================================================
// Formatting
// ============================================================================

pub fn format_by_area(area: &str, mosques: &[Mosque], limit: usize) -> String {
    let area = title_case(area);
    if mosques.is_empty() {
        return format!("No mosques found in {}.", area);
    }

    let mut reply = format!("**🕌 Here are some mosques in {}:**\n\n", area);
    for (i, mosque) in mosques.iter().take(limit).enumerate() {
        reply.push_str(&format!(
            "{}. **{}**\n   📍 Address: {}\n   [[(map)]({})]\n\n",
            i + 1,
            mosque.name,
            mosque.address,
            maps_link(None, &mosque.address),
        ));
    }
    if mosques.len() < limit {
        reply.push_str(&format!(
            "Note: There are only {} mosques in {}.\n",
            mosques.len(),
            area
        ));
    }
    reply
}

pub fn format_nearby(radius_km: f64, mosques: &[(Mosque, f64)], limit: usize) -> String {
    if mosques.is_empty() {
        return format!("No mosques found within {} km of your location.", radius_km);
    }

    let mut reply = format!(
        "**🕌 Here are some mosques within {} km of your location:**\n\n",
        radius_km
    );
    for (i, (mosque, distance)) in mosques.iter().take(limit).enumerate() {
        reply.push_str(&format!(
            "{}. **{}**\n   📍 Address: {}\n   📏 Distance: {:.2} km [[(map)]({})]\n\n",
            i + 1,
            mosque.name,
            mosque.address,
            distance,
            maps_link(mosque.coordinates, &mosque.address),
        ));
    }
    if mosques.len() < limit {
        reply.push_str(&format!(
            "Note: There are only {} mosques within {} km of your location.\n",
            mosques.len(),
            radius_km
        ));
    }
    reply
}
