//! Halal restaurant listings
//!
//! Area search (keywords plus optional city/country/cuisine), radius search,
//! and name lookup for the detail/disambiguation flow.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::{coordinates_field, fetch_decoded, maps_link, matches_area, named_field, str_field};
use super::{HalalTripApi, TtlCache};
use crate::error::Result;
use crate::geo::haversine_km;
use crate::matching::{match_tier, MatchTier};
use crate::types::Coordinates;

const RESOURCE: &str = "restaurants";

#[derive(Debug, Clone, PartialEq)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub address: String,
    pub cuisine: String,
    pub description: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl Restaurant {
    pub fn from_value(record: &Value) -> Option<Self> {
        Some(Self {
            id: str_field(record, "id")?,
            name: str_field(record, "restaurantname")?,
            address: str_field(record, "address").unwrap_or_default(),
            cuisine: str_field(record, "cuisine").unwrap_or_default(),
            description: str_field(record, "description").unwrap_or_default(),
            city: named_field(record, "city"),
            country: named_field(record, "country"),
            coordinates: coordinates_field(record),
        })
    }

    fn serves(&self, cuisine: Option<&str>) -> bool {
        cuisine.map_or(true, |c| {
            self.cuisine.to_lowercase().contains(&c.to_lowercase())
        })
    }
}

/// Outcome of looking a restaurant up by name
#[derive(Debug, Clone, PartialEq)]
pub enum NameLookup {
    Exact(Restaurant),
    /// Several candidates; the user has to pick one of these names
    Ambiguous(Vec<String>),
    NotFound,
}

pub struct RestaurantProvider {
    api: Arc<dyn HalalTripApi>,
    cache: TtlCache<Restaurant>,
}

impl RestaurantProvider {
    pub fn new(api: Arc<dyn HalalTripApi>, ttl: Duration) -> Self {
        Self {
            api,
            cache: TtlCache::new(RESOURCE, ttl),
        }
    }

    pub async fn all(&self) -> Result<Arc<Vec<Restaurant>>> {
        self.cache
            .get_or_refresh(|| fetch_decoded(self.api.as_ref(), RESOURCE, Restaurant::from_value))
            .await
    }

    /// Restaurants matching every given constraint
    ///
    /// Area keywords must all occur in name + address; city and country are
    /// compared case-insensitively with the record's; cuisine is a substring.
    pub async fn by_area(
        &self,
        area: &str,
        city: Option<&str>,
        country: Option<&str>,
        cuisine: Option<&str>,
    ) -> Result<Vec<Restaurant>> {
        let all = self.all().await?;
        let same = |wanted: Option<&str>, actual: &Option<String>| match wanted {
            None => true,
            Some(w) => actual.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(w.trim())),
        };

        Ok(all
            .iter()
            .filter(|r| matches_area(area, &format!("{} {}", r.name, r.address)))
            .filter(|r| same(city, &r.city) && same(country, &r.country))
            .filter(|r| r.serves(cuisine))
            .cloned()
            .collect())
    }

    /// Restaurants within `radius_km` of `point`, nearest first
    pub async fn nearby(
        &self,
        point: Coordinates,
        radius_km: f64,
        cuisine: Option<&str>,
    ) -> Result<Vec<(Restaurant, f64)>> {
        let all = self.all().await?;
        Ok(within_radius(&all, point, radius_km, cuisine))
    }

    /// Look a restaurant up by (possibly partial or misspelled) name
    pub async fn lookup_by_name(
        &self,
        name: &str,
        threshold: f64,
        max_candidates: usize,
    ) -> Result<NameLookup> {
        let all = self.all().await?;
        Ok(lookup_in(&all, name, threshold, max_candidates))
    }

    /// Restaurant whose name equals `name` (case-insensitive)
    pub async fn find_exact(&self, name: &str) -> Result<Option<Restaurant>> {
        let all = self.all().await?;
        let name = name.trim();
        Ok(all.iter().find(|r| r.name.eq_ignore_ascii_case(name)).cloned())
    }
}

pub(crate) fn within_radius(
    restaurants: &[Restaurant],
    point: Coordinates,
    radius_km: f64,
    cuisine: Option<&str>,
) -> Vec<(Restaurant, f64)> {
    let mut matches: Vec<(Restaurant, f64)> = restaurants
        .iter()
        .filter(|r| r.serves(cuisine))
        .filter_map(|r| {
            let distance = haversine_km(point, r.coordinates?);
            (distance <= radius_km).then(|| (r.clone(), distance))
        })
        .collect();
    matches.sort_by(|a, b| a.1.total_cmp(&b.1));
    matches
}

fn lookup_in(
    restaurants: &[Restaurant],
    name: &str,
    threshold: f64,
    max_candidates: usize,
) -> NameLookup {
    let mut candidates: Vec<&Restaurant> = Vec::new();

    for restaurant in restaurants {
        match match_tier(name, &restaurant.name, threshold) {
            Some(MatchTier::Exact) => return NameLookup::Exact(restaurant.clone()),
            Some(_) => candidates.push(restaurant),
            None => {}
        }
    }

    match candidates.as_slice() {
        [] => NameLookup::NotFound,
        [only] => NameLookup::Exact((*only).clone()),
        many => {
            let mut names: Vec<String> = Vec::new();
            for r in many {
                if !names.iter().any(|n| n.eq_ignore_ascii_case(&r.name)) {
                    names.push(r.name.clone());
                }
            }
            names.truncate(max_candidates);
            NameLookup::Ambiguous(names)
        }
    }
}

// ============================================================================
// Formatting
// ============================================================================

fn push_restaurant(reply: &mut String, index: usize, r: &Restaurant, distance: Option<f64>) {
    reply.push_str(&format!("{}. **{}**\n   📍 Address: {}\n", index, r.name, r.address));
    if let Some(distance) = distance {
        reply.push_str(&format!("   📏 Distance: {:.2} km\n", distance));
    }
    reply.push_str(&format!(
        "   🍴 Cuisine: {}\n   📝 Description: {}\n   🌐 [(View on Map)]({})\n\n",
        r.cuisine,
        r.description,
        maps_link(r.coordinates, &r.address),
    ));
}

pub fn format_by_area(
    location: &str,
    cuisine: Option<&str>,
    restaurants: &[Restaurant],
    limit: usize,
) -> String {
    if restaurants.is_empty() {
        return match cuisine {
            Some(c) => format!("No halal {} restaurants found in {}.", c, location),
            None => format!("No halal restaurants found in {}.", location),
        };
    }

    let mut reply = format!("**🍽️ Here are some halal restaurants in {}", location);
    if let Some(c) = cuisine {
        reply.push_str(&format!(" serving {} cuisine", c));
    }
    reply.push_str(":**\n\n");
    for (i, r) in restaurants.iter().take(limit).enumerate() {
        push_restaurant(&mut reply, i + 1, r, None);
    }
    reply
}

pub fn format_nearby(
    radius_km: f64,
    cuisine: Option<&str>,
    restaurants: &[(Restaurant, f64)],
    limit: usize,
) -> String {
    if restaurants.is_empty() {
        return format!("No halal restaurants found within {} km of your location.", radius_km);
    }

    let mut reply = format!(
        "**🍽️ Here are some halal restaurants within {} km of your location",
        radius_km
    );
    if let Some(c) = cuisine {
        reply.push_str(&format!(" serving {} cuisine", c));
    }
    reply.push_str(":**\n\n");
    for (i, (r, distance)) in restaurants.iter().take(limit).enumerate() {
        push_restaurant(&mut reply, i + 1, r, Some(*distance));
    }
    if restaurants.len() < limit {
        reply.push_str(&format!(
            "Note: There are only {} halal restaurants within {} km of your location.\n",
            restaurants.len(),
            radius_km
        ));
    }
    reply
}

pub fn format_detail(r: &Restaurant) -> String {
    let mut reply = format!("**🍽️ {}**\n\n📍 Address: {}\n", r.name, r.address);
    let place: Vec<&str> = [r.city.as_deref(), r.country.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !place.is_empty() {
        reply.push_str(&format!("🏙️ Location: {}\n", place.join(", ")));
    }
    reply.push_str(&format!(
        "🍴 Cuisine: {}\n📝 Description: {}\n🌐 [(View on Map)]({})\n",
        r.cuisine,
        r.description,
        maps_link(r.coordinates, &r.address),
    ));
    reply
}

/// Ask the user to pick one of several restaurants
pub fn format_candidates(names: &[String]) -> String {
    let mut reply = String::from("I found several restaurants matching that name:\n\n");
    for (i, name) in names.iter().enumerate() {
        reply.push_str(&format!("{}. {}\n", i + 1, name));
    }
    reply.push_str("\nPlease reply with the exact name of the restaurant you're interested in.");
    reply
}
