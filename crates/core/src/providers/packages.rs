//! Travel package listings and detail lookup

use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::{fetch_decoded, str_field, HalalTripApi, TtlCache, SERVICE};
use crate::error::{FarahError, Result};

const RESOURCE: &str = "packages";

#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Option<String>,
}

impl Package {
    pub fn from_value(record: &Value) -> Option<Self> {
        Some(Self {
            id: str_field(record, "id")?,
            name: str_field(record, "name")?,
            description: str_field(record, "description").unwrap_or_default(),
            price: str_field(record, "price"),
        })
    }

    fn text(&self) -> String {
        format!("{} {}", self.name, self.description).to_lowercase()
    }

    /// Name or description mentions a trip of `days` days/nights
    pub fn mentions_duration(&self, days: u32) -> bool {
        let pattern = format!(r"\b{}\s*-?\s*(?:days?|nights?|d)\b", days);
        Regex::new(&pattern).is_ok_and(|re| re.is_match(&self.text()))
    }

    /// Name or description mentions the keyword as a substring
    pub fn mentions(&self, keyword: &str) -> bool {
        self.text().contains(&keyword.to_lowercase())
    }
}

pub struct PackageProvider {
    api: Arc<dyn HalalTripApi>,
    cache: TtlCache<Package>,
}

impl PackageProvider {
    pub fn new(api: Arc<dyn HalalTripApi>, ttl: Duration) -> Self {
        Self {
            api,
            cache: TtlCache::new(RESOURCE, ttl),
        }
    }

    pub async fn all(&self) -> Result<Arc<Vec<Package>>> {
        self.cache
            .get_or_refresh(|| fetch_decoded(self.api.as_ref(), RESOURCE, Package::from_value))
            .await
    }

    /// Packages whose name or description contains the keyword
    pub async fn search(&self, keyword: &str) -> Result<Vec<Package>> {
        let all = self.all().await?;
        Ok(all.iter().filter(|p| p.mentions(keyword)).cloned().collect())
    }

    /// Cached packages with the given ids, in the order of `ids`
    pub async fn by_ids(&self, ids: &[String]) -> Result<Vec<Package>> {
        let all = self.all().await?;
        Ok(ids
            .iter()
            .filter_map(|id| all.iter().find(|p| &p.id == id).cloned())
            .collect())
    }

    /// Fetch one package from the detail endpoint
    pub async fn by_id(&self, id: &str) -> Result<Package> {
        let body = self.api.get(&format!("package/{}", id), &[]).await?;
        body.get("data")
            .and_then(Package::from_value)
            .ok_or_else(|| FarahError::not_found(SERVICE, format!("package {}", id)))
    }
}

// ============================================================================
// Formatting
// ============================================================================

pub fn format_listing(header: &str, packages: &[Package]) -> String {
    let mut reply = format!("**🧳 {}**\n\n", header);
    for (i, p) in packages.iter().enumerate() {
        reply.push_str(&format!("{}. **{}** (ID: {})\n", i + 1, p.name, p.id));
    }
    reply.push_str(
        "\nReply with the package name or its ID (for example \"package id 42\") to see the details.",
    );
    reply
}

pub fn format_detail(p: &Package) -> String {
    let mut reply = format!("**🧳 {}** (ID: {})\n\n", p.name, p.id);
    if !p.description.is_empty() {
        reply.push_str(&format!("📝 {}\n", p.description));
    }
    if let Some(price) = &p.price {
        reply.push_str(&format!("💰 Price: {}\n", price));
    }
    reply
}
