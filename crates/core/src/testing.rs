//! In-process test doubles for the collaborator traits
//!
//! Compiled for this crate's tests and, with the `testing` feature, for
//! other crates' tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{FarahError, Result};
use crate::geo::{GeocodedPlace, Geocoder};
use crate::intent::Classifier;
use crate::llm::{CompletionRequest, Oracle};
use crate::providers::HalalTripApi;
use crate::types::{Coordinates, Intent};

// ============================================================================
// Oracle
// ============================================================================

/// Scripted language-model oracle
#[derive(Default)]
pub struct FakeOracle {
    completions: Mutex<VecDeque<String>>,
    flagged_words: HashSet<String>,
    moderation_fails: bool,
    embeddings: HashMap<String, Vec<f32>>,
    requests: Mutex<Vec<CompletionRequest>>,
    moderation_calls: AtomicUsize,
    embed_calls: AtomicUsize,
}

impl FakeOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completions returned in order; once exhausted `complete` fails
    pub fn with_completions<I, S>(self, completions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.completions
            .lock()
            .unwrap()
            .extend(completions.into_iter().map(Into::into));
        self
    }

    /// Messages containing this word (case-insensitive) are flagged
    pub fn flagging(mut self, word: &str) -> Self {
        self.flagged_words.insert(word.to_lowercase());
        self
    }

    pub fn failing_moderation(mut self) -> Self {
        self.moderation_fails = true;
        self
    }

    pub fn with_embedding(mut self, text: &str, embedding: Vec<f32>) -> Self {
        self.embeddings.insert(text.to_string(), embedding);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn moderation_calls(&self) -> usize {
        self.moderation_calls.load(Ordering::SeqCst)
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for FakeOracle {
    async fn moderate(&self, text: &str) -> Result<bool> {
        self.moderation_calls.fetch_add(1, Ordering::SeqCst);
        if self.moderation_fails {
            return Err(FarahError::transport("fake-oracle", "moderation unavailable"));
        }
        let lower = text.to_lowercase();
        Ok(self.flagged_words.iter().any(|w| lower.contains(w)))
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| FarahError::transport("fake-oracle", "no scripted completion"))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        self.embeddings
            .get(text)
            .cloned()
            .ok_or_else(|| FarahError::not_found("fake-oracle", text))
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Classifier answering from a message -> intent table
///
/// Unscripted messages fail, like an unreachable oracle would.
#[derive(Default)]
pub struct ScriptedClassifier {
    script: HashMap<String, Intent>,
    calls: Mutex<Vec<(String, Option<Intent>)>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, message: &str, intent: Intent) -> Self {
        self.script.insert(message.to_string(), intent);
        self
    }

    /// (message, previous intent) of every call
    pub fn calls(&self) -> Vec<(String, Option<Intent>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, message: &str, previous_intent: Option<&Intent>) -> Result<Intent> {
        self.calls
            .lock()
            .unwrap()
            .push((message.to_string(), previous_intent.cloned()));
        self.script
            .get(message)
            .cloned()
            .ok_or_else(|| FarahError::decode("scripted-classifier", message))
    }
}

// ============================================================================
// Geocoder
// ============================================================================

/// Geocoder over a fixed address table (case-insensitive)
pub struct FakeGeocoder {
    places: HashMap<String, GeocodedPlace>,
    timezone: String,
}

impl Default for FakeGeocoder {
    fn default() -> Self {
        Self {
            places: HashMap::new(),
            timezone: "UTC".to_string(),
        }
    }
}

impl FakeGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(self, address: &str, city: Option<&str>, country: Option<&str>) -> Self {
        self.with_place_at(address, city, country, Coordinates::new(1.0, 1.0))
    }

    pub fn with_place_at(
        mut self,
        address: &str,
        city: Option<&str>,
        country: Option<&str>,
        coordinates: Coordinates,
    ) -> Self {
        self.places.insert(
            address.to_lowercase(),
            GeocodedPlace {
                coordinates,
                city: city.map(str::to_string),
                country: country.map(str::to_string),
            },
        );
        self
    }

    pub fn with_timezone(mut self, timezone: &str) -> Self {
        self.timezone = timezone.to_string();
        self
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedPlace>> {
        Ok(self.places.get(&address.to_lowercase()).cloned())
    }

    async fn timezone(&self, _point: Coordinates) -> Result<String> {
        Ok(self.timezone.clone())
    }
}

// ============================================================================
// HalalTrip API
// ============================================================================

/// In-memory HalalTrip API with request counters
#[derive(Default)]
pub struct FakeHalalTrip {
    listings: HashMap<String, Vec<Vec<Value>>>,
    failing_pages: Mutex<HashSet<(String, u32)>>,
    failing_gets: HashSet<String>,
    responses: HashMap<String, Value>,
    page_requests: Mutex<HashMap<String, usize>>,
    gets: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeHalalTrip {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages of a listing resource; pages past the end are empty
    pub fn with_listing(mut self, resource: &str, pages: Vec<Vec<Value>>) -> Self {
        self.listings.insert(resource.to_string(), pages);
        self
    }

    /// Fail one page of a listing with HTTP 503
    pub fn failing_page(self, resource: &str, page: u32) -> Self {
        self.fail_page(resource, page);
        self
    }

    /// Start failing one page of a listing from now on
    pub fn fail_page(&self, resource: &str, page: u32) {
        self.failing_pages
            .lock()
            .unwrap()
            .insert((resource.to_string(), page));
    }

    /// Fail GET `path` with HTTP 503
    pub fn failing_get(mut self, path: &str) -> Self {
        self.failing_gets.insert(path.to_string());
        self
    }

    /// Body returned for GET `path`; unknown paths answer HTTP 404
    pub fn with_response(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_string(), body);
        self
    }

    pub fn page_requests(&self, resource: &str) -> usize {
        self.page_requests
            .lock()
            .unwrap()
            .get(resource)
            .copied()
            .unwrap_or(0)
    }

    pub fn last_get(&self) -> Option<(String, Vec<(String, String)>)> {
        self.gets.lock().unwrap().last().cloned()
    }

    pub fn get_count(&self) -> usize {
        self.gets.lock().unwrap().len()
    }
}

#[async_trait]
impl HalalTripApi for FakeHalalTrip {
    async fn fetch_page(&self, resource: &str, page: u32) -> Result<Vec<Value>> {
        *self
            .page_requests
            .lock()
            .unwrap()
            .entry(resource.to_string())
            .or_default() += 1;

        if self
            .failing_pages
            .lock()
            .unwrap()
            .contains(&(resource.to_string(), page))
        {
            return Err(FarahError::Status {
                service: "fake-halaltrip",
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        Ok(self
            .listings
            .get(resource)
            .and_then(|pages| pages.get(page.saturating_sub(1) as usize))
            .cloned()
            .unwrap_or_default())
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.gets.lock().unwrap().push((
            path.to_string(),
            query.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        ));
        if self.failing_gets.contains(path) {
            return Err(FarahError::Status {
                service: "fake-halaltrip",
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.responses
            .get(path)
            .cloned()
            .ok_or_else(|| FarahError::Status {
                service: "fake-halaltrip",
                status: 404,
                body: format!("no route for {}", path),
            })
    }
}
