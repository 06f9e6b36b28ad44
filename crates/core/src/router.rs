//! Intent dispatcher
//!
//! One turn: moderation gate, intent classification against the session's
//! previous intent, continuation resolution, handler, session update. Every
//! failure ends the turn with a natural-language reply; nothing here panics
//! or returns an error to the caller.

use anyhow::{Context, Result};
use chrono::Local;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{Credentials, DialogueConfig, FarahConfig};
use crate::dialogue::{resolve_intent, select_name, DialogueState, Outcome};
use crate::documents::{DocumentIndex, DocumentMatch};
use crate::error::FarahError;
use crate::extract::{
    extract_cuisine, extract_date, extract_duration, extract_flight_details, extract_keyword,
    extract_location, extract_package_id, extract_package_name, extract_restaurant_name,
    extract_result_count, extract_special_request, match_prayer, strip_span, strip_word,
};
use crate::geo::{detect_city_country, Geocoder, GoogleMapsClient};
use crate::intent::{Classifier, LlmClassifier};
use crate::llm::{ChatMessage, CompletionRequest, OpenAiClient, Oracle};
use crate::matching::best_match;
use crate::providers::{
    inflight, mosques, packages, prayer_times, restaurants, HalalTripApi, HalalTripClient,
    InflightProvider, MosqueProvider, NameLookup, PackageProvider, PrayerTimesProvider,
    RestaurantProvider,
};
use crate::session::SessionStore;
use crate::types::{CityCountry, Coordinates, Intent};

// ============================================================================
// Canned Replies
// ============================================================================

pub const WELCOME_MESSAGE: &str = "👋 Assalamu Alaikum! I'm Farah, your assistant for Muslim-friendly travel. I can help with finding halal restaurants, mosques, prayer times, inflight prayer times and travel packages. How may I assist you today?";

pub const REFUSAL: &str = "I'm sorry, but I can't assist with that request.";

pub const GENERIC_ERROR: &str = "I'm sorry, something went wrong while processing your request.";

const QIBLA_REPLY: &str = "You can find the Qibla direction here: [Qibla Direction](https://www.halaltrip.com/prayertimes/qibla-direction).";

const SERVICE_REPLY: &str = "As of my current information, there's no specific mention of delivery services. I recommend contacting the restaurant directly to inquire about delivery options.";

const HOURS_REPLY: &str = "I'm sorry, but I don't have the current operating hours for that restaurant. I recommend visiting their official website or contacting them directly for the most up-to-date information.";

const OUT_OF_SCOPE_REPLY: &str = "I'm sorry, but I can assist you with information on halal restaurants, mosques, prayer times, inflight prayer times, travel packages, and travel-related queries. How may I help you today?";

const INFLIGHT_FORMAT_HELP: &str = "Please provide your departure airport code, departure date and time, arrival airport code, and arrival date and time in the format:\n\n- Departure Airport Code (IATA):\n- Departure Date and Time (YYYY-MM-DD HH:MM):\n- Arrival Airport Code (IATA):\n- Arrival Date and Time (YYYY-MM-DD HH:MM)\n\nFor example: \"Flight from SIN to DEL departing 2024-02-28 at 10:00 arriving at 14:00\".";

const PERSONA_PROMPT: &str = "You are Farah, a helpful, friendly, and informative assistant for Muslim travelers on a Muslim-friendly website (Halaltrip.com), focusing on providing tailored travel information while incorporating Islamic greetings and phrases to foster a welcoming atmosphere. When answering their questions, make it concise and format it nicely so that it's appealing to the user.";

const DOCUMENT_PROMPT: &str = "You are Farah, a helpful assistant for Muslim travelers on a Muslim-friendly website (Halaltrip.com). Use the provided document as a reference for your response. Cite information directly from the document, and mention that it comes from the provided content. Do not include any information that is not in the document. Answer in a concise manner, well formatted, and make it look appealing. Feel free to use emojis.";

// ============================================================================
// Request
// ============================================================================

/// One inbound chat message
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub thread_id: String,
    pub message: String,
    /// Caller's position, for "near me" queries
    pub location: Option<Coordinates>,
}

impl ChatRequest {
    pub fn new(thread_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = Some(Coordinates::new(latitude, longitude));
        self
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

pub struct Dispatcher {
    oracle: Arc<dyn Oracle>,
    classifier: Arc<dyn Classifier>,
    geocoder: Arc<dyn Geocoder>,
    sessions: SessionStore,
    mosques: MosqueProvider,
    restaurants: RestaurantProvider,
    packages: PackageProvider,
    prayer_times: PrayerTimesProvider,
    inflight: InflightProvider,
    documents: DocumentIndex,
    settings: DialogueConfig,
}

impl Dispatcher {
    pub fn new(
        config: &FarahConfig,
        oracle: Arc<dyn Oracle>,
        classifier: Arc<dyn Classifier>,
        geocoder: Arc<dyn Geocoder>,
        api: Arc<dyn HalalTripApi>,
    ) -> Self {
        let ttl = config.cache.ttl();
        Self {
            sessions: SessionStore::new(config.session.idle_timeout()),
            mosques: MosqueProvider::new(api.clone(), ttl),
            restaurants: RestaurantProvider::new(api.clone(), ttl),
            packages: PackageProvider::new(api.clone(), ttl),
            prayer_times: PrayerTimesProvider::new(api.clone(), geocoder.clone()),
            inflight: InflightProvider::new(api),
            documents: DocumentIndex::new(
                config.documents.dir.clone(),
                config.documents.similarity_threshold,
                oracle.clone(),
            ),
            settings: config.dialogue.clone(),
            oracle,
            classifier,
            geocoder,
        }
    }

    /// Wire up the production OpenAI, Google Maps and HalalTrip clients
    pub fn from_config(config: &FarahConfig, credentials: &Credentials) -> Result<Self> {
        let oracle: Arc<dyn Oracle> = Arc::new(
            OpenAiClient::new(&config.openai, &credentials.openai_api_key)
                .context("Failed to create OpenAI client")?,
        );
        let classifier = Arc::new(LlmClassifier::from_prompt_file(
            oracle.clone(),
            &config.openai.classifier_prompt,
        ));
        let geocoder = Arc::new(
            GoogleMapsClient::new(&config.google, &credentials.google_api_key)
                .context("Failed to create Google Maps client")?,
        );
        let api = Arc::new(
            HalalTripClient::new(
                &config.halaltrip,
                &credentials.halaltrip_api_key,
                &credentials.halaltrip_token,
            )
            .context("Failed to create HalalTrip client")?,
        );

        Ok(Self::new(config, oracle, classifier, geocoder, api))
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Run one chat turn and return the reply
    pub async fn handle(&self, request: &ChatRequest) -> String {
        let message = request.message.trim();
        info!(thread_id = %request.thread_id, text = message, "Received message");

        if let Some(reply) = self.moderation_gate(message).await {
            return reply;
        }
        self.run_turn(request, message).await
    }

    /// Answer from a reference document when one is relevant, else run a normal turn
    pub async fn handle_with_documents(&self, request: &ChatRequest) -> String {
        let message = request.message.trim();
        info!(thread_id = %request.thread_id, text = message, "Received document question");

        if let Some(reply) = self.moderation_gate(message).await {
            return reply;
        }

        match self.documents.search(message).await {
            Ok(Some(document)) => {
                return match self.answer_from_document(&document, message).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        error!(error = ?e, "Document answer failed");
                        GENERIC_ERROR.to_string()
                    }
                };
            }
            Ok(None) => info!("No relevant document, falling back to chat"),
            Err(e) => warn!(error = %e, "Document search failed, falling back to chat"),
        }

        self.run_turn(request, message).await
    }

    async fn moderation_gate(&self, message: &str) -> Option<String> {
        match self.oracle.moderate(message).await {
            Ok(false) => None,
            Ok(true) => {
                info!("User input was flagged by moderation");
                Some(REFUSAL.to_string())
            }
            Err(e) => {
                error!(error = %e, "Moderation check failed");
                Some(GENERIC_ERROR.to_string())
            }
        }
    }

    async fn run_turn(&self, request: &ChatRequest, message: &str) -> String {
        let mut session = self.sessions.lock(&request.thread_id).await;
        session.touch();

        let classified = match self
            .classifier
            .classify(message, session.last_intent.as_ref())
            .await
        {
            Ok(intent) => intent,
            Err(e) => {
                warn!(error = %e, "Intent classification failed, using general handler");
                Intent::GeneralQuestion
            }
        };
        let intent = resolve_intent(
            &session.state,
            session.last_intent.as_ref(),
            classified,
            message,
        );
        info!(intent = %intent, "Classified intent");

        let outcome = self
            .dispatch(&intent, request, message, &session.state, &session.history)
            .await;

        let reply = match outcome {
            Ok(outcome) => {
                session.state = outcome.next_state;
                session.last_intent = if outcome.clear_last_intent {
                    None
                } else {
                    Some(intent.clone())
                };
                session.record_exchange(message, &outcome.reply, self.settings.history_limit);
                outcome.reply
            }
            Err(e) => {
                error!(intent = %intent, error = ?e, "Error handling intent");
                GENERIC_ERROR.to_string()
            }
        };

        info!(reply_len = reply.len(), "Bot reply ready");
        reply
    }

    async fn dispatch(
        &self,
        intent: &Intent,
        request: &ChatRequest,
        message: &str,
        state: &DialogueState,
        history: &VecDeque<ChatMessage>,
    ) -> Result<Outcome> {
        let outcome = match intent {
            Intent::Greeting => Outcome::reply(WELCOME_MESSAGE),
            Intent::MosqueQuery => self.mosque_query(message).await,
            Intent::MosqueNearMe => self.mosque_near_me(request.location).await,
            Intent::RestaurantQuery | Intent::RestaurantCuisineQuery => {
                self.restaurant_query(message, None).await
            }
            Intent::RestaurantSpecialRequest => {
                let occasion = extract_special_request(message)
                    .map(|o| format!("your {}", o))
                    .unwrap_or_else(|| "your special occasion".to_string());
                self.restaurant_query(message, Some(occasion)).await
            }
            Intent::RestaurantNearMe => self.restaurant_near_me(request.location, message).await,
            Intent::RestaurantDetailQuery => self.restaurant_detail(message).await,
            Intent::RestaurantNameProvided => self.restaurant_name_provided(message, state).await,
            Intent::RestaurantServiceQuery => Outcome::reply(SERVICE_REPLY),
            Intent::RestaurantOperatingHoursQuery => Outcome::reply(HOURS_REPLY),
            Intent::PrayerTimeQuery => self.prayer_time_query(message).await,
            Intent::InflightPrayerTimes => self.inflight_prayer_times(message).await,
            Intent::QiblaDirection => Outcome::reply(QIBLA_REPLY),
            Intent::PackageQuery => self.package_query(message).await,
            Intent::PackageDetailQuery => self.package_detail(message, state).await,
            Intent::OutOfScope => Outcome::reply(OUT_OF_SCOPE_REPLY),
            Intent::GeneralQuestion | Intent::Other(_) => {
                self.general_question(message, history).await?
            }
        };
        Ok(outcome)
    }

    // ------------------------------------------------------------------------
    // Mosques
    // ------------------------------------------------------------------------

    async fn mosque_query(&self, message: &str) -> Outcome {
        let locations = extract_location(message);
        info!(?locations, "Extracted locations");
        if locations.is_empty() {
            return Outcome::reply(
                "Please specify the area or location for which you want the list of mosques.",
            );
        }

        let area = locations.join(" ");
        let limit = extract_result_count(message).unwrap_or(self.settings.mosque_results);
        match self.mosques.by_area(&area).await {
            Ok(found) => Outcome::reply(mosques::format_by_area(&area, &found, limit)),
            Err(e) => {
                error!(error = %e, "Error fetching mosques");
                Outcome::reply("Sorry, I couldn't fetch the list of mosques at the moment.")
            }
        }
    }

    async fn mosque_near_me(&self, location: Option<Coordinates>) -> Outcome {
        let Some(point) = location else {
            return Outcome::reply(
                "Please enable location services or provide your latitude and longitude to find mosques near you.",
            );
        };

        let radius = self.settings.nearby_radius_km;
        match self.mosques.nearby(point, radius).await {
            Ok(found) => Outcome::reply(mosques::format_nearby(
                radius,
                &found,
                self.settings.mosque_results,
            )),
            Err(e) => {
                error!(error = %e, "Error fetching mosques");
                Outcome::reply("Sorry, I couldn't fetch the list of mosques at the moment.")
            }
        }
    }

    // ------------------------------------------------------------------------
    // Restaurants
    // ------------------------------------------------------------------------

    /// Geocode the joined area first, then each span on its own
    async fn resolve_place(&self, locations: &[String]) -> Option<CityCountry> {
        let mut candidates = vec![locations.join(" ")];
        if locations.len() > 1 {
            candidates.extend(locations.iter().cloned());
        }
        detect_city_country(self.geocoder.as_ref(), &candidates).await
    }

    async fn restaurant_query(&self, message: &str, occasion: Option<String>) -> Outcome {
        let locations = extract_location(message);
        info!(?locations, "Extracted locations");
        if locations.is_empty() {
            return Outcome::reply(match occasion {
                Some(_) => "Please specify the area or location where you're looking to celebrate.",
                None => "Please specify the area or location for which you want the list of halal restaurants.",
            });
        }

        let area = locations.join(" ");
        let cuisine = extract_cuisine(message);
        let place = self.resolve_place(&locations).await;
        if place.is_none() {
            warn!(area = %area, "Could not resolve city/country, searching by area only");
        }

        let found = self
            .restaurants
            .by_area(
                &area,
                place.as_ref().map(|p| p.city.as_str()),
                place.as_ref().map(|p| p.country.as_str()),
                cuisine,
            )
            .await;

        match found {
            Ok(found) => {
                let listing =
                    restaurants::format_by_area(&area, cuisine, &found, self.settings.max_listed);
                Outcome::reply(match occasion {
                    Some(occasion) if !found.is_empty() => {
                        format!("Here are some recommendations for {}:\n\n{}", occasion, listing)
                    }
                    _ => listing,
                })
            }
            Err(e) => {
                error!(error = %e, "Error fetching restaurants");
                Outcome::reply("Sorry, I couldn't fetch the list of restaurants at the moment.")
            }
        }
    }

    async fn restaurant_near_me(&self, location: Option<Coordinates>, message: &str) -> Outcome {
        let Some(point) = location else {
            return Outcome::reply(
                "Please enable location services or provide your latitude and longitude to find halal restaurants near you.",
            );
        };

        let radius = self.settings.nearby_radius_km;
        let cuisine = extract_cuisine(message);
        match self.restaurants.nearby(point, radius, cuisine).await {
            Ok(found) => Outcome::reply(restaurants::format_nearby(
                radius,
                cuisine,
                &found,
                self.settings.max_listed,
            )),
            Err(e) => {
                error!(error = %e, "Error fetching restaurants");
                Outcome::reply("Sorry, I couldn't fetch the list of restaurants at the moment.")
            }
        }
    }

    async fn restaurant_detail(&self, message: &str) -> Outcome {
        let name = extract_restaurant_name(message);
        info!(name = %name, "Looking up restaurant");

        let lookup = self
            .restaurants
            .lookup_by_name(
                &name,
                self.settings.restaurant_match_threshold,
                self.settings.max_listed,
            )
            .await;

        match lookup {
            Ok(NameLookup::Exact(restaurant)) => {
                Outcome::reply(restaurants::format_detail(&restaurant))
            }
            Ok(NameLookup::Ambiguous(names)) => Outcome::awaiting(
                restaurants::format_candidates(&names),
                DialogueState::AwaitingRestaurantSelection { names },
            ),
            Ok(NameLookup::NotFound) => Outcome::reply(format!(
                "Sorry, I couldn't find a restaurant named '{}'. Could you check the name and try again?",
                name
            )),
            Err(e) => {
                error!(error = %e, "Error fetching restaurants");
                Outcome::reply("Sorry, I couldn't fetch the restaurant details at the moment.")
            }
        }
    }

    async fn restaurant_name_provided(&self, message: &str, state: &DialogueState) -> Outcome {
        let Some(names) = state.pending_restaurant_names() else {
            return self.restaurant_detail(message).await;
        };

        let Some(name) = select_name(names, message) else {
            let mut reply =
                String::from("Please choose one of these restaurants by replying with its exact name:\n\n");
            for (i, name) in names.iter().enumerate() {
                reply.push_str(&format!("{}. {}\n", i + 1, name));
            }
            return Outcome::awaiting(reply, state.clone());
        };

        match self.restaurants.find_exact(name).await {
            Ok(Some(restaurant)) => {
                Outcome::reply(restaurants::format_detail(&restaurant)).clearing_last_intent()
            }
            Ok(None) => Outcome::reply(format!(
                "Sorry, I couldn't find the details for '{}' anymore.",
                name
            )),
            Err(e) => {
                error!(error = %e, "Error fetching restaurants");
                Outcome::awaiting(
                    "Sorry, I couldn't fetch the restaurant details at the moment.",
                    state.clone(),
                )
            }
        }
    }

    // ------------------------------------------------------------------------
    // Prayer times
    // ------------------------------------------------------------------------

    async fn prayer_time_query(&self, message: &str) -> Outcome {
        let mut text = message.to_string();

        let prayer = match match_prayer(&text, self.settings.prayer_match_threshold) {
            Some((prayer, token)) => {
                text = strip_word(&text, &token);
                Some(prayer)
            }
            None => None,
        };
        let date = match extract_date(&text, Local::now().date_naive()) {
            Some((date, span)) => {
                text = strip_span(&text, &span);
                Some(date)
            }
            None => None,
        };

        let locations = extract_location(&text);
        info!(?locations, ?prayer, ?date, "Extracted prayer time query");
        if locations.is_empty() {
            return Outcome::reply(
                "Please specify the area or location for which you want the prayer times.",
            );
        }

        let area = locations.join(" ");
        let Some(place) = self.resolve_place(&locations).await else {
            return Outcome::reply(format!(
                "Couldn't determine the city and country from '{}'. Please provide more specific information.",
                area
            ));
        };

        match self.prayer_times.times_for(&place, date).await {
            Ok(times) => Outcome::reply(match prayer {
                Some(prayer) => prayer_times::format_single(prayer, &place, &times),
                None => prayer_times::format_all(&place, &times),
            }),
            Err(e) => {
                error!(error = %e, "Error fetching prayer times");
                Outcome::reply("Sorry, I couldn't fetch the prayer times at the moment.")
            }
        }
    }

    async fn inflight_prayer_times(&self, message: &str) -> Outcome {
        let Some(flight) = extract_flight_details(message) else {
            return Outcome::reply(INFLIGHT_FORMAT_HELP);
        };

        match self.inflight.times(&flight).await {
            Ok(times) => Outcome::reply(inflight::format_times(&flight, &times)),
            Err(FarahError::NotFound { .. }) => Outcome::reply(
                "Sorry, I couldn't retrieve the inflight prayer times for your flight.",
            ),
            Err(e) => {
                error!(error = %e, "Error fetching inflight prayer times");
                Outcome::reply("Sorry, I couldn't retrieve the inflight prayer times at the moment.")
            }
        }
    }

    // ------------------------------------------------------------------------
    // Packages
    // ------------------------------------------------------------------------

    async fn package_query(&self, message: &str) -> Outcome {
        const FETCH_FAILED: &str = "Sorry, I couldn't fetch the travel packages at the moment.";

        let keyword = extract_keyword(message);
        let duration = extract_duration(message);
        let occasion = extract_special_request(message);
        info!(keyword = %keyword, ?duration, ?occasion, "Searching packages");

        let searched = match self.packages.search(&keyword).await {
            Ok(found) => found,
            Err(e) => {
                error!(error = %e, "Error fetching packages");
                return Outcome::reply(FETCH_FAILED);
            }
        };

        let matched = !searched.is_empty();
        let mut found = if matched {
            searched
        } else {
            match self.packages.all().await {
                Ok(all) => all.to_vec(),
                Err(e) => {
                    error!(error = %e, "Error fetching packages");
                    return Outcome::reply(FETCH_FAILED);
                }
            }
        };

        let mut qualifiers = Vec::new();
        if let Some(days) = duration {
            let narrowed: Vec<_> = found.iter().filter(|p| p.mentions_duration(days)).cloned().collect();
            if !narrowed.is_empty() {
                found = narrowed;
                qualifiers.push(format!("{}-day", days));
            }
        }
        if let Some(occasion) = occasion {
            let narrowed: Vec<_> = found.iter().filter(|p| p.mentions(occasion)).cloned().collect();
            if !narrowed.is_empty() {
                found = narrowed;
                qualifiers.push(occasion.to_string());
            }
        }

        if found.is_empty() {
            return Outcome::reply("Sorry, there are no travel packages available right now.");
        }
        found.truncate(self.settings.max_listed);

        let kind = qualifiers
            .iter()
            .map(|q| format!("{} ", q))
            .collect::<String>();
        let header = if matched {
            format!("Here are some {}packages for {}:", kind, keyword)
        } else {
            format!(
                "I couldn't find packages matching '{}'. Here are some {}packages we offer:",
                keyword, kind
            )
        };

        let ids = found.iter().map(|p| p.id.clone()).collect();
        Outcome::awaiting(
            packages::format_listing(&header, &found),
            DialogueState::AwaitingPackageSelection { ids },
        )
    }

    async fn package_detail(&self, message: &str, state: &DialogueState) -> Outcome {
        const FETCH_FAILED: &str = "Sorry, I couldn't fetch the package details at the moment.";

        if let Some(id) = extract_package_id(message) {
            return match self.packages.by_id(&id).await {
                Ok(package) => Outcome::reply(packages::format_detail(&package)),
                Err(FarahError::NotFound { .. }) => Outcome::awaiting(
                    format!("I couldn't find a package with ID {}.", id),
                    state.clone(),
                ),
                Err(e) => {
                    error!(error = %e, id = %id, "Error fetching package");
                    Outcome::awaiting(FETCH_FAILED, state.clone())
                }
            };
        }

        let Some(ids) = state.pending_package_ids() else {
            return Outcome::reply(
                "Please search for packages first, for example \"Show me packages to Turkey\", then pick one by name or ID.",
            );
        };

        let candidates = match self.packages.by_ids(ids).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(error = %e, "Error fetching packages");
                return Outcome::awaiting(FETCH_FAILED, state.clone());
            }
        };

        let name = extract_package_name(message);
        let picked = best_match(
            &name,
            candidates.iter().map(|p| p.name.as_str()),
            self.settings.package_match_threshold,
        );

        let Some(index) = picked else {
            let mut reply = String::from(
                "I couldn't tell which package you meant. Please reply with one of these names or IDs:\n\n",
            );
            for (i, p) in candidates.iter().enumerate() {
                reply.push_str(&format!("{}. **{}** (ID: {})\n", i + 1, p.name, p.id));
            }
            return Outcome::awaiting(reply, state.clone());
        };

        let chosen = &candidates[index];
        let package = match self.packages.by_id(&chosen.id).await {
            Ok(package) => package,
            Err(e) => {
                warn!(error = %e, id = %chosen.id, "Package detail lookup failed, using listing data");
                chosen.clone()
            }
        };
        Outcome::reply(packages::format_detail(&package))
    }

    // ------------------------------------------------------------------------
    // Oracle-backed answers
    // ------------------------------------------------------------------------

    async fn general_question(
        &self,
        message: &str,
        history: &VecDeque<ChatMessage>,
    ) -> Result<Outcome> {
        let mut messages = vec![ChatMessage::system(PERSONA_PROMPT)];
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(message));

        let reply = self
            .oracle
            .complete(CompletionRequest::new(messages))
            .await
            .context("General question completion failed")?;
        Ok(Outcome::reply(reply))
    }

    async fn answer_from_document(&self, document: &DocumentMatch, message: &str) -> Result<String> {
        info!(path = %document.path.display(), score = document.score, "Answering from document");
        let messages = vec![
            ChatMessage::system(DOCUMENT_PROMPT),
            ChatMessage::user(format!(
                "The following document is provided as reference:\n\n{}",
                document.text
            )),
            ChatMessage::user(format!(
                "Based on this document, please answer the following question:\n\n{}",
                message
            )),
        ];

        self.oracle
            .complete(CompletionRequest::new(messages))
            .await
            .context("Document answer completion failed")
    }
}

// ============================================================================
// Tests
// ============================================================================
