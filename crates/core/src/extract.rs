//! Entity extraction from free text
//!
//! Pattern-based parameter extraction for the dispatcher: locations, dates,
//! cuisine, prayer names, flight legs and package identifiers. Everything here
//! is pure; geocoding of extracted locations lives in [`crate::geo`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::matching::similarity;
use crate::types::{resolve_relative_date, FlightDetails, Prayer};

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("Invalid regex"))
        }
    };
}

/// Cuisine keywords recognized in restaurant queries
pub const CUISINES: [&str; 6] = ["thai", "indian", "malay", "vegetarian", "chinese", "italian"];

/// Special-occasion keywords recognized in package and restaurant queries
pub const SPECIAL_REQUESTS: [&str; 8] = [
    "honeymoon",
    "family",
    "adventure",
    "luxury",
    "budget",
    "romantic",
    "solo",
    "group",
];

/// Words that never form part of a location span
const STOP_WORDS: &[&str] = &[
    // function words
    "a", "an", "the", "in", "at", "on", "of", "for", "to", "from", "near", "around", "nearby",
    "by", "into", "within", "with", "about", "and", "or", "but", "not", "no", "yes", "if", "so",
    "than", "then", "up", "out", "also", "just", "very", "too", "any", "some", "all", "each",
    "every", "other", "another", "such", "only", "own", "same", "there", "here", "this", "that",
    "these", "those", "it", "its", "i", "me", "my", "mine", "you", "your", "we", "us", "our",
    "they", "them", "their", "he", "she", "his", "her", "is", "are", "was", "were", "be", "been",
    "am", "do", "does", "did", "can", "could", "would", "will", "shall", "should", "may",
    "might", "must", "have", "has", "had", "what", "whats", "what's", "where", "wheres",
    "where's", "when", "which", "who", "whom", "how", "why", "i'm", "im", "i'd", "i'll",
    "i've", "it's", "there's", "let", "lets", "let's", "please", "pls", "kindly", "hi",
    "hello", "hey", "salam", "assalamualaikum", "thanks", "thank", "ok", "okay", "much",
    "many", "few", "more", "most", "less", "best", "good", "great", "nice", "top", "nearest",
    "closest", "cheap", "cheapest", "popular", "recommended", "famous", "local", "right",
    "now", "currently", "again",
    // verbs
    "show", "list", "find", "give", "tell", "get", "display", "search", "know", "want", "need",
    "looking", "look", "like", "recommend", "suggest", "help", "assist", "go", "going", "visit",
    "visiting", "travel", "travelling", "traveling", "stay", "staying", "celebrate",
    "celebrating", "book", "check", "see", "offer", "offers", "provide", "located", "locate",
    "eat", "eating", "dine", "dining", "pray", "praying", "serve", "serves", "serving",
    "served", "sell", "sells", "selling", "cook", "cooks", "cooking", "deliver", "delivers",
    "delivering", "recommends", "plan", "planning", "try", "trying", "take", "taking",
    // numbers and time words
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "today",
    "tomorrow", "tonight", "yesterday", "time", "times", "day", "days", "night", "nights",
    "date", "week", "weekend", "next", "month", "year", "km", "kilometers", "kilometres",
    "hour", "hours", "morning", "evening", "monday", "tuesday", "wednesday", "thursday",
    "friday", "saturday", "sunday", "january", "february", "march", "april", "june", "july",
    "august", "september", "october", "november", "december",
    // domain words
    "mosque", "mosques", "masjid", "masjids", "restaurant", "restaurants", "food", "foods",
    "eatery", "eateries", "cafe", "cafes", "halal", "muslim", "muslims", "muslim-friendly",
    "prayer", "prayers", "salah", "salat", "namaz", "qibla", "direction", "package",
    "packages", "tour", "tours", "trip", "trips", "holiday", "holidays", "vacation", "deal",
    "deals", "cuisine", "special", "occasion", "birthday", "anniversary", "delivery",
    "service", "services", "opening", "open", "closing", "flight", "flights", "inflight",
    "airport", "departing", "arriving", "place", "places", "area", "city", "country",
    "location", "details", "detail", "info", "information", "id",
    // prayers
    "fajr", "dhuhr", "zuhr", "asr", "maghrib", "isha", "sunrise", "jummah",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| {
        STOP_WORDS
            .iter()
            .chain(CUISINES.iter())
            .chain(SPECIAL_REQUESTS.iter())
            .copied()
            .collect()
    })
}

// ============================================================================
// Text helpers
// ============================================================================

/// Capitalize the first letter after whitespace or a hyphen, lower-case the rest
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_whitespace() || ch == '-' {
            at_word_start = true;
            out.push(ch);
        } else if at_word_start {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

/// Collapse runs of whitespace and trim
fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn trim_punctuation(text: &str) -> &str {
    text.trim()
        .trim_end_matches(|c: char| matches!(c, '?' | '!' | '.' | ',' | ';' | ':'))
        .trim()
}

/// Remove the first occurrence of `span` from `text`
pub fn strip_span(text: &str, span: &str) -> String {
    if span.is_empty() {
        return squash(text);
    }
    squash(&text.replacen(span, " ", 1))
}

/// Remove the first whole-word, case-insensitive occurrence of `word`
pub fn strip_word(text: &str, word: &str) -> String {
    let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
    match Regex::new(&pattern) {
        Ok(re) => squash(&re.replacen(text, 1, " ")),
        Err(_) => squash(text),
    }
}

fn lowercase_words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

// ============================================================================
// Locations
// ============================================================================

/// Words that introduce a place ("in Bangkok", "near Bedok")
const PLACE_PREPOSITIONS: [&str; 7] = ["in", "at", "near", "around", "within", "to", "from"];

/// Extract candidate place names, in first-seen order
///
/// Stop-listed words, digit-only tokens and clause punctuation split the text;
/// each remaining run of words becomes one title-cased span. When some span
/// follows a place preposition, only those spans are returned, so a stray
/// capitalized verb does not become a location. A comma-separated list after
/// the preposition ("in Bedok, Singapore") stays anchored.
pub fn extract_location(text: &str) -> Vec<String> {
    struct Span {
        text: String,
        anchored: bool,
    }

    fn flush(current: &mut Vec<String>, anchored: bool, spans: &mut Vec<Span>) {
        if current.is_empty() {
            return;
        }
        let text = title_case(&current.join(" "));
        match spans.iter_mut().find(|s| s.text.eq_ignore_ascii_case(&text)) {
            Some(seen) => seen.anchored |= anchored,
            None => spans.push(Span { text, anchored }),
        }
        current.clear();
    }

    let stop = stop_words();
    let mut spans: Vec<Span> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    // Whether the next span follows a place preposition
    let mut anchor = false;
    let mut current_anchored = false;

    for raw in text.split_whitespace() {
        let ends_clause = raw.ends_with([',', ';', '.', '?', '!', ':']);

        let cleaned = raw.trim_matches(|c: char| !(c.is_alphanumeric() || c == '-' || c == '\''));
        let cleaned = cleaned
            .strip_suffix("'s")
            .or_else(|| cleaned.strip_suffix("’s"))
            .unwrap_or(cleaned);
        let lower = cleaned.to_lowercase();

        let is_candidate = !lower.is_empty()
            && !stop.contains(lower.as_str())
            && lower.chars().any(|c| c.is_alphabetic());

        if is_candidate {
            if current.is_empty() {
                current_anchored = anchor;
            }
            current.push(cleaned.to_string());
        } else {
            flush(&mut current, current_anchored, &mut spans);
            if PLACE_PREPOSITIONS.contains(&lower.as_str()) {
                anchor = true;
            } else if !matches!(lower.as_str(), "and" | "or" | "") {
                anchor = false;
            }
        }

        if ends_clause {
            flush(&mut current, current_anchored, &mut spans);
        }
    }
    flush(&mut current, current_anchored, &mut spans);

    let any_anchored = spans.iter().any(|s| s.anchored);
    spans
        .into_iter()
        .filter(|s| s.anchored || !any_anchored)
        .map(|s| s.text)
        .collect()
}

/// The integer directly preceding a mosque/restaurant noun ("List 5 mosques")
pub fn extract_result_count(text: &str) -> Option<usize> {
    static_regex!(
        count_re,
        r"(?i)\b(\d{1,3})\s+(?:halal\s+)?(?:mosques?|masjids?|restaurants?)\b"
    );
    count_re()
        .captures(text)
        .and_then(|c| c[1].parse::<usize>().ok())
        .filter(|n| *n > 0)
}

// ============================================================================
// Restaurants
// ============================================================================

/// First cuisine keyword present as a word
pub fn extract_cuisine(text: &str) -> Option<&'static str> {
    let words = lowercase_words(text);
    CUISINES
        .iter()
        .find(|c| words.iter().any(|w| w == *c))
        .copied()
}

/// Restaurant name following a "tell me more about"-style phrase
///
/// Without a trigger phrase the whole message is taken as the name.
pub fn extract_restaurant_name(text: &str) -> String {
    static_regex!(
        trigger_re,
        r"(?i)(?:tell me more about|more info on|information about|details on)\s*(.*)"
    );
    static_regex!(trailing_in_re, r"(?i)\s+in\s+.*$");

    let fallback = || title_case(trim_punctuation(text));

    let Some(caps) = trigger_re().captures(text) else {
        return fallback();
    };

    let mut rest = caps[1].trim().to_string();
    loop {
        let lower = rest.to_lowercase();
        let stripped = ["in ", "at ", "on ", "near "]
            .iter()
            .find_map(|p| lower.starts_with(p).then(|| rest[p.len()..].trim_start().to_string()));
        match stripped {
            Some(s) => rest = s,
            None => break,
        }
    }
    let rest = trailing_in_re().replace(&rest, "");
    let name = trim_punctuation(&rest);

    if name.is_empty() {
        fallback()
    } else {
        title_case(name)
    }
}

// ============================================================================
// Prayer times
// ============================================================================

/// Fuzzy-match a prayer name against each word of the text
///
/// Returns the prayer and the word that matched so the caller can strip it.
pub fn match_prayer(text: &str, threshold: f64) -> Option<(Prayer, String)> {
    for word in text.split_whitespace() {
        let token = word.trim_matches(|c: char| !c.is_alphabetic());
        if token.len() < 3 {
            continue;
        }

        let best = Prayer::ALL
            .iter()
            .map(|p| (*p, similarity(token, p.as_str())))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((prayer, score)) = best {
            if score >= threshold {
                return Some((prayer, token.to_string()));
            }
        }
    }
    None
}

/// Find a date expression; returns the date and the matched span
pub fn extract_date(text: &str, today: NaiveDate) -> Option<(NaiveDate, String)> {
    static_regex!(
        iso_re,
        r"(?i)(?:\b(?:on|for)\s+)?\b(\d{4}-\d{1,2}-\d{1,2})\b"
    );
    static_regex!(
        dmy_re,
        r"(?i)(?:\b(?:on|for)\s+)?\b(\d{1,2}[-/]\d{1,2}[-/]\d{4})\b"
    );
    static_regex!(
        relative_re,
        r"(?i)(?:\b(?:on|for)\s+)?\b(today|tomorrow|(?:next\s+)?(?:mon|tues|wednes|thurs|fri|satur|sun)day)\b"
    );

    for re in [iso_re(), dmy_re()] {
        if let Some(caps) = re.captures(text) {
            if let Some(date) = parse_date(&caps[1]) {
                return Some((date, caps[0].to_string()));
            }
        }
    }

    let caps = relative_re().captures(text)?;
    let date = resolve_relative_date(&squash(&caps[1]), today)?;
    Some((date, caps[0].to_string()))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let normalized = s.replace('/', "-");
    ["%Y-%m-%d", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&normalized, fmt).ok())
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

// ============================================================================
// Flights
// ============================================================================

/// Extract a flight leg: two IATA codes and departure/arrival date-times
///
/// The arrival date is reused from the departure when only an arrival time
/// is given. Returns `None` unless every part is present.
pub fn extract_flight_details(text: &str) -> Option<FlightDetails> {
    static_regex!(iata_re, r"\b[A-Z]{3}\b");
    static_regex!(
        departure_re,
        r"(?i)\bdepart(?:ing|s|ure)?\s+(?:on\s+)?(?P<date>\d{4}-\d{1,2}-\d{1,2}|\d{1,2}[-/]\d{1,2}[-/]\d{4})\s+(?:at\s+)?(?P<time>\d{1,2}:\d{2})"
    );
    static_regex!(
        arrival_re,
        r"(?i)\barriv(?:ing|es|al)?\s+(?:on\s+)?(?:(?P<date>\d{4}-\d{1,2}-\d{1,2}|\d{1,2}[-/]\d{1,2}[-/]\d{4})\s+)?(?:at\s+)?(?P<time>\d{1,2}:\d{2})"
    );

    let codes: Vec<&str> = iata_re().find_iter(text).map(|m| m.as_str()).take(2).collect();
    if codes.len() < 2 {
        return None;
    }

    let dep = departure_re().captures(text)?;
    let dep_date = parse_date(&dep["date"])?;
    let dep_time = parse_time(&dep["time"])?;

    let arr = arrival_re().captures(text)?;
    let arr_date = match arr.name("date") {
        Some(d) => parse_date(d.as_str())?,
        None => dep_date,
    };
    let arr_time = parse_time(&arr["time"])?;

    Some(FlightDetails {
        departure_airport: codes[0].to_string(),
        departure_datetime: NaiveDateTime::new(dep_date, dep_time),
        arrival_airport: codes[1].to_string(),
        arrival_datetime: NaiveDateTime::new(arr_date, arr_time),
    })
}

// ============================================================================
// Packages
// ============================================================================

static_regex!(duration_re, r"(?i)\b(\d+)\s*-?\s*(?:days?|nights?)\b");

/// First integer immediately followed by day(s)/night(s)
pub fn extract_duration(text: &str) -> Option<u32> {
    duration_re()
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok())
}

/// First special-occasion keyword present as a word
pub fn extract_special_request(text: &str) -> Option<&'static str> {
    let words = lowercase_words(text);
    SPECIAL_REQUESTS
        .iter()
        .find(|k| words.iter().any(|w| w == *k))
        .copied()
}

/// Search keyword for a package query; never empty unless the input is
pub fn extract_keyword(text: &str) -> String {
    static_regex!(
        packages_re,
        r"(?i)\bpackages?\s+(?:to|for|in|about|on)\s+(.+)"
    );

    let without_duration = squash(&duration_re().replace_all(text, " "));

    if let Some(caps) = packages_re().captures(&without_duration) {
        let keyword = trim_punctuation(&caps[1]);
        if !keyword.is_empty() {
            return keyword.to_string();
        }
    }

    let locations = extract_location(&without_duration);
    if !locations.is_empty() {
        return locations.join(" ");
    }

    text.trim().to_string()
}

/// Digits following "id" or "package id"
pub fn extract_package_id(text: &str) -> Option<String> {
    static_regex!(
        id_re,
        r"(?i)\b(?:package\s+)?id\s*(?:[:#=]|is)?\s*(\d+)\b"
    );
    id_re().captures(text).map(|c| c[1].to_string())
}

/// Package name following a "tell me more about"-style phrase, else the text
pub fn extract_package_name(text: &str) -> String {
    static_regex!(
        name_re,
        r"(?i)(?:tell me more about|show me details of|i want to know about)\s*(.+)"
    );
    if let Some(caps) = name_re().captures(text) {
        let name = trim_punctuation(&caps[1]);
        if !name.is_empty() {
            return name.to_string();
        }
    }
    trim_punctuation(text).to_string()
}

// ============================================================================
// Tests
// ============================================================================
