//! Farah Halal-Travel Assistant Core Library
//!
//! This crate provides the conversational core of the assistant:
//! - Intent classification (LLM few-shot prompt) and continuation resolution
//! - Slot-filling dialogue state per conversation thread
//! - Entity extraction (locations, dates, prayers, flights, packages)
//! - Travel-data providers backed by the HalalTrip API, with TTL caching
//! - Reference-document search for grounded answers

pub mod types;

pub mod config;
pub mod dialogue;
pub mod documents;
pub mod error;
pub mod extract;
pub mod geo;
pub mod intent;
pub mod llm;
pub mod matching;
pub mod providers;
pub mod router;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types at crate root
pub use types::{
    next_weekday, parse_weekday, resolve_relative_date, CityCountry, Coordinates,
    FlightDetails, Intent, Prayer,
};

pub use config::{Credentials, FarahConfig};
pub use error::FarahError;
pub use router::{ChatRequest, Dispatcher, WELCOME_MESSAGE};
