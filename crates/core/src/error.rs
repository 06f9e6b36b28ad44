//! Error types for collaborator calls
//!
//! Every call that leaves the process (LLM oracle, geocoding, travel-data API)
//! reports failures through [`FarahError`]. Handler and bootstrap code wraps
//! these in `anyhow` with context.

use thiserror::Error;

/// Typed failure of an external collaborator
#[derive(Error, Debug)]
pub enum FarahError {
    /// The request could not be sent or its body could not be read
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    /// The collaborator answered with a non-success HTTP status
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The response did not have the expected shape
    #[error("{service} response could not be decoded: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    /// The collaborator answered but had nothing for the query
    #[error("{service} has no result for '{query}'")]
    NotFound {
        service: &'static str,
        query: String,
    },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FarahError {
    pub fn transport(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            service,
            message: err.to_string(),
        }
    }

    pub fn decode(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            service,
            message: err.to_string(),
        }
    }

    pub fn not_found(service: &'static str, query: impl Into<String>) -> Self {
        Self::NotFound {
            service,
            query: query.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FarahError>;

/// Send a prepared request and return the body of a 2xx response as JSON
pub(crate) async fn send_json(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value> {
    let response = request
        .send()
        .await
        .map_err(|e| FarahError::transport(service, e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| FarahError::transport(service, e))?;

    if !status.is_success() {
        return Err(FarahError::Status {
            service,
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| FarahError::decode(service, e))
}
