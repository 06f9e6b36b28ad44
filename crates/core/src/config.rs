//! Runtime configuration
//!
//! Tunables come from an optional TOML file; every field has a default so a
//! missing file yields a working configuration. Secrets are read from the
//! environment only.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, looked up in the working directory first
pub const CONFIG_FILE: &str = "farah.toml";

// ============================================================================
// File Configuration
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FarahConfig {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub halaltrip: HalalTripConfig,
    pub google: GoogleConfig,
    pub cache: CacheConfig,
    pub dialogue: DialogueConfig,
    pub session: SessionConfig,
    pub documents: DocumentsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            static_dir: PathBuf::from("static"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Few-shot prompt for the intent classifier; a built-in prompt is used if absent
    pub classifier_prompt: PathBuf,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            classifier_prompt: PathBuf::from("prompts/intent_classifier.md"),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HalalTripConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for HalalTripConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api.halaltrip.com/v1/api".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 86_400 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Thresholds and limits used by the dispatcher
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    pub package_match_threshold: f64,
    pub prayer_match_threshold: f64,
    pub restaurant_match_threshold: f64,
    pub nearby_radius_km: f64,
    /// Maximum packages/restaurants listed in one reply
    pub max_listed: usize,
    /// Mosques returned when the message does not ask for a count
    pub mosque_results: usize,
    /// User/assistant pairs kept per session for the general-question oracle
    pub history_limit: usize,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            package_match_threshold: 0.7,
            prayer_match_threshold: 0.8,
            restaurant_match_threshold: 0.7,
            nearby_radius_km: 5.0,
            max_listed: 5,
            mosque_results: 10,
            history_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_timeout_hours: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_hours: 24,
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_hours * 3600)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    pub dir: PathBuf,
    pub similarity_threshold: f32,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("static/files"),
            similarity_threshold: 0.84,
        }
    }
}

impl FarahConfig {
    /// Load configuration
    ///
    /// An explicit path must exist and parse. Without one, `farah.toml` in the
    /// working directory is tried, then `<config_dir>/farah/farah.toml`; if
    /// neither exists the defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML")
    }
}

/// First existing config file among the default locations
fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("farah").join(CONFIG_FILE))
        .filter(|path| path.exists())
}

// ============================================================================
// Secrets
// ============================================================================

/// API credentials, from environment variables only
#[derive(Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub halaltrip_api_key: String,
    pub halaltrip_token: String,
    pub google_api_key: String,
}

impl Credentials {
    /// Create credentials from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .context("Missing OPENAI_API_KEY environment variable")?,
            halaltrip_api_key: std::env::var("HALALTRIP_API_KEY")
                .context("Missing HALALTRIP_API_KEY environment variable")?,
            halaltrip_token: std::env::var("HALALTRIP_TOKEN")
                .context("Missing HALALTRIP_TOKEN environment variable")?,
            google_api_key: std::env::var("GOOGLE_API_KEY")
                .context("Missing GOOGLE_API_KEY environment variable")?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = FarahConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.cache.ttl(), Duration::from_secs(86_400));
        assert_eq!(config.dialogue.package_match_threshold, 0.7);
        assert_eq!(config.dialogue.prayer_match_threshold, 0.8);
        assert_eq!(config.documents.similarity_threshold, 0.84);
        assert_eq!(config.session.idle_timeout(), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FarahConfig::from_toml(
            r#"
            [server]
            port = 9090

            [dialogue]
            max_listed = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.dialogue.max_listed, 3);
        assert_eq!(config.dialogue.nearby_radius_km, 5.0);
        assert_eq!(config.openai.chat_model, "gpt-4");
    }

    #[test]
    fn test_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nttl_secs = 60").unwrap();
        let config = FarahConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.cache.ttl_secs, 60);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = FarahConfig::load(Some(Path::new("/nonexistent/farah.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(FarahConfig::from_toml("[server\nport = ").is_err());
    }
}
