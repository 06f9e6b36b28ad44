//! Intent classification
//!
//! The [`Classifier`] trait is the seam between the dispatcher and whatever
//! labels messages. [`LlmClassifier`] asks the language-model oracle with a
//! few-shot prompt; tests script it instead.

use async_trait::async_trait;
use chrono::Local;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{FarahError, Result};
use crate::llm::{ChatMessage, CompletionRequest, Oracle};
use crate::types::Intent;

/// Fallback prompt if the prompt file cannot be loaded
const FALLBACK_PROMPT: &str = r#"You are an AI assistant that classifies user messages for Farah, a Muslim-friendly travel assistant, into specific intents. Today is {{TODAY}}. Here are some examples:

User Message: "Hi"
Intent: greeting

User Message: "Hello there"
Intent: greeting

User Message: "List 5 mosques in Bedok Singapore"
Intent: mosque_query

User Message: "Mosques near me"
Intent: mosque_near_me

User Message: "Find mosques nearby"
Intent: mosque_near_me

User Message: "Show me halal restaurants in Kuala Lumpur"
Intent: restaurant_query

User Message: "Where is the nearest halal restaurant?"
Intent: restaurant_near_me

User Message: "Are there any halal Thai restaurants in Bangkok?"
Intent: restaurant_cuisine_query

User Message: "Does Muslim Restaurant offer delivery services?"
Intent: restaurant_service_query

User Message: "What are the opening hours of Muslim Restaurant in Bangkok?"
Intent: restaurant_operating_hours_query

User Message: "I'm looking for a halal restaurant in Bangkok to celebrate a special occasion."
Intent: restaurant_special_request

User Message: "Tell me more about Al Amin Restaurant"
Intent: restaurant_detail_query

User Message: "What are the prayer times in Dubai"
Intent: prayer_time_query

User Message: "When is Maghrib in Paris tomorrow?"
Intent: prayer_time_query

User Message: "Can you provide inflight prayer times from SIN to DEL on 28-02-2019?"
Intent: inflight_prayer_times

User Message: "I need inflight prayer times for my flight from JFK to LHR."
Intent: inflight_prayer_times

User Message: "What is the Qibla direction?"
Intent: qibla_direction

User Message: "Show me travel packages to Turkey"
Intent: package_query

User Message: "Do you have a 5 day honeymoon package?"
Intent: package_query

User Message: "Show package id 42"
Intent: package_detail_query

User Message: "Tell me more about the Istanbul Heritage Tour package"
Intent: package_detail_query

User Message: "What's the square root of a banana?"
Intent: out_of_scope

User Message: "Tell me a joke about flying elephants"
Intent: out_of_scope

User Message: "What should I pack for Umrah?"
Intent: general_question
"#;

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Label a message, given the intent resolved on the previous turn
    async fn classify(&self, message: &str, previous_intent: Option<&Intent>) -> Result<Intent>;
}

/// Load the few-shot prompt from file, with {{TODAY}} substitution
pub fn load_classifier_prompt(path: &Path) -> String {
    let prompt = match fs::read_to_string(path) {
        Ok(content) => {
            debug!(path = %path.display(), "Loaded classifier prompt");
            content
        }
        Err(e) => {
            if path.exists() {
                warn!(path = %path.display(), error = %e, "Failed to read classifier prompt, using fallback");
            } else {
                debug!(path = %path.display(), "Classifier prompt not found, using fallback");
            }
            FALLBACK_PROMPT.to_string()
        }
    };

    let today = Local::now().format("%Y-%m-%d").to_string();
    prompt.replace("{{TODAY}}", &today)
}

/// Few-shot classifier backed by the language-model oracle
pub struct LlmClassifier {
    oracle: Arc<dyn Oracle>,
    prompt: String,
}

impl LlmClassifier {
    pub fn new(oracle: Arc<dyn Oracle>, prompt: String) -> Self {
        Self { oracle, prompt }
    }

    pub fn from_prompt_file(oracle: Arc<dyn Oracle>, path: &Path) -> Self {
        Self::new(oracle, load_classifier_prompt(path))
    }

    fn build_prompt(&self, message: &str, previous_intent: Option<&Intent>) -> String {
        let mut prompt = self.prompt.trim_end().to_string();
        prompt.push_str("\n\n");
        if let Some(previous) = previous_intent {
            prompt.push_str(&format!("Previous Intent: {}\n", previous));
        }
        prompt.push_str(&format!("User Message: \"{}\"\nIntent:", message));
        prompt
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, message: &str, previous_intent: Option<&Intent>) -> Result<Intent> {
        let request = CompletionRequest {
            messages: vec![ChatMessage::user(self.build_prompt(message, previous_intent))],
            temperature: Some(0.0),
            max_tokens: Some(10),
            stop: Some(vec!["\n".to_string()]),
        };

        let raw = self.oracle.complete(request).await?;
        let intent = Intent::from_label(&raw)
            .ok_or_else(|| FarahError::decode("classifier", "empty intent label"))?;

        Ok(remap_continuation(intent, previous_intent))
    }
}

/// A repeated `restaurant_detail_query` right after one means the user is
/// picking a restaurant off the list just shown.
pub fn remap_continuation(intent: Intent, previous_intent: Option<&Intent>) -> Intent {
    match (previous_intent, intent) {
        (Some(Intent::RestaurantDetailQuery), Intent::RestaurantDetailQuery) => {
            Intent::RestaurantNameProvided
        }
        (_, intent) => intent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeOracle;

    fn classifier(oracle: &Arc<FakeOracle>) -> LlmClassifier {
        LlmClassifier::new(oracle.clone(), FALLBACK_PROMPT.to_string())
    }

    #[tokio::test]
    async fn test_classify_parses_label() {
        let oracle = Arc::new(FakeOracle::new().with_completions(["Mosque_Query"]));
        let intent = classifier(&oracle).classify("List mosques in Bedok", None).await.unwrap();
        assert_eq!(intent, Intent::MosqueQuery);

        let request = oracle.last_request().unwrap();
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(10));
        let prompt = &request.messages[0].content;
        assert!(prompt.ends_with("User Message: \"List mosques in Bedok\"\nIntent:"));
        assert!(!prompt.contains("{{TODAY}}"));
    }

    #[tokio::test]
    async fn test_previous_intent_in_prompt_and_remap() {
        let oracle = Arc::new(FakeOracle::new().with_completions(["restaurant_detail_query"]));
        let intent = classifier(&oracle)
            .classify("Al Amin", Some(&Intent::RestaurantDetailQuery))
            .await
            .unwrap();
        assert_eq!(intent, Intent::RestaurantNameProvided);
        let prompt = &oracle.last_request().unwrap().messages[0].content;
        assert!(prompt.contains("Previous Intent: restaurant_detail_query"));
    }

    #[tokio::test]
    async fn test_package_detail_passes_through() {
        let oracle = Arc::new(FakeOracle::new().with_completions(["package_detail_query"]));
        let intent = classifier(&oracle)
            .classify("the Bali one", Some(&Intent::PackageQuery))
            .await
            .unwrap();
        assert_eq!(intent, Intent::PackageDetailQuery);
    }

    #[tokio::test]
    async fn test_blank_label_is_error() {
        let oracle = Arc::new(FakeOracle::new().with_completions(["   "]));
        let result = classifier(&oracle).classify("hmm", None).await;
        assert!(matches!(result, Err(FarahError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_oracle_failure_propagates() {
        let oracle = Arc::new(FakeOracle::new());
        let result = classifier(&oracle).classify("hello", None).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_prompt_file_fallback() {
        let prompt = load_classifier_prompt(Path::new("/nonexistent/prompt.md"));
        assert!(prompt.contains("Intent: greeting"));
        assert!(!prompt.contains("{{TODAY}}"));
    }

    #[test]
    fn test_prompt_file_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        fs::write(&path, "Classify. Today: {{TODAY}}").unwrap();
        let prompt = load_classifier_prompt(&path);
        assert!(prompt.starts_with("Classify. Today: 20"));
    }
}
