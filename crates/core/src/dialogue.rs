//! Slot-filling dialogue state
//!
//! A conversation is either idle or waiting for the user to pick one entry
//! off a list the previous turn presented. The two continuation intents
//! (`package_detail_query` after a listing, `restaurant_name_provided` after
//! an ambiguous restaurant lookup) are resolved here against that state.

use crate::types::Intent;

/// What the conversation is waiting for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DialogueState {
    #[default]
    Idle,
    /// Package ids offered in the last listing, in display order
    AwaitingPackageSelection { ids: Vec<String> },
    /// Restaurant names offered after an ambiguous lookup, in display order
    AwaitingRestaurantSelection { names: Vec<String> },
}

impl DialogueState {
    pub fn pending_package_ids(&self) -> Option<&[String]> {
        match self {
            DialogueState::AwaitingPackageSelection { ids } if !ids.is_empty() => Some(ids),
            _ => None,
        }
    }

    pub fn pending_restaurant_names(&self) -> Option<&[String]> {
        match self {
            DialogueState::AwaitingRestaurantSelection { names } if !names.is_empty() => {
                Some(names)
            }
            _ => None,
        }
    }
}

/// Result of one handler run
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub reply: String,
    pub next_state: DialogueState,
    /// Forget the resolved intent instead of remembering it as `last_intent`
    pub clear_last_intent: bool,
}

impl Outcome {
    /// Reply and return to idle
    pub fn reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            next_state: DialogueState::Idle,
            clear_last_intent: false,
        }
    }

    /// Reply and wait in `state` for a follow-up
    pub fn awaiting(reply: impl Into<String>, state: DialogueState) -> Self {
        Self {
            reply: reply.into(),
            next_state: state,
            clear_last_intent: false,
        }
    }

    pub fn clearing_last_intent(mut self) -> Self {
        self.clear_last_intent = true;
        self
    }
}

/// Pick the stored name a message refers to
///
/// An exact (case-insensitive, trimmed) match wins; otherwise the longest
/// stored name contained in the message.
pub fn select_name<'a>(names: &'a [String], message: &str) -> Option<&'a str> {
    let text = message
        .trim()
        .trim_end_matches(|c: char| matches!(c, '?' | '!' | '.'))
        .trim()
        .to_lowercase();
    if text.is_empty() {
        return None;
    }

    if let Some(exact) = names.iter().find(|n| n.trim().to_lowercase() == text) {
        return Some(exact.as_str());
    }

    names
        .iter()
        .filter(|n| {
            let name = n.trim().to_lowercase();
            !name.is_empty() && text.contains(&name)
        })
        .max_by_key(|n| n.trim().len())
        .map(|n| n.as_str())
}

/// Turn a classified intent into the one the dispatcher acts on
pub fn resolve_intent(
    state: &DialogueState,
    last_intent: Option<&Intent>,
    classified: Intent,
    message: &str,
) -> Intent {
    if let Some(names) = state.pending_restaurant_names() {
        if select_name(names, message).is_some() {
            return Intent::RestaurantNameProvided;
        }
        let follows_detail = last_intent == Some(&Intent::RestaurantDetailQuery);
        let repeats_detail = matches!(
            classified,
            Intent::RestaurantDetailQuery | Intent::RestaurantNameProvided
        );
        if follows_detail && repeats_detail {
            return Intent::RestaurantNameProvided;
        }
    }

    match classified {
        // Nothing to pick from, treat it as a fresh lookup
        Intent::RestaurantNameProvided if state.pending_restaurant_names().is_none() => {
            Intent::RestaurantDetailQuery
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn awaiting_restaurants() -> DialogueState {
        DialogueState::AwaitingRestaurantSelection {
            names: vec!["Al Amin Restaurant".to_string(), "Al Amin Cafe".to_string()],
        }
    }

    #[test]
    fn test_select_name_exact_and_contained() {
        let names = vec!["Al Amin Restaurant".to_string(), "Al Amin Cafe".to_string()];
        assert_eq!(select_name(&names, " al amin cafe. "), Some("Al Amin Cafe"));
        assert_eq!(
            select_name(&names, "I'll go with Al Amin Restaurant please"),
            Some("Al Amin Restaurant")
        );
        assert_eq!(select_name(&names, "Zam Zam"), None);
        assert_eq!(select_name(&names, "  "), None);
    }

    #[test]
    fn test_name_in_message_wins_over_classifier() {
        let intent = resolve_intent(
            &awaiting_restaurants(),
            Some(&Intent::RestaurantDetailQuery),
            Intent::RestaurantQuery,
            "Al Amin Cafe",
        );
        assert_eq!(intent, Intent::RestaurantNameProvided);
    }

    #[test]
    fn test_repeated_detail_query_is_continuation() {
        let intent = resolve_intent(
            &awaiting_restaurants(),
            Some(&Intent::RestaurantDetailQuery),
            Intent::RestaurantDetailQuery,
            "the second one",
        );
        assert_eq!(intent, Intent::RestaurantNameProvided);
    }

    #[test]
    fn test_new_topic_leaves_selection() {
        let intent = resolve_intent(
            &awaiting_restaurants(),
            Some(&Intent::RestaurantDetailQuery),
            Intent::PrayerTimeQuery,
            "prayer times in Dubai",
        );
        assert_eq!(intent, Intent::PrayerTimeQuery);
    }

    #[test]
    fn test_name_provided_without_pending_degrades() {
        let intent = resolve_intent(
            &DialogueState::Idle,
            None,
            Intent::RestaurantNameProvided,
            "Al Amin",
        );
        assert_eq!(intent, Intent::RestaurantDetailQuery);
    }

    #[test]
    fn test_package_detail_passes_through() {
        let awaiting = DialogueState::AwaitingPackageSelection {
            ids: vec!["1".to_string()],
        };
        for state in [DialogueState::Idle, awaiting] {
            assert_eq!(
                resolve_intent(&state, None, Intent::PackageDetailQuery, "the Bali one"),
                Intent::PackageDetailQuery
            );
        }
    }

    #[test]
    fn test_pending_accessors_ignore_empty_sets() {
        let empty = DialogueState::AwaitingPackageSelection { ids: vec![] };
        assert!(empty.pending_package_ids().is_none());
        assert!(empty.pending_restaurant_names().is_none());
        assert_eq!(
            awaiting_restaurants().pending_restaurant_names().map(|n| n.len()),
            Some(2)
        );
    }
}
