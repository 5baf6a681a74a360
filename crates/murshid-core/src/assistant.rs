//! All UI-facing state of one running assistant, in one place.
//!
//! Front ends mutate it only through these methods, which keep the
//! transcript invariants: at most one pending turn, no blank sends, turns
//! only appended except for the pending placeholder.

use tracing::{debug, info};

use crate::language::{Language, Theme};
use crate::location::{LocationError, LocationStatus};
use crate::session::ChatReply;
use crate::state::{ChatTurn, PlaceReference, UserFix, ViewMode};
use crate::strings::strings;

/// Suggestion chips disappear once the transcript has this many turns
pub const CHIP_TURN_LIMIT: usize = 3;

/// A send that has been accepted and now needs a model round trip
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub pending_id: String,
    pub text: String,
    /// Transcript before this send
    pub history: Vec<ChatTurn>,
    pub user_fix: Option<UserFix>,
    pub language: Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionChip {
    pub label: &'static str,
    pub prompt: &'static str,
}

#[derive(Debug, Clone)]
pub struct Assistant {
    turns: Vec<ChatTurn>,
    is_loading: bool,
    user_fix: Option<UserFix>,
    location_status: LocationStatus,
    language: Language,
    pub view: ViewMode,
    pub theme: Theme,
    pub show_ads: bool,
}

impl Assistant {
    pub fn new(language: Language, theme: Theme, show_ads: bool) -> Self {
        Self {
            turns: vec![ChatTurn::welcome(strings(language).welcome)],
            is_loading: false,
            user_fix: None,
            location_status: LocationStatus::None,
            language,
            view: ViewMode::Chat,
            theme,
            show_ads,
        }
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn user_fix(&self) -> Option<UserFix> {
        self.user_fix
    }

    pub fn location_status(&self) -> LocationStatus {
        self.location_status
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Accept `text` for sending. Returns `None` when it is blank or a
    /// reply is still outstanding.
    pub fn begin_send(&mut self, text: &str) -> Option<Outgoing> {
        if text.trim().is_empty() || self.is_loading {
            return None;
        }

        self.view = ViewMode::Chat;
        let history = self.turns.clone();
        let pending = ChatTurn::pending_assistant();
        let pending_id = pending.id.clone();

        self.turns.push(ChatTurn::user(text));
        self.turns.push(pending);
        self.is_loading = true;
        debug!("Sending turn {} ({} prior turns)", pending_id, history.len());

        Some(Outgoing {
            pending_id,
            text: text.to_string(),
            history,
            user_fix: self.user_fix,
            language: self.language,
        })
    }

    /// Fill the pending turn with the model's answer. A reply for a turn
    /// that no longer exists (the chat was reset meanwhile) is dropped.
    pub fn complete_send(&mut self, pending_id: &str, reply: ChatReply) {
        match self.turns.iter_mut().find(|t| t.id == pending_id && t.pending) {
            Some(turn) => {
                turn.text = reply.text;
                turn.places = reply.places;
                turn.pending = false;
            }
            None => debug!("Dropping reply for discarded turn {}", pending_id),
        }
        // A stale reply must not end the wait for a newer send.
        self.is_loading = self.turns.iter().any(|t| t.pending);
    }

    /// Replace the pending turn with the localized error text
    pub fn fail_send(&mut self, pending_id: &str) {
        let reply = ChatReply {
            text: strings(self.language).error.to_string(),
            places: Vec::new(),
        };
        self.complete_send(pending_id, reply);
    }

    /// Start over with only the welcome turn. Location is kept.
    pub fn reset_chat(&mut self) {
        self.turns = vec![ChatTurn::welcome(strings(self.language).welcome)];
        self.is_loading = false;
    }

    /// Reset the chat and forget the location too
    pub fn clear_data(&mut self) {
        info!("Clearing conversation and location");
        self.reset_chat();
        self.user_fix = None;
        self.location_status = LocationStatus::None;
    }

    /// Switching language restarts the conversation in that language
    pub fn set_language(&mut self, language: Language) {
        if language == self.language {
            return;
        }
        self.language = language;
        self.reset_chat();
    }

    /// Record the outcome of a location request. A failure keeps any
    /// previous fix.
    pub fn apply_location(&mut self, result: Result<UserFix, LocationError>) {
        match result {
            Ok(fix) => {
                self.user_fix = Some(fix);
                self.location_status = LocationStatus::None;
            }
            Err(e) => {
                debug!("Location unavailable: {}", e);
                self.location_status = e.into();
            }
        }
    }

    /// Places of the most recent assistant turn that has any
    pub fn last_places(&self) -> &[PlaceReference] {
        self.turns
            .iter()
            .rev()
            .find(|t| !t.places.is_empty())
            .map(|t| t.places.as_slice())
            .unwrap_or(&[])
    }

    pub fn suggestion_chips_visible(&self) -> bool {
        self.turns.len() < CHIP_TURN_LIMIT
    }

    pub fn suggestion_chips(&self) -> [SuggestionChip; 5] {
        let s = strings(self.language);
        [
            SuggestionChip { label: s.chips.restaurants, prompt: s.prompts.restaurants },
            SuggestionChip { label: s.chips.hotels, prompt: s.prompts.hotels },
            SuggestionChip { label: s.chips.car_rental, prompt: s.prompts.car_rental },
            SuggestionChip { label: s.chips.attractions, prompt: s.prompts.attractions },
            SuggestionChip { label: s.chips.plan, prompt: s.prompts.plan },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant() -> Assistant {
        Assistant::new(Language::English, Theme::System, true)
    }

    fn reply(text: &str, places: Vec<PlaceReference>) -> ChatReply {
        ChatReply { text: text.to_string(), places }
    }

    #[test]
    fn test_starts_with_welcome() {
        let assistant = assistant();
        assert_eq!(assistant.turns().len(), 1);
        assert!(assistant.turns()[0].is_welcome());
        assert!(assistant.suggestion_chips_visible());
    }

    #[test]
    fn test_blank_send_is_rejected() {
        let mut assistant = assistant();
        assert!(assistant.begin_send("   \n").is_none());
        assert_eq!(assistant.turns().len(), 1);
        assert!(!assistant.is_loading());
    }

    #[test]
    fn test_second_send_rejected_while_pending() {
        let mut assistant = assistant();
        let outgoing = assistant.begin_send("hotels in Rabat").unwrap();
        assert!(assistant.is_loading());
        assert!(assistant.begin_send("and restaurants?").is_none());

        assert_eq!(outgoing.history.len(), 1);
        let pending: Vec<_> = assistant.turns().iter().filter(|t| t.pending).collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, outgoing.pending_id);
    }

    #[test]
    fn test_send_from_map_returns_to_chat() {
        let mut assistant = assistant();
        assistant.view = ViewMode::Map;
        assistant.begin_send("museums").unwrap();
        assert_eq!(assistant.view, ViewMode::Chat);
    }

    #[test]
    fn test_complete_fills_pending_in_place() {
        let mut assistant = assistant();
        let outgoing = assistant.begin_send("cafes").unwrap();
        let places = vec![PlaceReference::new("Café Clock", "https://maps.example/1")];

        assistant.complete_send(&outgoing.pending_id, reply("Try Café Clock.", places.clone()));

        assert!(!assistant.is_loading());
        let last = assistant.turns().last().unwrap();
        assert_eq!(last.id, outgoing.pending_id);
        assert!(!last.pending);
        assert_eq!(last.text, "Try Café Clock.");
        assert_eq!(assistant.last_places(), places.as_slice());
        assert!(!assistant.suggestion_chips_visible());
    }

    #[test]
    fn test_fail_uses_error_text() {
        let mut assistant = assistant();
        let outgoing = assistant.begin_send("hello").unwrap();
        assistant.fail_send(&outgoing.pending_id);

        assert!(!assistant.is_loading());
        assert_eq!(assistant.turns().last().unwrap().text, strings(Language::English).error);
    }

    #[test]
    fn test_reply_after_reset_is_dropped() {
        let mut assistant = assistant();
        let outgoing = assistant.begin_send("hello").unwrap();
        assistant.reset_chat();
        assistant.complete_send(&outgoing.pending_id, reply("late", Vec::new()));

        assert_eq!(assistant.turns().len(), 1);
        assert!(!assistant.is_loading());
    }

    #[test]
    fn test_stale_reply_keeps_newer_send_loading() {
        let mut assistant = assistant();
        let stale = assistant.begin_send("hello").unwrap();
        assistant.reset_chat();
        let current = assistant.begin_send("hotels in Fes").unwrap();

        assistant.complete_send(&stale.pending_id, reply("late", Vec::new()));
        assert!(assistant.is_loading());
        assert!(assistant.begin_send("and riads?").is_none());
        assert!(assistant.turns().last().unwrap().pending);

        assistant.complete_send(&current.pending_id, reply("Try Riad Fes.", Vec::new()));
        assert!(!assistant.is_loading());
        assert_eq!(assistant.turns().last().unwrap().text, "Try Riad Fes.");
    }

    #[test]
    fn test_last_places_skips_turns_without_places() {
        let mut assistant = assistant();
        let first = assistant.begin_send("riads").unwrap();
        let places = vec![PlaceReference::new("Riad Yasmine", "u1")];
        assistant.complete_send(&first.pending_id, reply("Riads", places.clone()));
        let second = assistant.begin_send("thanks").unwrap();
        assistant.complete_send(&second.pending_id, reply("You're welcome", Vec::new()));

        assert_eq!(assistant.last_places(), places.as_slice());
    }

    #[test]
    fn test_clear_data_forgets_location() {
        let mut assistant = assistant();
        assistant.apply_location(Ok(UserFix::new(35.76, -5.83)));
        assistant.begin_send("hello").unwrap();

        assistant.reset_chat();
        assert!(assistant.user_fix().is_some());

        assistant.apply_location(Err(LocationError::Timeout));
        assistant.clear_data();
        assert_eq!(assistant.turns().len(), 1);
        assert!(assistant.turns()[0].is_welcome());
        assert_eq!(assistant.user_fix(), None);
        assert_eq!(assistant.location_status(), LocationStatus::None);
    }

    #[test]
    fn test_location_error_keeps_previous_fix() {
        let mut assistant = assistant();
        let fix = UserFix::new(30.42, -9.6);
        assistant.apply_location(Ok(fix));
        assistant.apply_location(Err(LocationError::PermissionDenied));
        assert_eq!(assistant.user_fix(), Some(fix));
        assert_eq!(assistant.location_status(), LocationStatus::Denied);
    }

    #[test]
    fn test_language_change_reseeds_welcome() {
        let mut assistant = assistant();
        assistant.begin_send("hello").unwrap();
        assistant.set_language(Language::Arabic);

        assert_eq!(assistant.turns().len(), 1);
        assert_eq!(assistant.turns()[0].text, strings(Language::Arabic).welcome);
        assert_eq!(assistant.suggestion_chips()[0].label, strings(Language::Arabic).chips.restaurants);
    }
}
