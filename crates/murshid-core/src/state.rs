//! UI-agnostic conversation and place types
//!
//! These structures are shared between the core pipeline and any front end
//! (the terminal UI today) and don't depend on any specific UI framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Id of the synthetic greeting turn that opens every conversation.
pub const WELCOME_TURN_ID: &str = "welcome";

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A role + text pair, the shape in which history is handed to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// A place citation returned by the model's map search tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceReference {
    pub title: String,
    pub uri: String,
    pub review_snippet: Option<String>,
}

impl PlaceReference {
    pub fn new(title: &str, uri: &str) -> Self {
        Self {
            title: title.to_string(),
            uri: uri.to_string(),
            review_snippet: None,
        }
    }

    pub fn with_snippet(mut self, snippet: &str) -> Self {
        self.review_snippet = Some(snippet.to_string());
        self
    }

    /// Title for display, or `fallback` when the model sent an empty one
    pub fn display_title<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.title.trim().is_empty() {
            fallback
        } else {
            &self.title
        }
    }
}

/// One bubble in the transcript.
///
/// Turns are only ever appended. The single exception is the pending
/// placeholder, which is filled in place once the model answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub places: Vec<PlaceReference>,
    pub pending: bool,
}

impl ChatTurn {
    pub fn user(text: &str) -> Self {
        Self::new(ChatRole::User, text, false)
    }

    pub fn pending_assistant() -> Self {
        Self::new(ChatRole::Assistant, "", true)
    }

    pub fn welcome(text: &str) -> Self {
        Self {
            id: WELCOME_TURN_ID.to_string(),
            ..Self::new(ChatRole::Assistant, text, false)
        }
    }

    fn new(role: ChatRole, text: &str, pending: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.to_string(),
            created_at: Utc::now(),
            places: Vec::new(),
            pending,
        }
    }

    pub fn is_welcome(&self) -> bool {
        self.id == WELCOME_TURN_ID
    }

    pub fn as_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.text.clone(),
        }
    }
}

/// A best-effort device position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl UserFix {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// A place reference that the geocoder pinned to coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewMode {
    #[default]
    Chat,
    Map,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Chat => ViewMode::Map,
            ViewMode::Map => ViewMode::Chat,
        }
    }
}
