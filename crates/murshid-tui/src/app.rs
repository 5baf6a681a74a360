use std::sync::Arc;

use anyhow::Result;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use murshid_core::map::SurfaceSize;
use murshid_core::{
    build_provider, Assistant, ChatReply, Config, ConversationSession, GeminiClient,
    GeocodeResolver, Language, LocationError, LocationOptions, LocationProvider, MapProjector,
    NominatimClient, Resolution, RunToken, Theme, UserFix, ViewMode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsItem {
    Language,
    Theme,
    Ads,
    DeleteChat,
    ClearData,
}

pub const SETTINGS_ITEMS: [SettingsItem; 5] = [
    SettingsItem::Language,
    SettingsItem::Theme,
    SettingsItem::Ads,
    SettingsItem::DeleteChat,
    SettingsItem::ClearData,
];

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub assistant: Assistant,
    pub projector: MapProjector,

    // Input line
    pub input: String,
    pub input_cursor: usize,

    // Transcript scrolling (updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub follow_chat: bool,

    // Animation state
    pub animation_frame: u8,
    pub pulse_on: bool,

    // Popups
    pub show_settings: bool,
    pub settings_state: ListState,
    pub show_language_picker: bool,
    pub language_state: ListState,

    pub api_key_missing: bool,
    pub locating: bool,
    pub colorfgbg: Option<String>,

    session: ConversationSession,
    resolver: Arc<GeocodeResolver>,
    location: Arc<dyn LocationProvider>,
    chat_task: Option<(String, JoinHandle<ChatReply>)>,
    geocode_task: Option<(RunToken, JoinHandle<Resolution>)>,
    location_task: Option<JoinHandle<Result<UserFix, LocationError>>>,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.api_key();
        if api_key.is_none() {
            warn!("No Gemini API key configured; chat requests will fail");
        }
        let gemini = GeminiClient::new(
            api_key.as_deref().unwrap_or_default(),
            &config.model(),
            &config.gemini_base_url(),
        );
        info!("Using model {}", gemini.model());

        let user_agent = config.user_agent();
        let nominatim = NominatimClient::new(&config.nominatim_base_url(), &user_agent)?;
        let resolver = GeocodeResolver::new(Arc::new(nominatim), config.geocode_delay());
        let location = build_provider(&config.location_source(), &user_agent)?;

        let language = config.language();
        let assistant = Assistant::new(language, config.theme(), config.show_ads());
        let projector = MapProjector::new(language, None);

        let mut language_state = ListState::default();
        language_state.select(Language::all().iter().position(|l| *l == language));
        let mut settings_state = ListState::default();
        settings_state.select(Some(0));

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            assistant,
            projector,
            input: String::new(),
            input_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_chat: true,
            animation_frame: 0,
            pulse_on: false,
            show_settings: false,
            settings_state,
            show_language_picker: false,
            language_state,
            api_key_missing: api_key.is_none(),
            locating: false,
            colorfgbg: std::env::var("COLORFGBG").ok(),
            session: ConversationSession::new(Arc::new(gemini)),
            resolver: Arc::new(resolver),
            location,
            chat_task: None,
            geocode_task: None,
            location_task: None,
        })
    }

    pub fn language(&self) -> Language {
        self.assistant.language()
    }

    /// Theme with `System` resolved against the terminal
    pub fn effective_theme(&self) -> Theme {
        self.assistant.theme.resolve(self.colorfgbg.as_deref())
    }

    /// Send the input line
    pub fn submit_input(&mut self) {
        let text = self.input.clone();
        if self.send(&text) {
            self.input.clear();
            self.input_cursor = 0;
        }
    }

    /// Send one of the suggestion chips by position
    pub fn send_chip(&mut self, index: usize) {
        if !self.assistant.suggestion_chips_visible() {
            return;
        }
        if let Some(chip) = self.assistant.suggestion_chips().get(index).copied() {
            self.send(chip.prompt);
        }
    }

    fn send(&mut self, text: &str) -> bool {
        let Some(outgoing) = self.assistant.begin_send(text) else {
            return false;
        };
        self.projector.detach();
        self.follow_chat = true;

        let session = self.session.clone();
        let pending_id = outgoing.pending_id.clone();
        let handle = tokio::spawn(async move {
            session
                .send(&outgoing.text, &outgoing.history, outgoing.user_fix, outgoing.language)
                .await
        });
        self.chat_task = Some((pending_id, handle));
        true
    }

    /// Abort the chat request in flight, if any
    fn cancel_chat(&mut self) {
        if let Some((pending_id, handle)) = self.chat_task.take() {
            debug!("Cancelling chat request for turn {}", pending_id);
            handle.abort();
        }
    }

    /// Ask the location provider for a fresh fix (manual retry too)
    pub fn request_location(&mut self) {
        if self.location_task.is_some() {
            return;
        }
        self.locating = true;
        let provider = self.location.clone();
        self.location_task = Some(tokio::spawn(async move {
            provider.request(&LocationOptions::default()).await
        }));
    }

    /// Start geocoding the latest places. Any run still in flight is
    /// superseded and its result discarded.
    pub fn refresh_places(&mut self) {
        let references = self.assistant.last_places().to_vec();
        let token = self.resolver.begin();
        self.projector.begin_resolution(token, references.len());

        let resolver = self.resolver.clone();
        let user_fix = self.assistant.user_fix();
        let language = self.language();
        let handle = tokio::spawn(async move {
            resolver.resolve(token, &references, user_fix, language).await
        });
        self.geocode_task = Some((token, handle));
    }

    /// Apply results of any finished background work
    pub async fn poll_tasks(&mut self) {
        if self.chat_task.as_ref().is_some_and(|(_, h)| h.is_finished()) {
            if let Some((pending_id, handle)) = self.chat_task.take() {
                match handle.await {
                    Ok(reply) => self.assistant.complete_send(&pending_id, reply),
                    Err(e) => {
                        warn!("Chat task failed: {}", e);
                        self.assistant.fail_send(&pending_id);
                    }
                }
                self.follow_chat = true;
                self.refresh_places();
            }
        }

        if self.location_task.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = self.location_task.take() {
                self.locating = false;
                let result = handle.await.unwrap_or(Err(LocationError::Unavailable));
                let previous = self.assistant.user_fix();
                self.assistant.apply_location(result);
                if self.assistant.user_fix() != previous {
                    self.projector.on_user_fix_changed(self.assistant.user_fix());
                    self.refresh_places();
                }
            }
        }

        if self.geocode_task.as_ref().is_some_and(|(_, h)| h.is_finished()) {
            if let Some((token, handle)) = self.geocode_task.take() {
                match handle.await {
                    Ok(resolution) => self.projector.finish_resolution(token, resolution),
                    Err(e) => {
                        warn!("Geocode task failed: {}", e);
                        self.projector.finish_resolution(token, Resolution::Resolved(Vec::new()));
                    }
                }
            }
        }
    }

    pub fn toggle_view(&mut self) {
        self.assistant.view = self.assistant.view.toggled();
        if self.assistant.view == ViewMode::Chat {
            self.projector.detach();
        }
    }

    /// Called while drawing the map with the canvas resolution
    pub fn attach_map(&mut self, size: SurfaceSize) {
        if let Err(e) = self.projector.attach(size) {
            warn!("Map not shown: {}", e);
        }
    }

    pub fn set_language(&mut self, language: Language) {
        if language == self.language() {
            return;
        }
        info!("Language changed to {}", language.code());
        self.cancel_chat();
        self.assistant.set_language(language);
        self.projector.on_language_changed(language);
        self.follow_chat = true;
        self.refresh_places();
    }

    pub fn cycle_theme(&mut self) {
        let themes = Theme::all();
        let current = themes.iter().position(|t| *t == self.assistant.theme).unwrap_or(0);
        self.assistant.theme = themes[(current + 1) % themes.len()];
    }

    pub fn toggle_ads(&mut self) {
        self.assistant.show_ads = !self.assistant.show_ads;
    }

    pub fn delete_chat(&mut self) {
        self.cancel_chat();
        self.assistant.reset_chat();
        self.chat_scroll = 0;
        self.follow_chat = true;
        self.refresh_places();
    }

    pub fn clear_data(&mut self) {
        self.cancel_chat();
        self.assistant.clear_data();
        self.projector.on_user_fix_changed(None);
        self.chat_scroll = 0;
        self.follow_chat = true;
        self.refresh_places();
    }

    pub fn tick(&mut self) {
        if self.assistant.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.pulse_on = !self.pulse_on;
    }

    pub fn scroll_up(&mut self) {
        self.follow_chat = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn settings_nav_down(&mut self) {
        let i = self.settings_state.selected().unwrap_or(0);
        self.settings_state.select(Some((i + 1) % SETTINGS_ITEMS.len()));
    }

    pub fn settings_nav_up(&mut self) {
        let i = self.settings_state.selected().unwrap_or(0);
        self.settings_state
            .select(Some((i + SETTINGS_ITEMS.len() - 1) % SETTINGS_ITEMS.len()));
    }

    pub fn language_nav_down(&mut self) {
        let count = Language::all().len();
        let i = self.language_state.selected().unwrap_or(0);
        self.language_state.select(Some((i + 1) % count));
    }

    pub fn language_nav_up(&mut self) {
        let count = Language::all().len();
        let i = self.language_state.selected().unwrap_or(0);
        self.language_state.select(Some((i + count - 1) % count));
    }

    pub fn select_language(&mut self) {
        if let Some(language) = self
            .language_state
            .selected()
            .and_then(|i| Language::all().get(i).copied())
        {
            self.set_language(language);
        }
        self.show_language_picker = false;
    }

    /// Run the highlighted settings entry
    pub fn activate_setting(&mut self) {
        let Some(item) = self.settings_state.selected().and_then(|i| SETTINGS_ITEMS.get(i).copied()) else {
            return;
        };
        match item {
            SettingsItem::Language => {
                self.language_state
                    .select(Language::all().iter().position(|l| *l == self.language()));
                self.show_language_picker = true;
            }
            SettingsItem::Theme => self.cycle_theme(),
            SettingsItem::Ads => self.toggle_ads(),
            SettingsItem::DeleteChat => {
                self.delete_chat();
                self.show_settings = false;
            }
            SettingsItem::ClearData => {
                self.clear_data();
                self.show_settings = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;

    fn test_config() -> Config {
        Config {
            language: Some("en".to_string()),
            location_source: Some("none".to_string()),
            ..Config::default()
        }
    }

    /// Install a chat request that never answers. The receiver resolves
    /// once the task is dropped.
    fn hanging_chat(app: &mut App) -> oneshot::Receiver<()> {
        let (guard, dropped) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<ChatReply>().await
        });
        app.chat_task = Some(("pending".to_string(), handle));
        dropped
    }

    #[tokio::test]
    async fn test_delete_chat_aborts_request() {
        let mut app = App::new(&test_config()).unwrap();
        let dropped = hanging_chat(&mut app);

        app.delete_chat();

        assert!(app.chat_task.is_none());
        let result = tokio::time::timeout(Duration::from_secs(5), dropped).await;
        assert!(result.is_ok(), "chat request still running after delete");
    }

    #[tokio::test]
    async fn test_language_change_and_clear_abort_request() {
        let mut app = App::new(&test_config()).unwrap();

        let dropped = hanging_chat(&mut app);
        app.set_language(Language::Arabic);
        assert!(tokio::time::timeout(Duration::from_secs(5), dropped).await.is_ok());

        let dropped = hanging_chat(&mut app);
        app.clear_data();
        assert!(tokio::time::timeout(Duration::from_secs(5), dropped).await.is_ok());
        assert!(app.chat_task.is_none());
    }
}
