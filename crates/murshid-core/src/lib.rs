pub mod ai;
pub mod assistant;
pub mod config;
pub mod geocode;
pub mod language;
pub mod location;
pub mod map;
pub mod session;
pub mod state;
pub mod strings;

// Re-export main types for convenience
pub use ai::{ChatBackend, GeminiClient};
pub use assistant::{Assistant, Outgoing, SuggestionChip};
pub use config::Config;
pub use geocode::{GeocodeResolver, GeocodeSearch, NominatimClient, Resolution, RunToken};
pub use language::{Language, Theme};
pub use location::{build_provider, LocationError, LocationOptions, LocationProvider, LocationStatus};
pub use map::{MapError, MapProjector, MapStatus};
pub use session::{ChatReply, ConversationSession};
pub use state::{ChatRole, ChatTurn, PlaceReference, ResolvedPlace, UserFix, ViewMode};
pub use strings::strings;
