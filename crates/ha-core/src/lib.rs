//! Host contract types for template entities
//!
//! The types in this crate describe what a template entity exchanges with the
//! automation host: entity ids, request contexts, state snapshots, bus events
//! and service calls. The host owns the real event bus, state machine and
//! service registry; this crate only carries the data that crosses that seam.

mod context;
mod entity_id;
mod event;
mod service_call;
mod state;

pub use context::Context;
pub use entity_id::{generate_entity_id, is_valid_slug, slugify, EntityId, EntityIdError};
pub use event::{Event, EventData, EventType};
pub use service_call::{ServiceCall, ServiceDataError};
pub use state::State;

/// State reported when an entity's value cannot be determined
pub const STATE_UNKNOWN: &str = "unknown";

/// State reported when an entity is not available
pub const STATE_UNAVAILABLE: &str = "unavailable";

pub const STATE_ON: &str = "on";
pub const STATE_OFF: &str = "off";
pub const STATE_IDLE: &str = "idle";

/// Dependency marker meaning "every entity"
pub const MATCH_ALL: &str = "*";

/// Event types the template platforms listen to
pub mod events {
    use super::*;

    /// Fired by the state machine whenever an entity's state is written
    pub const STATE_CHANGED: &str = "state_changed";

    /// Fired once when the host has finished starting up
    pub const HOMEASSISTANT_START: &str = "homeassistant_start";

    /// Data for STATE_CHANGED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct StateChangedData {
        pub entity_id: EntityId,
        pub old_state: Option<State>,
        pub new_state: Option<State>,
    }

    impl EventData for StateChangedData {
        fn event_type() -> &'static str {
            STATE_CHANGED
        }
    }
}
