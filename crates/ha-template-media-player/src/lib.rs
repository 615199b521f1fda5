//! Template media player platform
//!
//! A `media_player` entity whose state, icon, picture, availability and
//! current source come from templates, and whose commands run configured
//! scripts. The host supplies template rendering, script execution, the
//! state machine and the event bus through the traits in [`host`].
//!
//! Typical wiring:
//!
//! 1. Parse the platform block with [`PlatformConfig::from_yaml_str`].
//! 2. Build the entities with [`setup_platform`].
//! 3. Hand each one to [`tracking::spawn`] and route `media_player.*`
//!    service calls through the returned [`MediaPlayerHandle`].

pub mod action;
pub mod config;
pub mod entity;
pub mod error;
pub mod feature;
pub mod host;
pub mod platform;
pub mod service;
pub mod state;
pub mod template;
pub mod tracking;

pub use action::{ActionSequence, ActionTable, SourceMap};
pub use config::{
    load_platforms, platforms_from_str, MediaPlayerConfig, PlatformConfig, SourceValidation,
    PLATFORM,
};
pub use entity::{PendingScript, PlayerAttributes, TemplateMediaPlayer, DOMAIN};
pub use error::{
    ConfigError, ConfigResult, InvalidStateError, MediaPlayerError, MediaPlayerResult,
    RenderError, RenderErrorKind, ScriptError,
};
pub use feature::{Command, MediaPlayerEntityFeature};
pub use host::{EventSource, Host, ScriptRunner, StateWriter, TemplateRenderer};
pub use platform::setup_platform;
pub use service::MediaPlayerService;
pub use state::{resolve_state, PlayerState};
pub use template::{extract_dependencies, Dependencies, Template};
pub use tracking::{MediaPlayerHandle, PlayerSnapshot};
