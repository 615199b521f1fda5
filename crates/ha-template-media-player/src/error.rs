//! Error types for the template media player

use crate::feature::Command;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for entity commands
pub type MediaPlayerResult<T> = Result<T, MediaPlayerError>;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Why a template failed to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderErrorKind {
    /// A referenced entity has no state yet (common while the host starts)
    MissingEntity,
    /// Any other evaluation failure
    Other,
}

/// Template evaluation failure reported by the host renderer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RenderError {
    pub kind: RenderErrorKind,
    pub message: String,
}

impl RenderError {
    pub fn missing_entity(message: impl Into<String>) -> Self {
        Self {
            kind: RenderErrorKind::MissingEntity,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: RenderErrorKind::Other,
            message: message.into(),
        }
    }

    pub fn is_missing_entity(&self) -> bool {
        self.kind == RenderErrorKind::MissingEntity
    }
}

/// Failure reported by the host script runner
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("script failed: {0}")]
pub struct ScriptError(pub String);

/// Rendered state outside the recognised vocabulary
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Received invalid media_player state: {value}. Expected: {expected}.")]
pub struct InvalidStateError {
    pub value: String,
    pub expected: String,
}

/// Errors returned from entity commands and service dispatch
#[derive(Debug, Error)]
pub enum MediaPlayerError {
    /// The command has no configured action, so it is not a capability
    #[error("{0} is not supported by this media player")]
    NotSupported(Command),

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("service {domain}.{service} is not a media_player service")]
    UnknownService { domain: String, service: String },

    #[error("invalid data for {service}: {reason}")]
    InvalidServiceData { service: String, reason: String },

    #[error(transparent)]
    Script(#[from] ScriptError),

    /// The entity task is gone
    #[error("media player {0} is no longer running")]
    Unavailable(String),
}

/// Errors that can occur while loading platform configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse media player configuration: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("invalid slug '{0}' for media player key")]
    InvalidSlug(String),

    #[error("invalid entity id for media player '{device}': {source}")]
    InvalidEntityId {
        device: String,
        #[source]
        source: ha_core::EntityIdError,
    },
}
