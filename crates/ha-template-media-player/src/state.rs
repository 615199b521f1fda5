//! Player state and the resolver that derives it from a rendered template

use crate::error::InvalidStateError;
use ha_core::{STATE_IDLE, STATE_OFF, STATE_ON, STATE_UNKNOWN};
use std::fmt;

/// Rendered values accepted by [`resolve_state`], besides `unknown`
pub const VALID_STATES: [&str; 5] = ["on", "off", "true", "false", "idle"];

/// State reported by a template media player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    On,
    Off,
    Idle,
    Unknown,
}

impl PlayerState {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerState::On => STATE_ON,
            PlayerState::Off => STATE_OFF,
            PlayerState::Idle => STATE_IDLE,
            PlayerState::Unknown => STATE_UNKNOWN,
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a rendered state template to a player state
///
/// Matching is case-insensitive but whitespace is significant; renderers
/// strip their output already. `unknown` yields `Ok(None)`; anything outside
/// the vocabulary is an [`InvalidStateError`] naming the value.
pub fn resolve_state(rendered: &str) -> Result<Option<PlayerState>, InvalidStateError> {
    let value = rendered.to_lowercase();
    match value.as_str() {
        "on" | "true" => Ok(Some(PlayerState::On)),
        "off" | "false" => Ok(Some(PlayerState::Off)),
        "idle" => Ok(Some(PlayerState::Idle)),
        STATE_UNKNOWN => Ok(None),
        _ => Err(InvalidStateError {
            value,
            expected: VALID_STATES.join(", "),
        }),
    }
}
