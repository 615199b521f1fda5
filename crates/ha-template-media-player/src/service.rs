//! `media_player.*` service calls aimed at a template media player

use crate::entity::{PendingScript, TemplateMediaPlayer, DOMAIN};
use crate::error::{MediaPlayerError, MediaPlayerResult};
use crate::feature::Command;
use ha_core::{Context, ServiceCall};
use serde::de::DeserializeOwned;

/// A parsed media player service request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPlayerService {
    TurnOn,
    TurnOff,
    Toggle,
    Play,
    Pause,
    Stop,
    NextTrack,
    PreviousTrack,
    VolumeUp,
    VolumeDown,
    Mute(bool),
    SelectSource(String),
}

impl MediaPlayerService {
    /// Parse a host service call
    pub fn from_call(call: &ServiceCall) -> MediaPlayerResult<Self> {
        if !call.is_for(DOMAIN) {
            return Err(unknown(call));
        }

        Ok(match call.service.as_str() {
            "turn_on" => Self::TurnOn,
            "turn_off" => Self::TurnOff,
            "toggle" => Self::Toggle,
            "media_play" => Self::Play,
            "media_pause" => Self::Pause,
            "media_stop" => Self::Stop,
            "media_next_track" => Self::NextTrack,
            "media_previous_track" => Self::PreviousTrack,
            "volume_up" => Self::VolumeUp,
            "volume_down" => Self::VolumeDown,
            "volume_mute" => Self::Mute(required(call, "is_volume_muted")?),
            "select_source" => Self::SelectSource(required(call, "source")?),
            _ => return Err(unknown(call)),
        })
    }

    /// Dispatch to the matching entity handler and wait for its script
    pub async fn call(
        self,
        player: &mut TemplateMediaPlayer,
        context: Context,
    ) -> MediaPlayerResult<()> {
        self.begin(player, context)?.run().await
    }

    /// Apply the synchronous part of the call to `player`
    pub fn begin(
        self,
        player: &mut TemplateMediaPlayer,
        context: Context,
    ) -> MediaPlayerResult<PendingScript> {
        let command = match self {
            Self::Toggle => return player.begin_toggle(context),
            Self::Mute(mute) => return player.begin_mute(mute, context),
            Self::SelectSource(source) => return player.begin_select_source(&source, context),
            Self::TurnOn => Command::TurnOn,
            Self::TurnOff => Command::TurnOff,
            Self::Play => Command::Play,
            Self::Pause => Command::Pause,
            Self::Stop => Command::Stop,
            Self::NextTrack => Command::Next,
            Self::PreviousTrack => Command::Previous,
            Self::VolumeUp => Command::VolumeUp,
            Self::VolumeDown => Command::VolumeDown,
        };
        player.begin_command(command, None, context)
    }
}

fn unknown(call: &ServiceCall) -> MediaPlayerError {
    MediaPlayerError::UnknownService {
        domain: call.domain.clone(),
        service: call.service.clone(),
    }
}

fn required<T: DeserializeOwned>(call: &ServiceCall, field: &str) -> MediaPlayerResult<T> {
    call.require(field)
        .map_err(|err| MediaPlayerError::InvalidServiceData {
            service: call.service_id(),
            reason: err.to_string(),
        })
}
