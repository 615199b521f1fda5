//! Player commands and the supported-feature bitmask

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Supported features of a media player, using the host's bit values
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MediaPlayerEntityFeature: u32 {
        const PAUSE = 1;
        const VOLUME_MUTE = 8;
        const PREVIOUS_TRACK = 16;
        const NEXT_TRACK = 32;
        const TURN_ON = 128;
        const TURN_OFF = 256;
        /// Covers both `volume_up` and `volume_down`. Configuring either
        /// direction sets it, so the other may still be `NotSupported`.
        const VOLUME_STEP = 1024;
        const SELECT_SOURCE = 2048;
        const STOP = 4096;
        const PLAY = 16384;
    }
}

/// Every command a template media player can be asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Command {
    TurnOn,
    TurnOff,
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    VolumeUp,
    VolumeDown,
    Mute,
    SelectSource,
}

impl Command {
    pub const ALL: [Command; 11] = [
        Command::TurnOn,
        Command::TurnOff,
        Command::Play,
        Command::Pause,
        Command::Stop,
        Command::Next,
        Command::Previous,
        Command::VolumeUp,
        Command::VolumeDown,
        Command::Mute,
        Command::SelectSource,
    ];

    /// Feature flag advertised when this command is configured
    pub fn feature(self) -> MediaPlayerEntityFeature {
        match self {
            Command::TurnOn => MediaPlayerEntityFeature::TURN_ON,
            Command::TurnOff => MediaPlayerEntityFeature::TURN_OFF,
            Command::Play => MediaPlayerEntityFeature::PLAY,
            Command::Pause => MediaPlayerEntityFeature::PAUSE,
            Command::Stop => MediaPlayerEntityFeature::STOP,
            Command::Next => MediaPlayerEntityFeature::NEXT_TRACK,
            Command::Previous => MediaPlayerEntityFeature::PREVIOUS_TRACK,
            Command::VolumeUp | Command::VolumeDown => MediaPlayerEntityFeature::VOLUME_STEP,
            Command::Mute => MediaPlayerEntityFeature::VOLUME_MUTE,
            Command::SelectSource => MediaPlayerEntityFeature::SELECT_SOURCE,
        }
    }

    /// Host service name that invokes this command
    pub fn service(self) -> &'static str {
        match self {
            Command::TurnOn => "turn_on",
            Command::TurnOff => "turn_off",
            Command::Play => "media_play",
            Command::Pause => "media_pause",
            Command::Stop => "media_stop",
            Command::Next => "media_next_track",
            Command::Previous => "media_previous_track",
            Command::VolumeUp => "volume_up",
            Command::VolumeDown => "volume_down",
            Command::Mute => "volume_mute",
            Command::SelectSource => "select_source",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service())
    }
}

/// Bitmask advertised for a set of configured commands
pub fn features_for<I: IntoIterator<Item = Command>>(commands: I) -> MediaPlayerEntityFeature {
    commands
        .into_iter()
        .fold(MediaPlayerEntityFeature::empty(), |acc, c| acc | c.feature())
}
