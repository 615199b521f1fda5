//! Platform configuration
//!
//! Mirrors the YAML a user writes under `media_player:`:
//!
//! ```yaml
//! media_player:
//!   - platform: template
//!     media_players:
//!       living_room_tv:
//!         friendly_name: Living Room TV
//!         value_template: "{{ states('switch.tv_power') }}"
//!         turn_on:
//!           service: switch.turn_on
//!           entity_id: switch.tv_power
//!         turn_off:
//!           service: switch.turn_off
//!           entity_id: switch.tv_power
//!         inputs:
//!           hdmi1:
//!             service: remote.send_command
//!             data: { command: hdmi1 }
//! ```

use crate::action::{ActionSequence, ActionTable, SourceMap};
use crate::entity::DOMAIN;
use crate::error::{ConfigError, ConfigResult};
use crate::feature::Command;
use crate::template::Template;
use ha_core::{is_valid_slug, EntityId};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Platform name under the `media_player` domain
pub const PLATFORM: &str = "template";

/// Load every template platform block from a configuration file
pub fn load_platforms(path: impl AsRef<Path>) -> ConfigResult<Vec<PlatformConfig>> {
    let path = path.as_ref();
    debug!("Loading media player platforms from {:?}", path);

    let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    platforms_from_str(&content)
}

/// Template platform blocks under `media_player:` in configuration YAML
///
/// The domain may hold a single block or a list; blocks of other platforms
/// are skipped.
pub fn platforms_from_str(content: &str) -> ConfigResult<Vec<PlatformConfig>> {
    let root: Value = serde_yaml::from_str(content)?;
    let blocks = match root.get(DOMAIN) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Sequence(blocks)) => blocks.clone(),
        Some(block) => vec![block.clone()],
    };

    blocks
        .into_iter()
        .filter(|block| block.get("platform").and_then(Value::as_str) == Some(PLATFORM))
        .map(PlatformConfig::from_value)
        .collect()
}

/// `media_player: - platform: template` block
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub platform: Option<String>,

    /// Players keyed by device slug, in configuration order
    pub media_players: IndexMap<String, MediaPlayerConfig>,
}

impl PlatformConfig {
    /// Parse and validate a platform block from YAML text
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate an already-loaded YAML value
    pub fn from_value(value: serde_yaml::Value) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        for (device, player) in &self.media_players {
            if !is_valid_slug(device) {
                return Err(ConfigError::InvalidSlug(device.clone()));
            }
            player.dependency_ids(device)?;
        }
        debug!(count = self.media_players.len(), "Validated template media players");
        Ok(())
    }
}

/// How a rendered current source is checked before being accepted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceValidation {
    /// Only names from `inputs` are accepted; anything else is ignored
    #[default]
    Strict,
    /// Whatever the template renders is shown
    Lenient,
}

/// Configuration of a single template media player
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaPlayerConfig {
    pub value_template: Template,

    #[serde(default)]
    pub icon_template: Option<Template>,

    #[serde(default)]
    pub entity_picture_template: Option<Template>,

    #[serde(default)]
    pub availability_template: Option<Template>,

    #[serde(default)]
    pub current_source_template: Option<Template>,

    #[serde(default)]
    pub source_validation: SourceValidation,

    pub turn_on: ActionSequence,
    pub turn_off: ActionSequence,

    #[serde(default)]
    pub play: Option<ActionSequence>,
    #[serde(default)]
    pub pause: Option<ActionSequence>,
    #[serde(default)]
    pub stop: Option<ActionSequence>,
    #[serde(default)]
    pub next: Option<ActionSequence>,
    #[serde(default)]
    pub previous: Option<ActionSequence>,
    #[serde(default)]
    pub volume_up: Option<ActionSequence>,
    #[serde(default)]
    pub volume_down: Option<ActionSequence>,
    #[serde(default)]
    pub mute: Option<ActionSequence>,

    /// Source name to the actions selecting it
    #[serde(default, alias = "input_templates")]
    pub inputs: SourceMap,

    #[serde(default)]
    pub friendly_name: Option<String>,

    /// Entities whose changes trigger a refresh, as given by the user
    #[serde(default, rename = "entity_id", deserialize_with = "one_or_many")]
    pub entity_ids: Option<Vec<String>>,
}

impl MediaPlayerConfig {
    /// Display name, defaulting to the device slug
    pub fn name(&self, device: &str) -> String {
        self.friendly_name
            .clone()
            .unwrap_or_else(|| device.to_string())
    }

    /// Every configured template, state template first
    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        std::iter::once(&self.value_template).chain(
            [
                &self.icon_template,
                &self.entity_picture_template,
                &self.availability_template,
                &self.current_source_template,
            ]
            .into_iter()
            .flatten(),
        )
    }

    /// The explicit `entity_id` list, parsed
    pub fn dependency_ids(&self, device: &str) -> ConfigResult<Option<Vec<EntityId>>> {
        let Some(raw) = &self.entity_ids else {
            return Ok(None);
        };

        raw.iter()
            .map(|id| {
                id.parse::<EntityId>()
                    .map_err(|source| ConfigError::InvalidEntityId {
                        device: device.to_string(),
                        source,
                    })
            })
            .collect::<ConfigResult<Vec<_>>>()
            .map(Some)
    }

    /// Build the command table from the configured actions
    pub fn action_table(&self) -> ActionTable {
        ActionTable::new(self.turn_on.clone(), self.turn_off.clone())
            .with(Command::Play, self.play.clone())
            .with(Command::Pause, self.pause.clone())
            .with(Command::Stop, self.stop.clone())
            .with(Command::Next, self.next.clone())
            .with(Command::Previous, self.previous.clone())
            .with(Command::VolumeUp, self.volume_up.clone())
            .with(Command::VolumeDown, self.volume_down.clone())
            .with(Command::Mute, self.mute.clone())
            .with_sources(self.inputs.clone())
    }
}

/// Accept `entity_id: a.b`, `entity_id: a.b, c.d` or a list
fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::One(s)) => Some(
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        ),
        Some(Raw::Many(ids)) => Some(ids),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::MediaPlayerEntityFeature;
    use tempfile::TempDir;

    const FULL: &str = r#"
platform: template
media_players:
  living_room_tv:
    friendly_name: Living Room TV
    value_template: "{{ states('switch.tv_power') }}"
    icon_template: "mdi:television"
    availability_template: "{{ has_value('switch.tv_power') }}"
    current_source_template: "{{ states('input_select.tv_source') }}"
    source_validation: lenient
    turn_on:
      service: switch.turn_on
      entity_id: switch.tv_power
    turn_off:
      - service: switch.turn_off
        entity_id: switch.tv_power
    play:
      service: remote.send_command
      data: { command: play }
    volume_up:
      service: remote.send_command
      data: { command: volume_up }
    inputs:
      hdmi1:
        service: remote.send_command
        data: { command: hdmi1 }
      hdmi2:
        service: remote.send_command
        data: { command: hdmi2 }
    entity_id: switch.tv_power, input_select.tv_source
  radio:
    value_template: "idle"
    turn_on: { service: script.radio_on }
    turn_off: { service: script.radio_off }
"#;

    #[test]
    fn test_parse_full_platform() {
        let config = PlatformConfig::from_yaml_str(FULL).unwrap();
        assert_eq!(config.platform.as_deref(), Some("template"));

        let slugs: Vec<&String> = config.media_players.keys().collect();
        assert_eq!(slugs, vec!["living_room_tv", "radio"]);

        let tv = &config.media_players["living_room_tv"];
        assert_eq!(tv.name("living_room_tv"), "Living Room TV");
        assert_eq!(tv.source_validation, SourceValidation::Lenient);
        assert_eq!(tv.turn_off.len(), 1);
        assert_eq!(tv.inputs.names(), vec!["hdmi1", "hdmi2"]);
        assert_eq!(tv.templates().count(), 4);

        let ids = tv.dependency_ids("living_room_tv").unwrap().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[1].to_string(), "input_select.tv_source");

        let table = tv.action_table();
        assert!(table.features().contains(
            MediaPlayerEntityFeature::PLAY
                | MediaPlayerEntityFeature::VOLUME_STEP
                | MediaPlayerEntityFeature::SELECT_SOURCE
        ));
        assert!(!table.features().contains(MediaPlayerEntityFeature::PAUSE));
    }

    #[test]
    fn test_defaults() {
        let config = PlatformConfig::from_yaml_str(FULL).unwrap();
        let radio = &config.media_players["radio"];
        assert_eq!(radio.name("radio"), "radio");
        assert_eq!(radio.source_validation, SourceValidation::Strict);
        assert!(radio.inputs.is_empty());
        assert!(radio.entity_ids.is_none());
        assert_eq!(radio.templates().count(), 1);
    }

    #[test]
    fn test_input_templates_alias() {
        let yaml = r#"
media_players:
  tv:
    value_template: "on"
    turn_on: { service: a.b }
    turn_off: { service: a.c }
    input_templates:
      tuner: { service: a.d }
"#;
        let config = PlatformConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.media_players["tv"].inputs.names(), vec!["tuner"]);
    }

    #[test]
    fn test_power_actions_are_required() {
        let yaml = r#"
media_players:
  tv:
    value_template: "on"
    turn_on: { service: a.b }
"#;
        assert!(matches!(
            PlatformConfig::from_yaml_str(yaml),
            Err(ConfigError::ParseYaml(_))
        ));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let yaml = r#"
media_players:
  tv:
    value_template: "on"
    turn_on: { service: a.b }
    turn_off: { service: a.c }
    rewind: { service: a.d }
"#;
        assert!(PlatformConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_invalid_slug_rejected() {
        let yaml = r#"
media_players:
  Living Room:
    value_template: "on"
    turn_on: { service: a.b }
    turn_off: { service: a.c }
"#;
        assert!(matches!(
            PlatformConfig::from_yaml_str(yaml),
            Err(ConfigError::InvalidSlug(slug)) if slug == "Living Room"
        ));
    }

    #[test]
    fn test_platforms_from_configuration() {
        let yaml = r#"
homeassistant:
  name: Home
media_player:
  - platform: cast
    host: 192.168.1.20
  - platform: template
    media_players:
      tv:
        value_template: "on"
        turn_on: { service: a.b }
        turn_off: { service: a.c }
"#;
        let platforms = platforms_from_str(yaml).unwrap();
        assert_eq!(platforms.len(), 1);
        assert!(platforms[0].media_players.contains_key("tv"));

        assert!(platforms_from_str("light:\n  - platform: group\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_load_platforms_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("configuration.yaml");
        let yaml = r#"
media_player:
  platform: template
  media_players:
    radio:
      value_template: idle
      turn_on: { service: a.b }
      turn_off: { service: a.c }
"#;
        fs::write(&path, yaml).unwrap();

        let platforms = load_platforms(&path).unwrap();
        assert_eq!(platforms[0].media_players.len(), 1);

        let missing = load_platforms(dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_invalid_entity_id_rejected() {
        let yaml = r#"
media_players:
  tv:
    value_template: "on"
    turn_on: { service: a.b }
    turn_off: { service: a.c }
    entity_id: [not_an_entity]
"#;
        assert!(matches!(
            PlatformConfig::from_yaml_str(yaml),
            Err(ConfigError::InvalidEntityId { device, .. }) if device == "tv"
        ));
    }
}
