//! The template media player entity
//!
//! State and attributes come from templates rendered by the host; commands
//! run the configured scripts. The entity keeps the last good value of each
//! attribute between refresh cycles and nothing else.

use crate::action::{ActionSequence, ActionTable};
use crate::config::{MediaPlayerConfig, SourceValidation, PLATFORM};
use crate::error::{ConfigResult, MediaPlayerError, MediaPlayerResult};
use crate::feature::{Command, MediaPlayerEntityFeature};
use crate::host::{Host, ScriptRunner};
use crate::state::{resolve_state, PlayerState};
use crate::template::{extract_dependencies, Dependencies, Template};
use ha_core::{Context, EntityId, STATE_UNAVAILABLE};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Entity domain of template media players
pub const DOMAIN: &str = "media_player";

/// Attributes derived from the optional templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attribute {
    Icon,
    EntityPicture,
    Availability,
    CurrentSource,
}

impl Attribute {
    fn label(self) -> &'static str {
        match self {
            Attribute::Icon => "icon",
            Attribute::EntityPicture => "entity picture",
            Attribute::Availability => "availability",
            Attribute::CurrentSource => "current source",
        }
    }
}

/// Optional templates, rendered in declaration order each cycle
#[derive(Debug, Clone, Default)]
struct AttributeTemplates {
    icon: Option<Template>,
    entity_picture: Option<Template>,
    availability: Option<Template>,
    current_source: Option<Template>,
}

impl AttributeTemplates {
    fn iter(&self) -> impl Iterator<Item = (Attribute, &Template)> {
        [
            (Attribute::Icon, &self.icon),
            (Attribute::EntityPicture, &self.entity_picture),
            (Attribute::Availability, &self.availability),
            (Attribute::CurrentSource, &self.current_source),
        ]
        .into_iter()
        .filter_map(|(attribute, template)| template.as_ref().map(|t| (attribute, t)))
    }
}

/// Last good attribute values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerAttributes {
    pub icon: Option<String>,
    pub entity_picture: Option<String>,
    pub available: bool,
    pub source: Option<String>,
}

impl Default for PlayerAttributes {
    fn default() -> Self {
        Self {
            icon: None,
            entity_picture: None,
            available: true,
            source: None,
        }
    }
}

impl PlayerAttributes {
    /// Reset `attribute` to its entity default; false if it has none
    fn reset(&mut self, attribute: Attribute) -> bool {
        let defaults = Self::default();
        match attribute {
            Attribute::Icon => self.icon = defaults.icon,
            Attribute::EntityPicture => self.entity_picture = defaults.entity_picture,
            Attribute::Availability => self.available = defaults.available,
            Attribute::CurrentSource => return false,
        }
        true
    }
}

/// A media player whose state is computed from templates
pub struct TemplateMediaPlayer {
    entity_id: EntityId,
    unique_id: String,
    name: String,
    state_template: Template,
    templates: AttributeTemplates,
    source_validation: SourceValidation,
    actions: ActionTable,
    dependencies: Dependencies,
    state: Option<PlayerState>,
    attributes: PlayerAttributes,
    context: Option<Context>,
    host: Host,
}

impl TemplateMediaPlayer {
    /// Build the entity for `device` from its configuration
    pub fn new(
        entity_id: EntityId,
        device: &str,
        config: &MediaPlayerConfig,
        host: Host,
    ) -> ConfigResult<Self> {
        let explicit = config.dependency_ids(device)?;
        let dependencies = extract_dependencies(device, explicit.as_deref(), config.templates());
        let actions = config.action_table();
        if actions.supports(Command::VolumeUp) != actions.supports(Command::VolumeDown) {
            warn!(
                "Template media player '{}' only has one volume direction configured; \
                 volume step is advertised for both",
                device
            );
        }

        Ok(Self {
            entity_id,
            unique_id: format!("{PLATFORM}_{device}"),
            name: config.name(device),
            state_template: config.value_template.clone(),
            templates: AttributeTemplates {
                icon: config.icon_template.clone(),
                entity_picture: config.entity_picture_template.clone(),
                availability: config.availability_template.clone(),
                current_source: config.current_source_template.clone(),
            },
            source_validation: config.source_validation,
            actions,
            dependencies,
            state: None,
            attributes: PlayerAttributes::default(),
            context: None,
            host,
        })
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template entities are pushed by state changes, never polled
    pub fn should_poll(&self) -> bool {
        false
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    /// Resolved state; `Unknown` when the last render gave no usable value
    pub fn state(&self) -> PlayerState {
        self.state.unwrap_or(PlayerState::Unknown)
    }

    pub fn is_on(&self) -> bool {
        matches!(self.state, Some(PlayerState::On | PlayerState::Idle))
    }

    pub fn icon(&self) -> Option<&str> {
        self.attributes.icon.as_deref()
    }

    pub fn entity_picture(&self) -> Option<&str> {
        self.attributes.entity_picture.as_deref()
    }

    pub fn available(&self) -> bool {
        self.attributes.available
    }

    pub fn source(&self) -> Option<&str> {
        self.attributes.source.as_deref()
    }

    pub fn source_list(&self) -> Vec<String> {
        self.actions.sources().names()
    }

    pub fn attributes(&self) -> &PlayerAttributes {
        &self.attributes
    }

    pub fn supported_features(&self) -> MediaPlayerEntityFeature {
        self.actions.features()
    }

    pub fn supported_commands(&self) -> Vec<Command> {
        self.actions.supported_commands()
    }

    pub fn supports(&self, command: Command) -> bool {
        self.actions.supports(command)
    }

    /// Context of the last command, attached to state writes
    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// Whether `select_source` shows the requested source before the script
    /// has run, which is the case when no current-source template exists
    pub fn is_source_optimistic(&self) -> bool {
        self.templates.current_source.is_none()
    }

    /// Re-render every template and update the cached values
    ///
    /// Failures never escape: a bad state render leaves the state unknown,
    /// and attribute failures fall back per attribute. A missing referenced
    /// entity ends the cycle early, leaving the remaining attributes as they
    /// were.
    #[instrument(skip(self), fields(entity_id = %self.entity_id))]
    pub fn update(&mut self) {
        self.state = match self.host.renderer.render(&self.state_template) {
            Ok(rendered) => match resolve_state(&rendered) {
                Ok(state) => state,
                Err(err) => {
                    error!("{}", err);
                    None
                }
            },
            Err(err) => {
                error!("Could not render state template {}: {}", self.name, err);
                None
            }
        };

        for (attribute, template) in self.templates.iter() {
            match self.host.renderer.render(template) {
                Ok(rendered) => match attribute {
                    Attribute::Icon => self.attributes.icon = Some(rendered),
                    Attribute::EntityPicture => self.attributes.entity_picture = Some(rendered),
                    Attribute::Availability => {
                        self.attributes.available = rendered.trim().eq_ignore_ascii_case("true")
                    }
                    Attribute::CurrentSource => {
                        let accepted = match self.source_validation {
                            SourceValidation::Strict => self.actions.sources().contains(&rendered),
                            SourceValidation::Lenient => true,
                        };
                        if accepted {
                            self.attributes.source = Some(rendered);
                        } else {
                            debug!(source = %rendered, "Ignoring unknown current source");
                        }
                    }
                },
                Err(err) if err.is_missing_entity() => {
                    warn!(
                        "Could not render {} template {}, the state is unknown.",
                        attribute.label(),
                        self.name
                    );
                    return;
                }
                Err(err) => {
                    if self.attributes.reset(attribute) {
                        debug!(error = %err, "Using default {}", attribute.label());
                    } else {
                        error!(
                            "Could not render {} template {}: {}",
                            attribute.label(),
                            self.name,
                            err
                        );
                    }
                }
            }
        }
    }

    /// State string as published to the host
    pub fn state_value(&self) -> &'static str {
        if self.available() {
            self.state().as_str()
        } else {
            STATE_UNAVAILABLE
        }
    }

    /// Attribute map as published to the host
    pub fn state_attributes(&self) -> HashMap<String, Value> {
        let mut attributes = HashMap::new();
        attributes.insert("friendly_name".to_string(), json!(self.name));
        attributes.insert(
            "supported_features".to_string(),
            json!(self.supported_features().bits()),
        );
        if let Some(icon) = self.icon() {
            attributes.insert("icon".to_string(), json!(icon));
        }
        if let Some(picture) = self.entity_picture() {
            attributes.insert("entity_picture".to_string(), json!(picture));
        }

        if self.available() {
            let sources = self.source_list();
            if !sources.is_empty() {
                attributes.insert("source_list".to_string(), json!(sources));
            }
            if let Some(source) = self.source() {
                attributes.insert("source".to_string(), json!(source));
            }
        }

        attributes
    }

    /// Publish the current state through the host
    pub fn write_state(&self) {
        self.host.states.write_state(
            &self.entity_id,
            self.state_value(),
            self.state_attributes(),
            self.context.clone().unwrap_or_default(),
        );
    }

    pub async fn turn_on(&mut self, context: Context) -> MediaPlayerResult<()> {
        self.begin_command(Command::TurnOn, None, context)?.run().await
    }

    pub async fn turn_off(&mut self, context: Context) -> MediaPlayerResult<()> {
        self.begin_command(Command::TurnOff, None, context)?.run().await
    }

    /// Turn on when off, otherwise turn off
    pub async fn toggle(&mut self, context: Context) -> MediaPlayerResult<()> {
        self.begin_toggle(context)?.run().await
    }

    pub async fn media_play(&mut self, context: Context) -> MediaPlayerResult<()> {
        self.begin_command(Command::Play, None, context)?.run().await
    }

    pub async fn media_pause(&mut self, context: Context) -> MediaPlayerResult<()> {
        self.begin_command(Command::Pause, None, context)?.run().await
    }

    pub async fn media_stop(&mut self, context: Context) -> MediaPlayerResult<()> {
        self.begin_command(Command::Stop, None, context)?.run().await
    }

    pub async fn media_next_track(&mut self, context: Context) -> MediaPlayerResult<()> {
        self.begin_command(Command::Next, None, context)?.run().await
    }

    pub async fn media_previous_track(&mut self, context: Context) -> MediaPlayerResult<()> {
        self.begin_command(Command::Previous, None, context)?.run().await
    }

    pub async fn volume_up(&mut self, context: Context) -> MediaPlayerResult<()> {
        self.begin_command(Command::VolumeUp, None, context)?.run().await
    }

    pub async fn volume_down(&mut self, context: Context) -> MediaPlayerResult<()> {
        self.begin_command(Command::VolumeDown, None, context)?.run().await
    }

    pub async fn mute_volume(&mut self, mute: bool, context: Context) -> MediaPlayerResult<()> {
        self.begin_mute(mute, context)?.run().await
    }

    /// Run the actions bound to `source`
    ///
    /// Without a current-source template the new source is shown and written
    /// before the script runs, so it sticks even if the script fails.
    pub async fn select_source(&mut self, source: &str, context: Context) -> MediaPlayerResult<()> {
        self.begin_select_source(source, context)?.run().await
    }

    /// Check that `command` is configured and record its context
    ///
    /// The returned script no longer borrows the entity, so the caller may
    /// run it while the entity keeps serving other requests.
    pub fn begin_command(
        &mut self,
        command: Command,
        variables: Option<Value>,
        context: Context,
    ) -> MediaPlayerResult<PendingScript> {
        let actions = self
            .actions
            .get(command)
            .ok_or(MediaPlayerError::NotSupported(command))?
            .clone();

        self.context = Some(context.clone());
        debug!(entity_id = %self.entity_id, %command, "Running command script");
        Ok(self.pending(actions, variables, context))
    }

    /// Picks the direction from the state at the time of the call
    pub fn begin_toggle(&mut self, context: Context) -> MediaPlayerResult<PendingScript> {
        let command = if self.state() == PlayerState::Off {
            Command::TurnOn
        } else {
            Command::TurnOff
        };
        self.begin_command(command, None, context)
    }

    /// The mute flag is passed to the script as `is_volume_muted`
    pub fn begin_mute(
        &mut self,
        mute: bool,
        context: Context,
    ) -> MediaPlayerResult<PendingScript> {
        let variables = json!({ "is_volume_muted": mute });
        self.begin_command(Command::Mute, Some(variables), context)
    }

    /// Validate `source` and apply the optimistic write, if any
    pub fn begin_select_source(
        &mut self,
        source: &str,
        context: Context,
    ) -> MediaPlayerResult<PendingScript> {
        if !self.supports(Command::SelectSource) {
            return Err(MediaPlayerError::NotSupported(Command::SelectSource));
        }
        let actions = self
            .actions
            .sources()
            .get(source)
            .ok_or_else(|| MediaPlayerError::UnknownSource(source.to_string()))?
            .clone();

        self.context = Some(context.clone());
        if self.templates.current_source.is_none() {
            self.attributes.source = Some(source.to_string());
            self.write_state();
        }

        debug!(entity_id = %self.entity_id, source, "Selecting source");
        let variables = json!({ "source": source });
        Ok(self.pending(actions, Some(variables), context))
    }

    fn pending(
        &self,
        actions: ActionSequence,
        variables: Option<Value>,
        context: Context,
    ) -> PendingScript {
        PendingScript {
            actions,
            variables,
            context,
            scripts: self.host.scripts.clone(),
        }
    }
}

/// A command script that has been accepted but not yet run
pub struct PendingScript {
    actions: ActionSequence,
    variables: Option<Value>,
    context: Context,
    scripts: Arc<dyn ScriptRunner>,
}

impl PendingScript {
    pub async fn run(self) -> MediaPlayerResult<()> {
        self.scripts
            .run(&self.actions, self.variables, &self.context)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for PendingScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingScript")
            .field("actions", &self.actions)
            .field("variables", &self.variables)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for TemplateMediaPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateMediaPlayer")
            .field("entity_id", &self.entity_id)
            .field("state", &self.state)
            .field("attributes", &self.attributes)
            .field("features", &self.supported_features())
            .finish_non_exhaustive()
    }
}
