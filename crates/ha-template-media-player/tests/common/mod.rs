//! Fake host collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use ha_core::events::{StateChangedData, HOMEASSISTANT_START};
use ha_core::{Context, EntityId, Event, State};
use ha_template_media_player::{
    ActionSequence, EventSource, Host, PlatformConfig, RenderError, ScriptError, ScriptRunner,
    StateWriter, Template, TemplateMediaPlayer, TemplateRenderer,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::Layer;

// ============================================================================
// Template renderer
// ============================================================================

/// Renders templates from a table keyed by template source
///
/// Unlisted templates render to their own source text.
#[derive(Default)]
pub struct FakeRenderer {
    outputs: Mutex<HashMap<String, Result<String, RenderError>>>,
    rendered: Mutex<Vec<String>>,
}

impl FakeRenderer {
    pub fn set(&self, template: &str, output: &str) {
        self.outputs
            .lock()
            .unwrap()
            .insert(template.to_string(), Ok(output.to_string()));
    }

    pub fn fail(&self, template: &str, error: RenderError) {
        self.outputs
            .lock()
            .unwrap()
            .insert(template.to_string(), Err(error));
    }

    /// Template sources rendered so far, in order
    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }

    pub fn clear_rendered(&self) {
        self.rendered.lock().unwrap().clear();
    }
}

impl TemplateRenderer for FakeRenderer {
    fn render(&self, template: &Template) -> Result<String, RenderError> {
        self.rendered
            .lock()
            .unwrap()
            .push(template.source().to_string());
        self.outputs
            .lock()
            .unwrap()
            .get(template.source())
            .cloned()
            .unwrap_or_else(|| Ok(template.source().to_string()))
    }
}

// ============================================================================
// State writer
// ============================================================================

#[derive(Debug, Clone)]
pub struct Written {
    pub entity_id: EntityId,
    pub state: String,
    pub attributes: HashMap<String, Value>,
    pub context: Context,
}

#[derive(Default)]
pub struct RecordingWriter {
    writes: Mutex<Vec<Written>>,
}

impl RecordingWriter {
    pub fn writes(&self) -> Vec<Written> {
        self.writes.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Written> {
        self.writes.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

impl StateWriter for RecordingWriter {
    fn write_state(
        &self,
        entity_id: &EntityId,
        state: &str,
        attributes: HashMap<String, Value>,
        context: Context,
    ) {
        self.writes.lock().unwrap().push(Written {
            entity_id: entity_id.clone(),
            state: state.to_string(),
            attributes,
            context,
        });
    }
}

// ============================================================================
// Script runner
// ============================================================================

#[derive(Debug, Clone)]
pub struct Run {
    pub actions: ActionSequence,
    pub variables: Option<Value>,
    pub context: Context,
    /// `source` attribute of the last state write when the run started
    pub written_source: Option<Value>,
}

/// Records every run; optionally fails them
pub struct RecordingRunner {
    writer: Arc<RecordingWriter>,
    runs: Mutex<Vec<Run>>,
    failure: Mutex<Option<String>>,
}

impl RecordingRunner {
    pub fn new(writer: Arc<RecordingWriter>) -> Self {
        Self {
            writer,
            runs: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn runs(&self) -> Vec<Run> {
        self.runs.lock().unwrap().clone()
    }

    /// First `service` of each run, in order
    pub fn services(&self) -> Vec<String> {
        self.runs()
            .iter()
            .filter_map(|run| run.actions.actions().first())
            .filter_map(|action| action.get("service").and_then(Value::as_str))
            .map(String::from)
            .collect()
    }
}

#[async_trait]
impl ScriptRunner for RecordingRunner {
    async fn run(
        &self,
        actions: &ActionSequence,
        variables: Option<Value>,
        context: &Context,
    ) -> Result<(), ScriptError> {
        let written_source = self
            .writer
            .last()
            .and_then(|written| written.attributes.get("source").cloned());
        self.runs.lock().unwrap().push(Run {
            actions: actions.clone(),
            variables,
            context: context.clone(),
            written_source,
        });

        match self.failure.lock().unwrap().clone() {
            Some(message) => Err(ScriptError(message)),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Event bus
// ============================================================================

/// One broadcast channel per event type
pub struct TestBus {
    channels: Mutex<HashMap<String, broadcast::Sender<Event<Value>>>>,
    capacity: usize,
}

impl Default for TestBus {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

impl TestBus {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    fn sender(&self, event_type: &str) -> broadcast::Sender<Event<Value>> {
        self.channels
            .lock()
            .unwrap()
            .entry(event_type.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    pub fn fire(&self, event: Event<Value>) {
        let _ = self.sender(event.event_type.as_str()).send(event);
    }

    pub fn fire_start(&self) {
        self.fire(Event::new(HOMEASSISTANT_START, Value::Null, Context::new()));
    }

    pub fn fire_state_changed(&self, entity_id: &str, state: &str) {
        let entity_id: EntityId = entity_id.parse().unwrap();
        let data = StateChangedData {
            entity_id: entity_id.clone(),
            old_state: None,
            new_state: Some(State::new(entity_id, state, HashMap::new(), Context::new())),
        };
        self.fire(Event::from_data(&data, Context::new()).unwrap());
    }

    /// Drop every sender so receivers see the bus close
    pub fn close(&self) {
        self.channels.lock().unwrap().clear();
    }
}

impl EventSource for TestBus {
    fn subscribe(&self, event_type: &str) -> broadcast::Receiver<Event<Value>> {
        self.sender(event_type).subscribe()
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub struct Fakes {
    pub renderer: Arc<FakeRenderer>,
    pub runner: Arc<RecordingRunner>,
    pub writer: Arc<RecordingWriter>,
    pub host: Host,
}

impl Fakes {
    pub fn new() -> Self {
        let renderer = Arc::new(FakeRenderer::default());
        let writer = Arc::new(RecordingWriter::default());
        let runner = Arc::new(RecordingRunner::new(writer.clone()));
        let host = Host::new(renderer.clone(), runner.clone(), writer.clone());
        Self {
            renderer,
            runner,
            writer,
            host,
        }
    }
}

/// Build the single player described by a `media_players` YAML block
pub fn player(yaml: &str) -> (TemplateMediaPlayer, Fakes) {
    let fakes = Fakes::new();
    let player = player_on(yaml, fakes.host.clone());
    (player, fakes)
}

/// Same as [`player`] but wired to a caller-built host
pub fn player_on(yaml: &str, host: Host) -> TemplateMediaPlayer {
    let config = PlatformConfig::from_yaml_str(yaml).unwrap();
    let (device, player_config) = config.media_players.first().unwrap();
    let entity_id = EntityId::new("media_player", device.clone()).unwrap();
    TemplateMediaPlayer::new(entity_id, device, player_config, host).unwrap()
}

// ============================================================================
// Log capture
// ============================================================================

/// Collects the message of every tracing event
#[derive(Clone, Default)]
pub struct LogCapture {
    records: Arc<Mutex<Vec<(Level, String)>>>,
}

impl LogCapture {
    /// Install a capturing subscriber for the current thread
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn at(&self, level: Level) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.at(Level::ERROR)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.at(Level::WARN)
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: LayerContext<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.records
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.0));
    }
}
