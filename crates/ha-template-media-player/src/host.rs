//! What the player needs from its host
//!
//! Template evaluation, script execution, the state machine and the event bus
//! all belong to the host. The player only sees them through these traits.

use crate::action::ActionSequence;
use crate::error::{RenderError, ScriptError};
use crate::template::Template;
use async_trait::async_trait;
use ha_core::{Context, EntityId, Event};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Renders templates against the host's current entity states
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &Template) -> Result<String, RenderError>;
}

/// Runs action sequences to completion
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run `actions` under `context`, with optional run variables
    async fn run(
        &self,
        actions: &ActionSequence,
        variables: Option<Value>,
        context: &Context,
    ) -> Result<(), ScriptError>;
}

/// Receives the player's state whenever it should be published
pub trait StateWriter: Send + Sync {
    fn write_state(
        &self,
        entity_id: &EntityId,
        state: &str,
        attributes: HashMap<String, Value>,
        context: Context,
    );
}

/// Hands out receivers for bus events of a given type
pub trait EventSource: Send + Sync {
    fn subscribe(&self, event_type: &str) -> broadcast::Receiver<Event<Value>>;
}

/// The host facilities an entity holds on to
#[derive(Clone)]
pub struct Host {
    pub renderer: Arc<dyn TemplateRenderer>,
    pub scripts: Arc<dyn ScriptRunner>,
    pub states: Arc<dyn StateWriter>,
}

impl Host {
    pub fn new(
        renderer: Arc<dyn TemplateRenderer>,
        scripts: Arc<dyn ScriptRunner>,
        states: Arc<dyn StateWriter>,
    ) -> Self {
        Self {
            renderer,
            scripts,
            states,
        }
    }
}
