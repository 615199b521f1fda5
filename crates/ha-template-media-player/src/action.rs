//! Action table: which script backs which command

use crate::feature::{features_for, Command, MediaPlayerEntityFeature};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// An ordered list of host action definitions
///
/// Configuration may give a single action mapping or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ActionSequence(Vec<Value>);

impl ActionSequence {
    pub fn new(actions: Vec<Value>) -> Self {
        Self(actions)
    }

    pub fn actions(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for ActionSequence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Many(Vec<Value>),
            One(Value),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Many(actions) => Self(actions),
            Raw::One(action) => Self(vec![action]),
        })
    }
}

/// Source name to the actions that switch to it, in configuration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceMap(IndexMap<String, ActionSequence>);

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, actions: ActionSequence) {
        self.0.insert(name.into(), actions);
    }

    pub fn get(&self, name: &str) -> Option<&ActionSequence> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Fixed mapping from command to backing actions
///
/// Built once when the entity is created; there is no way to add or remove
/// actions afterwards, so the advertised capabilities never change.
#[derive(Debug, Clone)]
pub struct ActionTable {
    actions: BTreeMap<Command, ActionSequence>,
    sources: SourceMap,
}

impl ActionTable {
    /// A table with the two mandatory power actions
    pub fn new(turn_on: ActionSequence, turn_off: ActionSequence) -> Self {
        let actions = BTreeMap::from([(Command::TurnOn, turn_on), (Command::TurnOff, turn_off)]);
        Self {
            actions,
            sources: SourceMap::new(),
        }
    }

    /// Add an optional command action
    ///
    /// `SelectSource` is backed by the source map, not by a single action, so
    /// it is ignored here.
    pub fn with(mut self, command: Command, actions: Option<ActionSequence>) -> Self {
        if let Some(actions) = actions {
            if command != Command::SelectSource {
                self.actions.insert(command, actions);
            }
        }
        self
    }

    pub fn with_sources(mut self, sources: SourceMap) -> Self {
        self.sources = sources;
        self
    }

    pub fn get(&self, command: Command) -> Option<&ActionSequence> {
        self.actions.get(&command)
    }

    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    pub fn supports(&self, command: Command) -> bool {
        match command {
            Command::SelectSource => !self.sources.is_empty(),
            other => self.actions.contains_key(&other),
        }
    }

    /// Exactly the commands that have something to run
    pub fn supported_commands(&self) -> Vec<Command> {
        Command::ALL
            .into_iter()
            .filter(|c| self.supports(*c))
            .collect()
    }

    pub fn features(&self) -> MediaPlayerEntityFeature {
        features_for(self.supported_commands())
    }
}
