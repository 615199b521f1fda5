//! Snapshot of an entity's state

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Context, EntityId};

/// An entity's state value plus attributes, as stored by the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub entity_id: EntityId,

    /// The state value (e.g. "on", "idle", "unavailable")
    pub state: String,

    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    pub last_changed: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,

    /// Context of the write that produced this state
    pub context: Context,
}

impl State {
    pub fn new(
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> Self {
        let now = Utc::now();
        Self {
            entity_id,
            state: state.into(),
            attributes,
            last_changed: now,
            last_updated: now,
            context,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.state == crate::STATE_UNAVAILABLE
    }

    pub fn is_unknown(&self) -> bool {
        self.state == crate::STATE_UNKNOWN
    }

    /// Typed attribute lookup
    pub fn attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        // timestamps and context are bookkeeping, not part of the state
        self.entity_id == other.entity_id
            && self.state == other.state
            && self.attributes == other.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_lookup() {
        let state = State::new(
            EntityId::new("media_player", "tv").unwrap(),
            "idle",
            HashMap::from([("source_list".to_string(), json!(["hdmi1", "hdmi2"]))]),
            Context::new(),
        );

        let sources: Vec<String> = state.attribute("source_list").unwrap();
        assert_eq!(sources, vec!["hdmi1", "hdmi2"]);
        assert_eq!(state.attribute::<String>("source"), None);
        assert!(!state.is_unknown());
        assert!(!state.is_unavailable());
    }

    #[test]
    fn test_equality_ignores_context() {
        let id = EntityId::new("media_player", "tv").unwrap();
        let a = State::new(id.clone(), "on", HashMap::new(), Context::new());
        let b = State::new(id, "on", HashMap::new(), Context::new());
        assert_eq!(a, b);
    }
}
