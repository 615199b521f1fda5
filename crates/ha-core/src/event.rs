//! Bus events delivered by the host

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Context;

/// Typed payload of a bus event
pub trait EventData: Clone + Send + Sync + 'static {
    fn event_type() -> &'static str;
}

/// Event type name, e.g. `state_changed`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventType(String);

impl EventType {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self(event_type.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An event fired on the host bus
///
/// Payloads travel as JSON on the bus; [`Event::parse`] recovers the typed
/// payload on the receiving side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T = serde_json::Value> {
    pub event_type: EventType,
    pub data: T,
    pub time_fired: DateTime<Utc>,
    pub context: Context,
}

impl<T> Event<T> {
    pub fn new(event_type: impl Into<EventType>, data: T, context: Context) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            time_fired: Utc::now(),
            context,
        }
    }
}

impl Event<serde_json::Value> {
    /// Wrap a typed payload as a JSON bus event
    pub fn from_data<T: EventData + Serialize>(
        data: &T,
        context: Context,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(T::event_type(), serde_json::to_value(data)?, context))
    }

    /// Decode the payload as `T`, if this event is of `T`'s type
    pub fn parse<T: EventData + serde::de::DeserializeOwned>(&self) -> Option<T> {
        if self.event_type.as_str() != T::event_type() {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }
}
