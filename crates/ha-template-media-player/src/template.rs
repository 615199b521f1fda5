//! Template sources and the entities they reference

use ha_core::{EntityId, MATCH_ALL};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

/// A template source string, rendered by the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(String);

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn source(&self) -> &str {
        &self.0
    }

    /// Entity ids this template reads, found by scanning its source
    ///
    /// Recognises `states('x.y')`, `is_state('x.y', ..)`, `state_attr('x.y', ..)`,
    /// `is_state_attr('x.y', ..)`, `has_value('x.y')` and `states.x.y`.
    pub fn referenced_entities(&self) -> BTreeSet<EntityId> {
        let mut found = BTreeSet::new();

        for caps in call_pattern().captures_iter(&self.0) {
            if let Ok(id) = caps[1].parse::<EntityId>() {
                found.insert(id);
            }
        }
        for caps in attribute_pattern().captures_iter(&self.0) {
            if let Ok(id) = EntityId::new(&caps[1], &caps[2]) {
                found.insert(id);
            }
        }

        found
    }
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

fn call_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"\b(?:states|is_state|state_attr|is_state_attr|has_value)\(\s*['"]([a-z0-9_]+\.[a-z0-9_]+)['"]"#,
        )
        .expect("entity call pattern is valid")
    })
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\bstates\.([a-z0-9_]+)\.([a-z0-9_]+)")
            .expect("entity attribute pattern is valid")
    })
}

/// Which entity changes should trigger a refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependencies {
    /// Refresh only when one of these entities changes
    Entities(BTreeSet<EntityId>),
    /// Refresh on every state change
    All,
}

impl Dependencies {
    pub fn matches(&self, entity_id: &EntityId) -> bool {
        match self {
            Dependencies::Entities(ids) => ids.contains(entity_id),
            Dependencies::All => true,
        }
    }
}

impl fmt::Display for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependencies::Entities(ids) => {
                let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                f.write_str(&ids.join(", "))
            }
            Dependencies::All => f.write_str(MATCH_ALL),
        }
    }
}

/// Work out what a template entity depends on
///
/// An explicit `entity_id` list wins. Otherwise the entities referenced by the
/// templates are used, and if none can be found every state change counts.
pub fn extract_dependencies<'a, I>(
    device: &str,
    explicit: Option<&[EntityId]>,
    templates: I,
) -> Dependencies
where
    I: IntoIterator<Item = &'a Template>,
{
    if let Some(ids) = explicit {
        return Dependencies::Entities(ids.iter().cloned().collect());
    }

    let found: BTreeSet<EntityId> = templates
        .into_iter()
        .flat_map(Template::referenced_entities)
        .collect();

    if found.is_empty() {
        tracing::warn!(
            device,
            "Template media player '{}' has no entity ids configured to track nor \
             were we able to extract the entities to track from the templates; \
             it will refresh on every state change",
            device
        );
        Dependencies::All
    } else {
        Dependencies::Entities(found)
    }
}
