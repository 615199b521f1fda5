//! Entity ids (`domain.object_id`) and slug helpers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("entity_id must contain exactly one '.' separator")]
    InvalidFormat,

    #[error("invalid domain '{0}': must be a slug without double underscores")]
    InvalidDomain(String),

    #[error("invalid object_id '{0}': must be a slug")]
    InvalidObjectId(String),
}

/// An entity id such as `media_player.living_room_tv`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    domain: String,
    object_id: String,
}

impl EntityId {
    pub fn new(
        domain: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Result<Self, EntityIdError> {
        let domain = domain.into();
        let object_id = object_id.into();

        if !is_valid_slug(&domain) || domain.contains("__") {
            return Err(EntityIdError::InvalidDomain(domain));
        }
        if !is_valid_slug(&object_id) {
            return Err(EntityIdError::InvalidObjectId(object_id));
        }

        Ok(Self { domain, object_id })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }
}

/// Whether `s` is a slug: non-empty, `[a-z0-9_]`, no leading or trailing `_`
pub fn is_valid_slug(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('_')
        && !s.ends_with('_')
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Turn free text into a slug
///
/// Runs of characters outside `[a-z0-9]` collapse into a single `_` and
/// leading/trailing separators are dropped. Text with nothing sluggable in it
/// becomes `"unknown"`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}

/// Build a unique entity id in `domain` for an entity called `name`
///
/// The preferred id is `domain.slugify(name)`; if that is already in
/// `existing`, `_2`, `_3`, ... are appended until a free id is found.
pub fn generate_entity_id<'a, I>(
    domain: &str,
    name: &str,
    existing: I,
) -> Result<EntityId, EntityIdError>
where
    I: IntoIterator<Item = &'a EntityId>,
{
    let taken: Vec<&EntityId> = existing.into_iter().collect();
    let base = slugify(name);

    let preferred = EntityId::new(domain, base.clone())?;
    if !taken.contains(&&preferred) {
        return Ok(preferred);
    }

    let mut suffix = 2;
    loop {
        let candidate = EntityId::new(domain, format!("{base}_{suffix}"))?;
        if !taken.contains(&&candidate) {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((domain, object_id)) if !object_id.contains('.') => Self::new(domain, object_id),
            _ => Err(EntityIdError::InvalidFormat),
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> String {
        id.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.object_id)
    }
}
