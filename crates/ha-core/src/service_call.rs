//! Service call delivered to an entity

use crate::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a service data field could not be read
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceDataError {
    #[error("missing required field '{0}'")]
    Missing(String),

    #[error("field '{field}' has the wrong type: {reason}")]
    WrongType { field: String, reason: String },
}

/// A call such as `media_player.select_source` with its data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    #[serde(default)]
    pub service_data: Value,
    pub context: Context,
}

impl ServiceCall {
    pub fn new(
        domain: impl Into<String>,
        service: impl Into<String>,
        service_data: Value,
        context: Context,
    ) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            service_data,
            context,
        }
    }

    /// A call without service data
    pub fn simple(domain: impl Into<String>, service: impl Into<String>, context: Context) -> Self {
        Self::new(domain, service, Value::Object(Map::new()), context)
    }

    /// `domain.service`
    pub fn service_id(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }

    /// Whether this call targets `domain`
    pub fn is_for(&self, domain: &str) -> bool {
        self.domain == domain
    }

    /// Read a required field of the service data as `T`
    pub fn require<T: DeserializeOwned>(&self, field: &str) -> Result<T, ServiceDataError> {
        let value = self
            .service_data
            .get(field)
            .filter(|value| !value.is_null())
            .ok_or_else(|| ServiceDataError::Missing(field.to_string()))?;

        T::deserialize(value).map_err(|err| ServiceDataError::WrongType {
            field: field.to_string(),
            reason: err.to_string(),
        })
    }
}
