//! Decoding of the response envelopes the backend wraps its payloads in.
//!
//! Collections arrive in one of three shapes:
//!
//! * paginated: `{"data": {"content": [...]}}`
//! * flat: `{"data": [...]}`
//! * bare: `[...]`
//!
//! Anything else is a [`ServiceError::ShapeError`]. Single entities arrive as
//! `{"data": {...}}`.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ServiceError;

/// Which collection envelope a response used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    Paginated,
    Flat,
    Bare,
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Pulls the item array out of a collection response.
pub fn collection_items(response: Value) -> Result<(EnvelopeKind, Vec<Value>), ServiceError> {
    match response {
        Value::Array(items) => Ok((EnvelopeKind::Bare, items)),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok((EnvelopeKind::Flat, items)),
            Some(Value::Object(mut page)) => match page.remove("content") {
                Some(Value::Array(items)) => Ok((EnvelopeKind::Paginated, items)),
                Some(other) => Err(ServiceError::ShapeError(format!(
                    "data.content is {} rather than an array",
                    describe(&other)
                ))),
                None => Err(ServiceError::ShapeError(
                    "data object has no content array".to_string(),
                )),
            },
            Some(other) => Err(ServiceError::ShapeError(format!(
                "data is {} rather than an array or page",
                describe(&other)
            ))),
            None => Err(ServiceError::ShapeError(
                "object response without a data field".to_string(),
            )),
        },
        other => Err(ServiceError::ShapeError(format!(
            "response is {}",
            describe(&other)
        ))),
    }
}

/// Normalizes any accepted collection envelope into a typed sequence.
///
/// Unknown envelopes yield `ShapeError`. A recognised envelope whose items do
/// not decode yields `SerializationError`.
pub fn normalize<T: DeserializeOwned>(response: Value) -> Result<Vec<T>, ServiceError> {
    let (_, items) = collection_items(response)?;
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(ServiceError::from))
        .collect()
}

/// Unwraps `{"data": T}`. A missing or null `data` is `Ok(None)`.
///
/// A bare object that looks like the entity itself is accepted as well.
pub fn unwrap_data<T: DeserializeOwned>(response: Value) -> Result<Option<T>, ServiceError> {
    match response {
        Value::Null => Ok(None),
        Value::Object(mut map) if map.contains_key("data") => match map.remove("data") {
            None | Some(Value::Null) => Ok(None),
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
        },
        Value::Object(map) if map.contains_key("id") => {
            Ok(Some(serde_json::from_value(Value::Object(map))?))
        }
        Value::Object(_) => Ok(None),
        other => Err(ServiceError::ShapeError(format!(
            "expected an object, got {}",
            describe(&other)
        ))),
    }
}

/// Acknowledgement returned by create, update and status-change calls.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerResult {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl ServerResult {
    /// Reads an acknowledgement, turning an explicit `success: false` into an error.
    pub fn from_response(response: Value, action: &str) -> Result<Self, ServiceError> {
        let result = match response {
            Value::Object(_) => serde_json::from_value::<ServerResult>(response)?,
            other => ServerResult {
                data: other,
                ..Default::default()
            },
        };

        if result.success == Some(false) {
            return Err(ServiceError::ExternalApiError(
                result
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{} was rejected by the server", action)),
            ));
        }
        Ok(result)
    }

    /// Id of the affected entity when the server echoes it back.
    pub fn entity_id(&self) -> Option<super::EntityId> {
        match &self.data {
            Value::Object(map) => map
                .get("id")
                .and_then(|id| serde_json::from_value(id.clone()).ok()),
            Value::String(s) if !s.is_empty() => Some(super::EntityId::from(s.as_str())),
            Value::Number(n) => Some(super::EntityId::from(n.to_string())),
            _ => None,
        }
    }
}
