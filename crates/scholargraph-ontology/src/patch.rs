//! Partial updates
//!
//! A patch lists only the fields to change. Fields that are not in the patch
//! are left alone on the platform; nothing is nulled implicitly.

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityPatch {
    fields: Map<String, Value>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PatchError {
    #[error("patch source must serialize to a JSON object")]
    NotAnObject,
    #[error("patch value for {field} failed to serialize: {message}")]
    Serialize { field: String, message: String },
}

impl EntityPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field` to `value`
    pub fn set(mut self, field: &str, value: impl Serialize) -> Result<Self, PatchError> {
        let value = serde_json::to_value(value).map_err(|e| PatchError::Serialize {
            field: field.to_string(),
            message: e.to_string(),
        })?;
        self.fields.insert(field.to_string(), value);
        Ok(self)
    }

    /// Explicitly null out `field`
    pub fn clear(mut self, field: &str) -> Self {
        self.fields.insert(field.to_string(), Value::Null);
        self
    }

    /// Build from a struct of optional fields. `None` / `null` entries are
    /// dropped so they read as "leave untouched" rather than "clear".
    pub fn from_partial<P: Serialize>(partial: &P) -> Result<Self, PatchError> {
        match serde_json::to_value(partial) {
            Ok(Value::Object(map)) => Ok(Self {
                fields: map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
            }),
            Ok(_) => Err(PatchError::NotAnObject),
            Err(e) => Err(PatchError::Serialize {
                field: String::new(),
                message: e.to_string(),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn touches(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn into_body(self) -> Value {
        Value::Object(self.fields)
    }
}
