//! Object types, primary keys and the record contract

use crate::error::{ConfigError, OntologyError, OperationContext, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// A named category of remote entity.
///
/// `api_name` addresses objects (`objects/<api_name>`), `slug` addresses the
/// create action (`actions/create-<slug>`). Both are fixed for the lifetime of
/// a service bound to this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectType {
    api_name: String,
    slug: String,
}

impl ObjectType {
    pub fn new(api_name: &str, slug: &str) -> std::result::Result<Self, ConfigError> {
        let name_ok = !api_name.is_empty()
            && api_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !name_ok {
            return Err(ConfigError::Invalid(format!(
                "object type name {api_name:?} must be non-empty ASCII alphanumeric"
            )));
        }

        let slug_ok = !slug.is_empty()
            && !slug.starts_with('-')
            && !slug.ends_with('-')
            && !slug.contains("--")
            && slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !slug_ok {
            return Err(ConfigError::Invalid(format!(
                "object type slug {slug:?} must be lowercase kebab-case"
            )));
        }

        Ok(Self {
            api_name: api_name.to_string(),
            slug: slug.to_string(),
        })
    }

    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Name of the batch-create action for this type
    pub fn create_action(&self) -> String {
        format!("create-{}", self.slug)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.api_name)
    }
}

/// A platform-assigned primary key: numeric or string depending on type
pub trait ObjectKey:
    Serialize
    + DeserializeOwned
    + fmt::Display
    + fmt::Debug
    + Clone
    + PartialEq
    + Send
    + Sync
    + 'static
{
}

impl ObjectKey for i32 {}
impl ObjectKey for i64 {}
impl ObjectKey for u32 {}
impl ObjectKey for u64 {}
impl ObjectKey for String {}

/// A strongly-typed entity record.
///
/// Records serialize to a flat JSON object. The primary key is `None` only for
/// records that have not been created yet.
pub trait OntologyObject: Serialize + DeserializeOwned + Send + Sync + 'static {
    type Key: ObjectKey;

    /// Wire name of the primary key field
    const PRIMARY_KEY_FIELD: &'static str;

    fn primary_key(&self) -> Option<&Self::Key>;

    /// Local payload checks run before a create request is sent
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Narrow raw platform JSON into a record, failing on shape mismatch
pub fn decode_record<R: DeserializeOwned>(value: Value, context: &OperationContext) -> Result<R> {
    if !value.is_object() {
        return Err(OntologyError::validation(
            context.clone(),
            format!("expected a JSON object record, got {}", json_kind(&value)),
        ));
    }
    serde_json::from_value(value).map_err(|e| {
        OntologyError::validation(context.clone(), format!("record shape mismatch: {e}"))
    })
}

/// Serialize a record into its flat wire object
pub fn encode_record<R: OntologyObject>(
    record: &R,
    context: &OperationContext,
) -> Result<serde_json::Map<String, Value>> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(OntologyError::validation(
            context.clone(),
            format!("record must serialize to a JSON object, got {}", json_kind(&other)),
        )),
        Err(e) => Err(OntologyError::validation(
            context.clone(),
            format!("record failed to serialize: {e}"),
        )),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
