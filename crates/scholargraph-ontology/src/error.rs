//! Error taxonomy for ontology platform calls
//!
//! Every failure carries enough context (operation, object type, status,
//! platform payload) to be logged and retried outside the client. Absence is
//! never encoded as a successful empty value.

use serde_json::Value;
use std::fmt;

/// Result alias used throughout the client
pub type Result<T> = std::result::Result<T, OntologyError>;

/// The operation a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SaveEntities,
    UpdateEntity,
    DeleteEntity,
    FetchEntities,
    FetchEntityByKey,
    FetchLinkedEntities,
}

impl Operation {
    /// Operations addressed by a primary key collapse 404 into `NotFound`
    pub fn is_key_addressed(self) -> bool {
        matches!(
            self,
            Operation::UpdateEntity | Operation::DeleteEntity | Operation::FetchEntityByKey
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::SaveEntities => "save_entities",
            Operation::UpdateEntity => "update_entity",
            Operation::DeleteEntity => "delete_entity",
            Operation::FetchEntities => "fetch_entities",
            Operation::FetchEntityByKey => "fetch_entity_by_key",
            Operation::FetchLinkedEntities => "fetch_linked_entities",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a failure happened: which operation against which object type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    pub operation: Operation,
    pub object_type: String,
}

impl OperationContext {
    pub fn new(operation: Operation, object_type: impl Into<String>) -> Self {
        Self {
            operation,
            object_type: object_type.into(),
        }
    }
}

impl fmt::Display for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.operation, self.object_type)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OntologyError {
    /// Missing or malformed access token, detected before any network call
    #[error("auth error: {0}")]
    Auth(String),

    /// No platform response at all (DNS, refused connection, timeout)
    #[error("transport error ({context}): {message}")]
    Transport {
        context: OperationContext,
        message: String,
        timed_out: bool,
    },

    /// The platform answered with a non-2xx status
    #[error("platform error ({context}): HTTP {status}: {payload}")]
    Platform {
        context: OperationContext,
        status: u16,
        payload: Value,
    },

    /// 404 on a key-addressed operation
    #[error("not found ({context}): key {key}")]
    NotFound {
        context: OperationContext,
        key: String,
        payload: Value,
    },

    /// Malformed payload, detected locally or reflected from a 400/422.
    /// `status` is `None` for local detection.
    #[error("validation error ({context}): {message}")]
    Validation {
        context: OperationContext,
        message: String,
        status: Option<u16>,
        payload: Value,
    },

    /// A relation declared single-valued returned a different arity
    #[error("cardinality violation ({context}): {relation} expected one record, got {actual}")]
    Cardinality {
        context: OperationContext,
        relation: String,
        actual: String,
    },
}

impl OntologyError {
    pub(crate) fn validation(context: OperationContext, message: impl Into<String>) -> Self {
        OntologyError::Validation {
            context,
            message: message.into(),
            status: None,
            payload: Value::Null,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OntologyError::NotFound { .. })
    }

    /// Failures worth retrying: no response at all, throttling, or a 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            OntologyError::Transport { .. } => true,
            OntologyError::Platform { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// HTTP status returned by the platform, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            OntologyError::Platform { status, .. } => Some(*status),
            OntologyError::NotFound { .. } => Some(404),
            OntologyError::Validation { status, .. } => *status,
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&OperationContext> {
        match self {
            OntologyError::Auth(_) => None,
            OntologyError::Transport { context, .. }
            | OntologyError::Platform { context, .. }
            | OntologyError::NotFound { context, .. }
            | OntologyError::Validation { context, .. }
            | OntologyError::Cardinality { context, .. } => Some(context),
        }
    }
}

/// Configuration could not be assembled
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid platform URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid value for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(op: Operation) -> OperationContext {
        OperationContext::new(op, "GooglePubs")
    }

    #[test]
    fn test_transient_classification() {
        let transport = OntologyError::Transport {
            context: ctx(Operation::FetchEntities),
            message: "connection refused".into(),
            timed_out: false,
        };
        assert!(transport.is_transient());

        let unavailable = OntologyError::Platform {
            context: ctx(Operation::FetchEntities),
            status: 503,
            payload: Value::Null,
        };
        assert!(unavailable.is_transient());

        let forbidden = OntologyError::Platform {
            context: ctx(Operation::FetchEntities),
            status: 403,
            payload: Value::Null,
        };
        assert!(!forbidden.is_transient());
        assert!(!OntologyError::Auth("empty".into()).is_transient());
    }

    #[test]
    fn test_context_in_message() {
        let err = OntologyError::NotFound {
            context: ctx(Operation::DeleteEntity),
            key: "42".into(),
            payload: Value::Null,
        };
        let msg = err.to_string();
        assert!(msg.contains("delete_entity on GooglePubs"));
        assert!(msg.contains("42"));
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_key_addressed_operations() {
        assert!(Operation::FetchEntityByKey.is_key_addressed());
        assert!(Operation::UpdateEntity.is_key_addressed());
        assert!(Operation::DeleteEntity.is_key_addressed());
        assert!(!Operation::FetchEntities.is_key_addressed());
        assert!(!Operation::FetchLinkedEntities.is_key_addressed());
    }
}
