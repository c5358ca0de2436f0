//! Transport layer
//!
//! [`Transport`] turns an [`ApiRequest`] into exactly one call on an
//! [`HttpBackend`]: it checks the token, builds the URL under the ontology
//! namespace, attaches bearer auth, and normalizes non-2xx responses into
//! typed failures. It never retries.

#[cfg(feature = "http")]
pub mod http;

use crate::auth::AccessToken;
use crate::config::OntologyConfig;
use crate::error::{OntologyError, OperationContext, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Wire seam
// ============================================================================

/// A fully-built HTTP request, ready to go on the wire
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    /// Complete `Authorization` header value
    pub authorization: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    pub body: String,
}

/// The request never produced a response
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct WireError {
    pub message: String,
    pub timed_out: bool,
}

/// Executes one HTTP exchange. The only place the client touches the network.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn execute(&self, request: WireRequest) -> std::result::Result<WireResponse, WireError>;
}

// ============================================================================
// Requests
// ============================================================================

/// A request relative to the ontology namespace
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path segments after `api/v2/ontologies/<rid>`, unencoded
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Primary key addressed by the request, reported on 404
    pub key: Option<String>,
}

impl ApiRequest {
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
            key: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn for_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Sends ontology requests through a configured backend.
///
/// Holds only immutable configuration and a shared backend handle, so one
/// instance can serve any number of concurrent callers.
#[derive(Clone)]
pub struct Transport {
    config: Arc<OntologyConfig>,
    backend: Arc<dyn HttpBackend>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.config.base_url.as_str())
            .field("ontology_rid", &self.config.ontology_rid)
            .finish_non_exhaustive()
    }
}

impl Transport {
    pub fn new(config: OntologyConfig, backend: Arc<dyn HttpBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
        }
    }

    /// Transport over the reqwest backend
    #[cfg(feature = "http")]
    pub fn http(config: OntologyConfig) -> std::result::Result<Self, crate::error::ConfigError> {
        let backend = http::ReqwestBackend::new(config.request_timeout)?;
        Ok(Self::new(config, Arc::new(backend)))
    }

    pub fn config(&self) -> &OntologyConfig {
        &self.config
    }

    /// Absolute URL for a namespace-relative request
    pub fn url_for(&self, request: &ApiRequest) -> Url {
        let mut url = self.config.base_url.clone();
        {
            // http(s) URLs always have a path; checked when the config was built
            if let Ok(mut path) = url.path_segments_mut() {
                path.pop_if_empty();
                path.extend(self.config.namespace_segments());
                path.extend(request.segments.iter().map(String::as_str));
            }
        }
        if !request.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        url
    }

    /// Send one request and return the parsed JSON body of a 2xx response
    pub async fn send(
        &self,
        context: &OperationContext,
        request: ApiRequest,
        access_token: &str,
    ) -> Result<Value> {
        let token = AccessToken::parse(access_token)?;
        let url = self.url_for(&request);

        tracing::debug!(
            method = %request.method,
            path = url.path(),
            operation = %context.operation,
            object_type = %context.object_type,
            "sending ontology request"
        );

        let response = self
            .backend
            .execute(WireRequest {
                method: request.method,
                url,
                authorization: token.header_value(),
                body: request.body,
            })
            .await
            .map_err(|e| OntologyError::Transport {
                context: context.clone(),
                message: e.message,
                timed_out: e.timed_out,
            })?;

        if (200..300).contains(&response.status) {
            return parse_success_body(&response.body, response.status, context);
        }

        let payload = parse_error_body(&response.body);
        tracing::warn!(
            status = response.status,
            operation = %context.operation,
            object_type = %context.object_type,
            "ontology platform returned an error"
        );
        Err(classify_failure(
            context,
            response.status,
            payload,
            request.key,
        ))
    }
}

fn parse_success_body(body: &str, status: u16, context: &OperationContext) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| OntologyError::Validation {
        context: context.clone(),
        message: format!("platform returned a non-JSON body: {e}"),
        status: Some(status),
        payload: Value::String(body.to_string()),
    })
}

fn parse_error_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Human-readable message from a platform error payload
fn platform_message(payload: &Value) -> String {
    ["message", "errorName", "error", "errorCode"]
        .iter()
        .find_map(|field| payload.get(*field).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| match payload {
            Value::Null => "no details".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

fn classify_failure(
    context: &OperationContext,
    status: u16,
    payload: Value,
    key: Option<String>,
) -> OntologyError {
    match status {
        404 if context.operation.is_key_addressed() => OntologyError::NotFound {
            context: context.clone(),
            key: key.unwrap_or_default(),
            payload,
        },
        400 | 422 => OntologyError::Validation {
            context: context.clone(),
            message: platform_message(&payload),
            status: Some(status),
            payload,
        },
        _ => OntologyError::Platform {
            context: context.clone(),
            status,
            payload,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Operation;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Replies with a fixed response and remembers what it was asked
    struct Canned {
        status: u16,
        body: &'static str,
        seen: Mutex<Vec<WireRequest>>,
    }

    impl Canned {
        fn new(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpBackend for Canned {
        async fn execute(
            &self,
            request: WireRequest,
        ) -> std::result::Result<WireResponse, WireError> {
            self.seen.lock().push(request);
            Ok(WireResponse {
                status: self.status,
                body: self.body.to_string(),
            })
        }
    }

    struct Unreachable;

    #[async_trait]
    impl HttpBackend for Unreachable {
        async fn execute(
            &self,
            _request: WireRequest,
        ) -> std::result::Result<WireResponse, WireError> {
            Err(WireError {
                message: "operation timed out".to_string(),
                timed_out: true,
            })
        }
    }

    fn transport(backend: Arc<dyn HttpBackend>) -> Transport {
        let config = OntologyConfig::new("https://stack.example.com/", "ri.onto.1").unwrap();
        Transport::new(config, backend)
    }

    fn ctx(op: Operation) -> OperationContext {
        OperationContext::new(op, "GooglePubs")
    }

    #[test]
    fn test_url_building_encodes_segments_and_query() {
        let t = transport(Canned::new(200, "{}"));
        let request = ApiRequest::new(Method::Get, ["objects", "GooglePubs", "a b/c"])
            .with_query(vec![
                ("pageSize".into(), "10".into()),
                ("filter".into(), "title:x y".into()),
            ]);
        let url = t.url_for(&request);
        assert_eq!(
            url.path(),
            "/api/v2/ontologies/ri.onto.1/objects/GooglePubs/a%20b%2Fc"
        );
        assert_eq!(url.query(), Some("pageSize=10&filter=title%3Ax+y"));
    }

    #[tokio::test]
    async fn test_bearer_header_attached() {
        let backend = Canned::new(200, r#"{"id": 1}"#);
        let t = transport(backend.clone());
        let body = t
            .send(
                &ctx(Operation::FetchEntityByKey),
                ApiRequest::new(Method::Get, ["objects", "GooglePubs", "1"]),
                "tok-123",
            )
            .await
            .unwrap();
        assert_eq!(body, json!({"id": 1}));

        let seen = backend.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].authorization, "Bearer tok-123");
        assert_eq!(seen[0].method, Method::Get);
    }

    #[tokio::test]
    async fn test_empty_token_never_reaches_backend() {
        let backend = Canned::new(200, "{}");
        let t = transport(backend.clone());
        let err = t
            .send(
                &ctx(Operation::FetchEntities),
                ApiRequest::new(Method::Get, ["objects", "GooglePubs"]),
                "",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OntologyError::Auth(_)));
        assert!(backend.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_platform_401_is_not_local_auth() {
        let t = transport(Canned::new(401, r#"{"errorCode": "UNAUTHORIZED"}"#));
        let err = t
            .send(
                &ctx(Operation::FetchEntities),
                ApiRequest::new(Method::Get, ["objects", "GooglePubs"]),
                "expired",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OntologyError::Platform { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_404_classification_depends_on_operation() {
        let body = r#"{"errorCode": "NOT_FOUND", "errorName": "ObjectNotFound"}"#;

        let t = transport(Canned::new(404, body));
        let err = t
            .send(
                &ctx(Operation::FetchEntityByKey),
                ApiRequest::new(Method::Get, ["objects", "GooglePubs", "7"]).for_key("7"),
                "tok",
            )
            .await
            .unwrap_err();
        match err {
            OntologyError::NotFound { key, payload, .. } => {
                assert_eq!(key, "7");
                assert_eq!(payload["errorName"], "ObjectNotFound");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }

        let err = t
            .send(
                &ctx(Operation::FetchLinkedEntities),
                ApiRequest::new(Method::Get, ["objects", "GooglePubs", "7", "links", "Nope"]),
                "tok",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OntologyError::Platform { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_400_reflected_as_validation() {
        let t = transport(Canned::new(400, r#"{"message": "title is required"}"#));
        let err = t
            .send(
                &ctx(Operation::SaveEntities),
                ApiRequest::new(Method::Post, ["actions", "create-google-pubs", "applyBatch"]),
                "tok",
            )
            .await
            .unwrap_err();
        match err {
            OntologyError::Validation { message, status, .. } => {
                assert_eq!(message, "title is required");
                assert_eq!(status, Some(400));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body_kept_as_string() {
        let t = transport(Canned::new(502, "Bad Gateway"));
        let err = t
            .send(
                &ctx(Operation::FetchEntities),
                ApiRequest::new(Method::Get, ["objects", "GooglePubs"]),
                "tok",
            )
            .await
            .unwrap_err();
        match err {
            OntologyError::Platform { status, payload, .. } => {
                assert_eq!(status, 502);
                assert_eq!(payload, Value::String("Bad Gateway".into()));
            }
            other => panic!("expected Platform, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_success_body_is_null() {
        let t = transport(Canned::new(204, ""));
        let body = t
            .send(
                &ctx(Operation::DeleteEntity),
                ApiRequest::new(Method::Delete, ["objects", "GooglePubs", "1"]),
                "tok",
            )
            .await
            .unwrap();
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn test_backend_failure_is_transport_error() {
        let t = transport(Arc::new(Unreachable));
        let err = t
            .send(
                &ctx(Operation::FetchEntities),
                ApiRequest::new(Method::Get, ["objects", "GooglePubs"]),
                "tok",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OntologyError::Transport { timed_out: true, .. }));
        assert!(err.is_transient());
    }
}
