//! In-memory ontology platform
//!
//! An [`HttpBackend`] that serves the same wire contract as the real platform
//! from process memory: object listing with opaque cursors, key lookups,
//! partial updates, deletes, link traversal and batch create actions. It also
//! counts and captures every request it receives, and can be told to fail the
//! next calls, which makes it the default test double for the client.

use crate::transport::{HttpBackend, Method, WireError, WireRequest, WireResponse};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Page size used when a request carries none
pub const DEFAULT_PLATFORM_PAGE_SIZE: usize = 1000;
pub const MAX_PLATFORM_PAGE_SIZE: usize = 10_000;

const CURSOR_PREFIX: &str = "pt1.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Platform assigns increasing integers
    Integer,
    /// Platform assigns `<type>-<n>` strings
    String,
}

/// Link `name` on a source type: target objects whose `target_field` equals
/// the source object's `source_field`
#[derive(Debug, Clone)]
pub struct LinkDef {
    pub target_type: String,
    pub source_field: String,
    pub target_field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Int(i64),
    Str(String),
}

impl SortKey {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(SortKey::Int),
            Value::String(s) => Some(SortKey::Str(s.clone())),
            _ => None,
        }
    }

    /// Keys arrive as path text; match them against either kind
    fn from_path(raw: &str, kind: KeyKind) -> Option<Self> {
        match kind {
            KeyKind::Integer => raw.parse().ok().map(SortKey::Int),
            KeyKind::String => Some(SortKey::Str(raw.to_string())),
        }
    }
}

#[derive(Debug)]
struct TypeState {
    slug: String,
    primary_key: String,
    key_kind: KeyKind,
    required: Vec<String>,
    objects: BTreeMap<SortKey, Map<String, Value>>,
    next_id: i64,
}

#[derive(Debug, Default)]
struct PlatformState {
    types: HashMap<String, TypeState>,
    links: HashMap<(String, String), LinkDef>,
    injected: VecDeque<Injected>,
}

#[derive(Debug, Clone)]
enum Injected {
    Status(u16, Value),
    Wire(WireError),
}

pub struct InMemoryPlatform {
    ontology_rid: String,
    default_page_size: usize,
    accepted_token: Option<String>,
    state: Mutex<PlatformState>,
    captured: Mutex<Vec<WireRequest>>,
}

impl InMemoryPlatform {
    pub fn new(ontology_rid: &str) -> Self {
        Self {
            ontology_rid: ontology_rid.to_string(),
            default_page_size: DEFAULT_PLATFORM_PAGE_SIZE,
            accepted_token: None,
            state: Mutex::new(PlatformState::default()),
            captured: Mutex::new(Vec::new()),
        }
    }

    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size.max(1);
        self
    }

    /// Answer 401 to any other bearer token
    pub fn with_accepted_token(mut self, token: &str) -> Self {
        self.accepted_token = Some(token.to_string());
        self
    }

    pub fn with_object_type(
        self,
        api_name: &str,
        slug: &str,
        primary_key: &str,
        key_kind: KeyKind,
    ) -> Self {
        self.state.lock().types.insert(
            api_name.to_string(),
            TypeState {
                slug: slug.to_string(),
                primary_key: primary_key.to_string(),
                key_kind,
                required: Vec::new(),
                objects: BTreeMap::new(),
                next_id: 1,
            },
        );
        self
    }

    /// Creates of `api_name` without `field` are rejected with 400
    pub fn with_required_field(self, api_name: &str, field: &str) -> Self {
        if let Some(ty) = self.state.lock().types.get_mut(api_name) {
            ty.required.push(field.to_string());
        }
        self
    }

    pub fn with_link(self, source_type: &str, name: &str, link: LinkDef) -> Self {
        self.state
            .lock()
            .links
            .insert((source_type.to_string(), name.to_string()), link);
        self
    }

    /// Store an object directly, bypassing the request path.
    /// Returns false if the type is unknown or the object has no usable key.
    pub fn insert(&self, api_name: &str, object: Value) -> bool {
        let mut state = self.state.lock();
        let Some(ty) = state.types.get_mut(api_name) else {
            return false;
        };
        let Value::Object(fields) = object else {
            return false;
        };
        let Some(key) = fields.get(&ty.primary_key).and_then(SortKey::from_value) else {
            return false;
        };
        if let SortKey::Int(n) = key {
            ty.next_id = ty.next_id.max(n + 1);
        }
        ty.objects.insert(key, fields);
        true
    }

    /// Every stored object of a type, in key order
    pub fn objects(&self, api_name: &str) -> Vec<Value> {
        self.state
            .lock()
            .types
            .get(api_name)
            .map(|ty| ty.objects.values().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// Answer the next request with `status` and `body` instead of serving it
    pub fn fail_next(&self, status: u16, body: Value) {
        self.state.lock().injected.push_back(Injected::Status(status, body));
    }

    /// Fail the next request without any response
    pub fn drop_next(&self, message: &str, timed_out: bool) {
        self.state.lock().injected.push_back(Injected::Wire(WireError {
            message: message.to_string(),
            timed_out,
        }));
    }

    pub fn request_count(&self) -> usize {
        self.captured.lock().len()
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.captured.lock().clone()
    }

    pub fn last_request(&self) -> Option<WireRequest> {
        self.captured.lock().last().cloned()
    }

    // ------------------------------------------------------------------------
    // Request handling
    // ------------------------------------------------------------------------

    fn handle(&self, request: &WireRequest) -> WireResponse {
        if let Some(expected) = &self.accepted_token {
            if request.authorization != format!("Bearer {expected}") {
                return error(401, "UNAUTHORIZED", "InvalidToken", json!({}));
            }
        }

        let segments: Vec<String> = match request.url.path_segments() {
            Some(segments) => segments.map(percent_decode).collect(),
            None => return error(404, "NOT_FOUND", "RouteNotFound", json!({})),
        };
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let query: HashMap<String, String> = request.url.query_pairs().into_owned().collect();

        let rest = match segments.as_slice() {
            ["api", "v2", "ontologies", rid, rest @ ..] if *rid == self.ontology_rid => rest,
            ["api", "v2", "ontologies", rid, ..] => {
                return error(404, "NOT_FOUND", "OntologyNotFound", json!({ "ontologyRid": rid }))
            }
            _ => return error(404, "NOT_FOUND", "RouteNotFound", json!({})),
        };

        let mut state = self.state.lock();
        match (request.method, rest) {
            (Method::Get, ["objects", ty]) => self.list(&state, ty, &query),
            (Method::Get, ["objects", ty, key]) => get_object(&state, ty, key),
            (Method::Patch, ["objects", ty, key]) => {
                patch_object(&mut state, ty, key, request.body.as_ref())
            }
            (Method::Delete, ["objects", ty, key]) => delete_object(&mut state, ty, key),
            (Method::Get, ["objects", ty, key, "links", link]) => {
                self.list_linked(&state, ty, key, link, &query)
            }
            (Method::Post, ["actions", action, "applyBatch"]) => {
                apply_batch(&mut state, action, request.body.as_ref())
            }
            _ => error(404, "NOT_FOUND", "RouteNotFound", json!({})),
        }
    }

    fn list(
        &self,
        state: &PlatformState,
        ty: &str,
        query: &HashMap<String, String>,
    ) -> WireResponse {
        let Some(type_state) = state.types.get(ty) else {
            return error(404, "NOT_FOUND", "ObjectTypeNotFound", json!({ "objectType": ty }));
        };
        let objects: Vec<&Map<String, Value>> = type_state.objects.values().collect();
        self.page(objects, query)
    }

    fn list_linked(
        &self,
        state: &PlatformState,
        ty: &str,
        key: &str,
        link: &str,
        query: &HashMap<String, String>,
    ) -> WireResponse {
        let Some(source_type) = state.types.get(ty) else {
            return error(404, "NOT_FOUND", "ObjectTypeNotFound", json!({ "objectType": ty }));
        };
        let Some(def) = state.links.get(&(ty.to_string(), link.to_string())) else {
            return error(
                404,
                "NOT_FOUND",
                "LinkTypeNotFound",
                json!({ "objectType": ty, "linkType": link }),
            );
        };
        let Some(source) = SortKey::from_path(key, source_type.key_kind)
            .and_then(|k| source_type.objects.get(&k))
        else {
            return error(
                404,
                "NOT_FOUND",
                "ObjectNotFound",
                json!({ "objectType": ty, "primaryKey": key }),
            );
        };
        let Some(target_type) = state.types.get(&def.target_type) else {
            return error(
                404,
                "NOT_FOUND",
                "ObjectTypeNotFound",
                json!({ "objectType": def.target_type }),
            );
        };

        let wanted = source.get(&def.source_field).cloned().unwrap_or(Value::Null);
        if wanted.is_null() {
            return self.page(Vec::new(), query);
        }
        let linked: Vec<&Map<String, Value>> = target_type
            .objects
            .values()
            .filter(|obj| obj.get(&def.target_field) == Some(&wanted))
            .collect();
        self.page(linked, query)
    }

    fn page(
        &self,
        objects: Vec<&Map<String, Value>>,
        query: &HashMap<String, String>,
    ) -> WireResponse {
        let page_size = match query.get("pageSize") {
            None => self.default_page_size,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if (1..=MAX_PLATFORM_PAGE_SIZE).contains(&n) => n,
                _ => {
                    return error(
                        400,
                        "INVALID_ARGUMENT",
                        "InvalidPageSize",
                        json!({ "pageSize": raw }),
                    );
                }
            },
        };
        let offset = match query.get("pageToken") {
            None => 0,
            Some(raw) => match raw
                .strip_prefix(CURSOR_PREFIX)
                .and_then(|n| n.parse::<usize>().ok())
            {
                Some(offset) => offset,
                None => {
                    return error(
                        400,
                        "INVALID_ARGUMENT",
                        "InvalidPageToken",
                        json!({ "pageToken": raw }),
                    );
                }
            },
        };

        let filtered: Vec<&Map<String, Value>> = match query.get("filter") {
            None => objects,
            Some(filter) => {
                let Some((field, value)) = filter.split_once(':') else {
                    return error(
                        400,
                        "INVALID_ARGUMENT",
                        "InvalidFilter",
                        json!({ "filter": filter }),
                    );
                };
                objects
                    .into_iter()
                    .filter(|obj| obj.get(field).map(render).as_deref() == Some(value))
                    .collect()
            }
        };

        let data: Vec<Value> = filtered
            .iter()
            .skip(offset)
            .take(page_size)
            .map(|obj| Value::Object((*obj).clone()))
            .collect();
        let end = offset + data.len();

        let mut body = json!({ "data": data });
        if end < filtered.len() {
            body["nextPageToken"] = json!(format!("{CURSOR_PREFIX}{end}"));
        }
        ok(200, body)
    }
}

#[async_trait]
impl HttpBackend for InMemoryPlatform {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, WireError> {
        self.captured.lock().push(request.clone());

        let injected = self.state.lock().injected.pop_front();
        match injected {
            Some(Injected::Status(status, body)) => Ok(ok(status, body)),
            Some(Injected::Wire(err)) => Err(err),
            None => Ok(self.handle(&request)),
        }
    }
}

fn lookup<'a>(
    state: &'a PlatformState,
    ty: &str,
    key: &str,
) -> Result<(&'a TypeState, SortKey), WireResponse> {
    let type_state = state
        .types
        .get(ty)
        .ok_or_else(|| error(404, "NOT_FOUND", "ObjectTypeNotFound", json!({ "objectType": ty })))?;
    let sort_key = SortKey::from_path(key, type_state.key_kind)
        .filter(|k| type_state.objects.contains_key(k))
        .ok_or_else(|| {
            error(
                404,
                "NOT_FOUND",
                "ObjectNotFound",
                json!({ "objectType": ty, "primaryKey": key }),
            )
        })?;
    Ok((type_state, sort_key))
}

fn get_object(state: &PlatformState, ty: &str, key: &str) -> WireResponse {
    match lookup(state, ty, key) {
        Ok((type_state, sort_key)) => ok(200, Value::Object(type_state.objects[&sort_key].clone())),
        Err(response) => response,
    }
}

fn patch_object(
    state: &mut PlatformState,
    ty: &str,
    key: &str,
    body: Option<&Value>,
) -> WireResponse {
    let sort_key = match lookup(state, ty, key) {
        Ok((_, sort_key)) => sort_key,
        Err(response) => return response,
    };
    let Some(Value::Object(changes)) = body else {
        return error(400, "INVALID_ARGUMENT", "InvalidPatchBody", json!({}));
    };
    let Some(type_state) = state.types.get_mut(ty) else {
        return error(404, "NOT_FOUND", "ObjectTypeNotFound", json!({ "objectType": ty }));
    };
    if changes.contains_key(&type_state.primary_key) {
        return error(
            400,
            "INVALID_ARGUMENT",
            "PrimaryKeyImmutable",
            json!({ "field": type_state.primary_key }),
        );
    }
    let Some(object) = type_state.objects.get_mut(&sort_key) else {
        return error(
            404,
            "NOT_FOUND",
            "ObjectNotFound",
            json!({ "objectType": ty, "primaryKey": key }),
        );
    };
    for (field, value) in changes {
        object.insert(field.clone(), value.clone());
    }
    ok(200, Value::Object(object.clone()))
}

fn delete_object(state: &mut PlatformState, ty: &str, key: &str) -> WireResponse {
    let sort_key = match lookup(state, ty, key) {
        Ok((_, sort_key)) => sort_key,
        Err(response) => return response,
    };
    if let Some(type_state) = state.types.get_mut(ty) {
        type_state.objects.remove(&sort_key);
    }
    WireResponse {
        status: 204,
        body: String::new(),
    }
}

fn apply_batch(state: &mut PlatformState, action: &str, body: Option<&Value>) -> WireResponse {
    let Some((ty, type_state)) = state
        .types
        .iter_mut()
        .find(|(_, t)| action == format!("create-{}", t.slug))
    else {
        return error(404, "NOT_FOUND", "ActionTypeNotFound", json!({ "actionType": action }));
    };

    let Some(requests) = body.and_then(|b| b.get("requests")).and_then(Value::as_array) else {
        return error(400, "INVALID_ARGUMENT", "InvalidBatchBody", json!({}));
    };
    let return_edits = body
        .and_then(|b| b.pointer("/options/returnEdits"))
        .and_then(Value::as_str)
        == Some("ALL");

    // Validate the whole batch before touching any state
    let mut staged: Vec<(SortKey, Map<String, Value>)> = Vec::with_capacity(requests.len());
    let mut next_id = type_state.next_id;
    for (i, request) in requests.iter().enumerate() {
        let Some(Value::Object(params)) = request.get("parameters") else {
            return error(400, "INVALID_ARGUMENT", "InvalidParameters", json!({ "index": i }));
        };
        let mut params = params.clone();
        if let Some(missing) = type_state.required.iter().find(|f| {
            params
                .get(f.as_str())
                .map_or(true, |v| v.is_null() || v.as_str() == Some(""))
        }) {
            return ok(
                400,
                json!({
                    "errorCode": "INVALID_ARGUMENT",
                    "errorName": "MissingParameterValue",
                    "message": format!("missing required parameter {missing}"),
                    "parameters": { "index": i, "parameter": missing },
                }),
            );
        }

        let key = match params.get(&type_state.primary_key).and_then(SortKey::from_value) {
            Some(key) => key,
            None => {
                let key = match type_state.key_kind {
                    KeyKind::Integer => SortKey::Int(next_id),
                    KeyKind::String => SortKey::Str(format!("{}-{next_id}", type_state.slug)),
                };
                next_id += 1;
                key
            }
        };
        let duplicate =
            type_state.objects.contains_key(&key) || staged.iter().any(|(k, _)| *k == key);
        if duplicate {
            return error(
                409,
                "CONFLICT",
                "ObjectAlreadyExists",
                json!({ "objectType": ty, "primaryKey": key_value(&key) }),
            );
        }
        params.insert(type_state.primary_key.clone(), key_value(&key));
        staged.push((key, params));
    }

    let mut edits = Vec::with_capacity(staged.len());
    for (key, params) in staged {
        if let SortKey::Int(n) = key {
            next_id = next_id.max(n + 1);
        }
        edits.push(json!({ "type": "addObject", "primaryKey": key_value(&key), "objectType": ty }));
        type_state.objects.insert(key, params);
    }
    type_state.next_id = next_id;

    if return_edits {
        let count = edits.len();
        ok(
            200,
            json!({ "edits": { "type": "edits", "edits": edits, "addedObjectCount": count } }),
        )
    } else {
        ok(200, json!({}))
    }
}

fn key_value(key: &SortKey) -> Value {
    match key {
        SortKey::Int(n) => json!(n),
        SortKey::Str(s) => json!(s),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn ok(status: u16, body: Value) -> WireResponse {
    WireResponse {
        status,
        body: body.to_string(),
    }
}

fn error(status: u16, code: &str, name: &str, parameters: Value) -> WireResponse {
    ok(
        status,
        json!({
            "errorCode": code,
            "errorName": name,
            "errorInstanceId": uuid::Uuid::new_v4().to_string(),
            "parameters": parameters,
        }),
    )
}

fn percent_decode(segment: &str) -> String {
    percent_encoding::percent_decode_str(segment)
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn platform() -> InMemoryPlatform {
        InMemoryPlatform::new("ri.onto.1")
            .with_default_page_size(2)
            .with_object_type("Papers", "papers", "id", KeyKind::Integer)
            .with_required_field("Papers", "title")
    }

    fn request(method: Method, path: &str, body: Option<Value>) -> WireRequest {
        WireRequest {
            method,
            url: Url::parse(&format!(
                "https://foundry.test/api/v2/ontologies/ri.onto.1/{path}"
            ))
            .unwrap(),
            authorization: "Bearer tok".to_string(),
            body,
        }
    }

    fn body(response: &WireResponse) -> Value {
        serde_json::from_str(&response.body).unwrap()
    }

    #[tokio::test]
    async fn test_apply_batch_assigns_keys() {
        let platform = platform();
        let batch = json!({
            "requests": [
                {"parameters": {"title": "a"}},
                {"parameters": {"title": "b"}}
            ],
            "options": {"returnEdits": "ALL"}
        });
        let response = platform
            .execute(request(Method::Post, "actions/create-papers/applyBatch", Some(batch)))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        let edits = body(&response)["edits"]["edits"].clone();
        assert_eq!(edits[0]["primaryKey"], 1);
        assert_eq!(edits[1]["primaryKey"], 2);
        assert_eq!(platform.objects("Papers").len(), 2);
    }

    #[tokio::test]
    async fn test_apply_batch_is_all_or_nothing() {
        let platform = platform();
        let batch = json!({
            "requests": [
                {"parameters": {"title": "a"}},
                {"parameters": {"title": ""}}
            ]
        });
        let response = platform
            .execute(request(Method::Post, "actions/create-papers/applyBatch", Some(batch)))
            .await
            .unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(body(&response)["errorName"], "MissingParameterValue");
        assert!(platform.objects("Papers").is_empty());
    }

    #[tokio::test]
    async fn test_listing_pages_with_cursor() {
        let platform = platform();
        for id in 1..=3 {
            assert!(platform.insert("Papers", json!({"id": id, "title": format!("t{id}")})));
        }

        let first = platform.execute(request(Method::Get, "objects/Papers", None)).await.unwrap();
        let first = body(&first);
        assert_eq!(first["data"].as_array().unwrap().len(), 2);
        let cursor = first["nextPageToken"].as_str().unwrap().to_string();

        let second = platform
            .execute(request(Method::Get, &format!("objects/Papers?pageToken={cursor}"), None))
            .await
            .unwrap();
        let second = body(&second);
        assert_eq!(second["data"][0]["id"], 3);
        assert!(second.get("nextPageToken").is_none());
    }

    #[tokio::test]
    async fn test_filter_and_bad_filter() {
        let platform = platform();
        platform.insert("Papers", json!({"id": 1, "title": "x"}));
        platform.insert("Papers", json!({"id": 2, "title": "y"}));

        let hit = platform
            .execute(request(Method::Get, "objects/Papers?filter=title:y", None))
            .await
            .unwrap();
        assert_eq!(body(&hit)["data"][0]["id"], 2);

        let bad = platform
            .execute(request(Method::Get, "objects/Papers?filter=title", None))
            .await
            .unwrap();
        assert_eq!(bad.status, 400);
    }

    #[tokio::test]
    async fn test_patch_and_delete() {
        let platform = platform();
        platform.insert("Papers", json!({"id": 7, "title": "old", "year": 2020}));

        let patched = platform
            .execute(request(Method::Patch, "objects/Papers/7", Some(json!({"title": "new"}))))
            .await
            .unwrap();
        assert_eq!(body(&patched), json!({"id": 7, "title": "new", "year": 2020}));

        let deleted = platform
            .execute(request(Method::Delete, "objects/Papers/7", None))
            .await
            .unwrap();
        assert_eq!(deleted.status, 204);
        let again = platform
            .execute(request(Method::Delete, "objects/Papers/7", None))
            .await
            .unwrap();
        assert_eq!(again.status, 404);
        assert_eq!(body(&again)["errorName"], "ObjectNotFound");
    }

    #[tokio::test]
    async fn test_injected_failures_and_token_check() {
        let platform = platform().with_accepted_token("tok");
        platform.fail_next(503, json!({"errorName": "Unavailable"}));
        platform.drop_next("connection reset", false);

        let first = platform.execute(request(Method::Get, "objects/Papers", None)).await.unwrap();
        assert_eq!(first.status, 503);
        assert!(platform.execute(request(Method::Get, "objects/Papers", None)).await.is_err());

        let mut wrong = request(Method::Get, "objects/Papers", None);
        wrong.authorization = "Bearer other".to_string();
        assert_eq!(platform.execute(wrong).await.unwrap().status, 401);
        assert_eq!(platform.request_count(), 3);
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("a%20b%2Fc"), "a b/c");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }
}
