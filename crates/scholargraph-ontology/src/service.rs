//! Generic entity service
//!
//! One implementation of create / update / delete / list / get / traverse,
//! instantiated once per record type and bound to a single [`ObjectType`]:
//!
//! ```text
//!   EntityService<ScholarProfile> ─┐
//!   EntityService<GooglePub>      ─┼──► Transport ──► HttpBackend ──► platform
//!   EntityService<PubMedArticle>  ─┘        ▲
//!            │                              │
//!            └──► RelationResolver ─────────┘
//! ```
//!
//! The service caches nothing and holds no token: every call is one live
//! round trip with the token the caller passes in.

use crate::auth::AccessToken;
use crate::error::{Operation, OntologyError, OperationContext, Result};
use crate::object::{decode_record, encode_record, ObjectType, OntologyObject};
use crate::pagination::{decode_page, FetchOptions, FetchResponse, PageSource, Paginator};
use crate::patch::EntityPatch;
use crate::relations::{LinkType, Linked, LinkedSource, RelationResolver};
use crate::transport::{ApiRequest, Method, Transport};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::marker::PhantomData;

pub struct EntityService<R> {
    object_type: ObjectType,
    transport: Transport,
    relations: RelationResolver,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for EntityService<R> {
    fn clone(&self) -> Self {
        Self {
            object_type: self.object_type.clone(),
            transport: self.transport.clone(),
            relations: self.relations.clone(),
            _record: PhantomData,
        }
    }
}

impl<R> std::fmt::Debug for EntityService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityService")
            .field("object_type", &self.object_type)
            .finish_non_exhaustive()
    }
}

impl<R: OntologyObject> EntityService<R> {
    pub fn new(object_type: ObjectType, transport: Transport) -> Self {
        let relations = RelationResolver::new(transport.clone(), object_type.clone());
        Self {
            object_type,
            transport,
            relations,
            _record: PhantomData,
        }
    }

    pub fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    pub fn relations(&self) -> &RelationResolver {
        &self.relations
    }

    fn context(&self, operation: Operation) -> OperationContext {
        OperationContext::new(operation, self.object_type.api_name())
    }

    fn object_request(&self, method: Method, key: &R::Key) -> ApiRequest {
        let key = key.to_string();
        let request = ApiRequest::new(
            method,
            ["objects", self.object_type.api_name(), key.as_str()],
        );
        request.for_key(key)
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Bulk-create records through the type's batch create action.
    ///
    /// Returns the records as created, with platform-assigned primary keys
    /// merged in request order. When the platform reports no edits the
    /// submitted records come back unchanged, so platform-assigned keys stay
    /// `None`. Atomicity is whatever the platform's batch action provides;
    /// nothing is compensated client-side.
    pub async fn save_entities(&self, records: &[R], access_token: &str) -> Result<Vec<R>> {
        let context = self.context(Operation::SaveEntities);
        AccessToken::parse(access_token)?;

        let mut parameters = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            record.validate().map_err(|message| {
                OntologyError::validation(context.clone(), format!("record {i}: {message}"))
            })?;
            parameters.push(encode_record(record, &context)?);
        }
        if parameters.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            object_type = %self.object_type,
            count = parameters.len(),
            "saving entities"
        );

        let body = json!({
            "requests": parameters
                .iter()
                .map(|p| json!({ "parameters": p }))
                .collect::<Vec<_>>(),
            "options": { "returnEdits": "ALL" },
        });
        let request = ApiRequest::new(
            Method::Post,
            ["actions".to_string(), self.object_type.create_action(), "applyBatch".to_string()],
        )
        .with_body(body);

        let response = self.transport.send(&context, request, access_token).await?;
        let assigned = added_primary_keys(&response);
        let keys_reported = assigned.is_some();

        let merged = match assigned {
            Some(keys) if keys.len() != parameters.len() => {
                return Err(OntologyError::Validation {
                    context,
                    message: format!(
                        "platform reported {} created objects for {} requests",
                        keys.len(),
                        parameters.len()
                    ),
                    status: None,
                    payload: response,
                })
            }
            Some(keys) => parameters
                .into_iter()
                .zip(keys)
                .map(|(mut fields, key)| {
                    fields.insert(R::PRIMARY_KEY_FIELD.to_string(), key);
                    fields
                })
                .collect::<Vec<_>>(),
            None => parameters,
        };

        let created = merged
            .into_iter()
            .enumerate()
            .map(|(i, fields)| {
                let record: R = decode_record(Value::Object(fields), &context)?;
                if keys_reported && record.primary_key().is_none() {
                    return Err(OntologyError::validation(
                        context.clone(),
                        format!("record {i} has no primary key after creation"),
                    ));
                }
                Ok(record)
            })
            .collect::<Result<Vec<R>>>()?;

        tracing::info!(
            object_type = %self.object_type,
            count = created.len(),
            "entities saved"
        );
        Ok(created)
    }

    /// Apply a partial update; fields absent from `patch` are untouched
    pub async fn update_entity(
        &self,
        key: &R::Key,
        patch: &EntityPatch,
        access_token: &str,
    ) -> Result<R> {
        let context = self.context(Operation::UpdateEntity);
        AccessToken::parse(access_token)?;

        if patch.is_empty() {
            return Err(OntologyError::validation(context, "update patch is empty"));
        }
        if patch.touches(R::PRIMARY_KEY_FIELD) {
            return Err(OntologyError::validation(
                context,
                format!("primary key field {} cannot be updated", R::PRIMARY_KEY_FIELD),
            ));
        }

        tracing::debug!(
            object_type = %self.object_type,
            %key,
            fields = patch.len(),
            "updating entity"
        );

        let request = self
            .object_request(Method::Patch, key)
            .with_body(patch.clone().into_body());
        let body = self.transport.send(&context, request, access_token).await?;
        if body.is_null() {
            return Err(OntologyError::validation(
                context,
                "platform returned no record for the update",
            ));
        }
        let record = self.expect_key(decode_record(body, &context)?, key, &context)?;

        tracing::info!(object_type = %self.object_type, %key, "entity updated");
        Ok(record)
    }

    /// Delete by key. A second delete of the same key fails with `NotFound`.
    pub async fn delete_entity(&self, key: &R::Key, access_token: &str) -> Result<()> {
        let context = self.context(Operation::DeleteEntity);
        tracing::debug!(object_type = %self.object_type, %key, "deleting entity");

        self.transport
            .send(&context, self.object_request(Method::Delete, key), access_token)
            .await?;

        tracing::info!(object_type = %self.object_type, %key, "entity deleted");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Exactly one page of records
    pub async fn fetch_entities(
        &self,
        access_token: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse<R>> {
        let context = self.context(Operation::FetchEntities);
        let query = options.query_pairs(self.transport.config().default_page_size);
        let request =
            ApiRequest::new(Method::Get, ["objects", self.object_type.api_name()])
                .with_query(query);

        let body = self.transport.send(&context, request, access_token).await?;
        let page = decode_page(body, &context)?;
        tracing::debug!(
            object_type = %self.object_type,
            records = page.data.len(),
            more = page.next_page_token.is_some(),
            "fetched page"
        );
        Ok(page)
    }

    /// Single record by key; absence is `NotFound`, never an empty success
    pub async fn fetch_entity_by_key(&self, key: &R::Key, access_token: &str) -> Result<R> {
        let context = self.context(Operation::FetchEntityByKey);
        let body = self
            .transport
            .send(&context, self.object_request(Method::Get, key), access_token)
            .await?;
        self.expect_key(decode_record(body, &context)?, key, &context)
    }

    /// One page of objects linked to `key` through `relation`
    pub async fn fetch_linked_entities<L: OntologyObject>(
        &self,
        key: &R::Key,
        relation: &str,
        access_token: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse<L>> {
        self.relations
            .resolve(&key.to_string(), relation, access_token, options)
            .await
    }

    /// The one object linked through a single-valued relation
    pub async fn fetch_single_linked<L: OntologyObject>(
        &self,
        key: &R::Key,
        relation: &str,
        access_token: &str,
    ) -> Result<L> {
        self.relations
            .resolve_single(&key.to_string(), relation, access_token)
            .await
    }

    /// Follow a typed link descriptor
    pub async fn follow_link<L: OntologyObject>(
        &self,
        key: &R::Key,
        link: &LinkType<L>,
        access_token: &str,
        options: &FetchOptions,
    ) -> Result<Linked<L>> {
        self.relations
            .follow(&key.to_string(), link, access_token, options)
            .await
    }

    // ------------------------------------------------------------------------
    // Pagination helpers
    // ------------------------------------------------------------------------

    /// Lazy page-by-page traversal of this type
    pub fn pages<'a>(
        &'a self,
        access_token: &'a str,
        options: FetchOptions,
    ) -> Paginator<'a, R, Self> {
        Paginator::new(self, access_token, options)
    }

    /// Every record matching `options.filter`, following cursors to the end
    pub async fn fetch_all_entities(
        &self,
        access_token: &str,
        options: FetchOptions,
    ) -> Result<Vec<R>> {
        self.pages(access_token, options).collect_all().await
    }

    /// Page source for one object's relation, to drive a [`Paginator`]
    pub fn linked_source(&self, key: &R::Key, relation: &str) -> LinkedSource<'_> {
        self.relations.pages_of(&key.to_string(), relation)
    }

    /// Every object linked to `key` through `relation`
    pub async fn fetch_all_linked<L: OntologyObject>(
        &self,
        key: &R::Key,
        relation: &str,
        access_token: &str,
        options: FetchOptions,
    ) -> Result<Vec<L>> {
        let source = self.linked_source(key, relation);
        Paginator::<L, _>::new(&source, access_token, options)
            .collect_all()
            .await
    }

    fn expect_key(&self, record: R, key: &R::Key, context: &OperationContext) -> Result<R> {
        match record.primary_key() {
            Some(found) if found == key => Ok(record),
            Some(found) => Err(OntologyError::validation(
                context.clone(),
                format!("requested key {key} but platform returned {found}"),
            )),
            None => Err(OntologyError::validation(
                context.clone(),
                format!("record returned for key {key} has no primary key"),
            )),
        }
    }
}

#[async_trait]
impl<R: OntologyObject> PageSource<R> for EntityService<R> {
    async fn fetch_page(&self, options: &FetchOptions, token: &str) -> Result<FetchResponse<R>> {
        self.fetch_entities(token, options).await
    }

    fn page_context(&self) -> OperationContext {
        self.context(Operation::FetchEntities)
    }
}

/// Primary keys of `addObject` edits in an applyBatch response, if reported
fn added_primary_keys(response: &Value) -> Option<Vec<Value>> {
    let edits = response.get("edits")?.get("edits")?.as_array()?;
    Some(
        edits
            .iter()
            .filter(|edit| edit.get("type").and_then(Value::as_str) == Some("addObject"))
            .filter_map(|edit| edit.get("primaryKey").cloned())
            .collect(),
    )
}
