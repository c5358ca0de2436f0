//! Relation traversal
//!
//! Follows a named link from one source object to the objects of another
//! type: `objects/<Source>/<key>/links/<Relation>`. The resolver does not
//! know which relations are legal for a type; the platform rejects unknown
//! ones. Results are always a page, whatever the relation's arity, and the
//! arity postcondition is checked only where a caller asks for it.

use crate::error::{Operation, OntologyError, OperationContext, Result};
use crate::object::{decode_record, ObjectType, OntologyObject};
use crate::pagination::{decode_page, FetchOptions, FetchResponse, PageSource};
use crate::transport::{ApiRequest, Method, Transport};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// How many linked objects a relation is documented to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// A typed relation descriptor: name plus target record type and arity
pub struct LinkType<L> {
    name: &'static str,
    cardinality: Cardinality,
    _target: PhantomData<fn() -> L>,
}

impl<L> LinkType<L> {
    pub const fn one(name: &'static str) -> Self {
        Self {
            name,
            cardinality: Cardinality::One,
            _target: PhantomData,
        }
    }

    pub const fn many(name: &'static str) -> Self {
        Self {
            name,
            cardinality: Cardinality::Many,
            _target: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
}

impl<L> Clone for LinkType<L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L> Copy for LinkType<L> {}

impl<L> fmt::Debug for LinkType<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkType")
            .field("name", &self.name)
            .field("cardinality", &self.cardinality)
            .finish()
    }
}

/// Result of following a [`LinkType`]: shape follows the declared arity
#[derive(Debug, Clone, PartialEq)]
pub enum Linked<L> {
    One(L),
    Many(FetchResponse<L>),
}

impl<L> Linked<L> {
    pub fn into_vec(self) -> Vec<L> {
        match self {
            Linked::One(record) => vec![record],
            Linked::Many(page) => page.data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelationResolver {
    transport: Transport,
    source: ObjectType,
}

impl RelationResolver {
    pub fn new(transport: Transport, source: ObjectType) -> Self {
        Self { transport, source }
    }

    pub fn source(&self) -> &ObjectType {
        &self.source
    }

    fn context(&self) -> OperationContext {
        OperationContext::new(Operation::FetchLinkedEntities, self.source.api_name())
    }

    fn request(&self, source_key: &str, relation: &str, options: &FetchOptions) -> ApiRequest {
        let query = options.query_pairs(self.transport.config().default_page_size);
        ApiRequest::new(
            Method::Get,
            [
                "objects",
                self.source.api_name(),
                source_key,
                "links",
                relation,
            ],
        )
        .with_query(query)
        .for_key(source_key)
    }

    /// One page of objects linked to `source_key` through `relation`
    pub async fn resolve<L: OntologyObject>(
        &self,
        source_key: &str,
        relation: &str,
        access_token: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse<L>> {
        self.resolve_raw(source_key, relation, access_token, options).await
    }

    async fn resolve_raw<L: DeserializeOwned>(
        &self,
        source_key: &str,
        relation: &str,
        access_token: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse<L>> {
        let context = self.context();
        if relation.trim().is_empty() {
            return Err(OntologyError::validation(context, "relation name must not be empty"));
        }

        tracing::debug!(
            object_type = %self.source,
            key = source_key,
            relation,
            "resolving linked objects"
        );

        let body = self
            .transport
            .send(&context, self.request(source_key, relation, options), access_token)
            .await?;
        decode_page(body, &context)
    }

    /// The single object linked through a relation documented as one-valued.
    ///
    /// Fails with `NotFound` when nothing is linked and with `Cardinality`
    /// when the platform reports more than one object.
    pub async fn resolve_single<L: OntologyObject>(
        &self,
        source_key: &str,
        relation: &str,
        access_token: &str,
    ) -> Result<L> {
        // Two is enough to tell "exactly one" from "more than one"
        let options = FetchOptions::new().page_size(2);
        let mut page = self
            .resolve_raw::<Value>(source_key, relation, access_token, &options)
            .await?;
        let context = self.context();

        match (page.data.len(), &page.next_page_token) {
            (1, None) => decode_record(page.data.remove(0), &context),
            (0, None) => Err(OntologyError::NotFound {
                context,
                key: source_key.to_string(),
                payload: serde_json::json!({ "relation": relation }),
            }),
            (n, next) => Err(OntologyError::Cardinality {
                context,
                relation: relation.to_string(),
                actual: if next.is_some() {
                    format!("{n} with more pages")
                } else {
                    n.to_string()
                },
            }),
        }
    }

    /// Follow a typed link, honouring its declared arity
    pub async fn follow<L: OntologyObject>(
        &self,
        source_key: &str,
        link: &LinkType<L>,
        access_token: &str,
        options: &FetchOptions,
    ) -> Result<Linked<L>> {
        match link.cardinality() {
            Cardinality::One => self
                .resolve_single(source_key, link.name(), access_token)
                .await
                .map(Linked::One),
            Cardinality::Many => self
                .resolve(source_key, link.name(), access_token, options)
                .await
                .map(Linked::Many),
        }
    }

    /// Page source over one source object's relation, for [`Paginator`](crate::Paginator)
    pub fn pages_of<'a>(&'a self, source_key: &str, relation: &str) -> LinkedSource<'a> {
        LinkedSource {
            resolver: self,
            source_key: source_key.to_string(),
            relation: relation.to_string(),
        }
    }
}

pub struct LinkedSource<'a> {
    resolver: &'a RelationResolver,
    source_key: String,
    relation: String,
}

#[async_trait]
impl<'a, L: OntologyObject> PageSource<L> for LinkedSource<'a> {
    async fn fetch_page(&self, options: &FetchOptions, token: &str) -> Result<FetchResponse<L>> {
        self.resolver
            .resolve(&self.source_key, &self.relation, token, options)
            .await
    }

    fn page_context(&self) -> OperationContext {
        self.resolver.context()
    }
}
