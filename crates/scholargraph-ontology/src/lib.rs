//! Scholargraph Ontology: Typed Client for Ontology Platform Objects
//!
//! One generic entity service, instantiated per record type, that speaks the
//! platform's object/link/action REST surface. Every call is a live round trip
//! authenticated with a caller-supplied bearer token; nothing is cached.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                     ONTOLOGY CLIENT LAYERS                         │
//! ├────────────────────────────────────────────────────────────────────┤
//! │                                                                    │
//! │   caller (route handler, job)          access token per call       │
//! │        │                                       │                   │
//! │   ┌────▼──────────────┐    ┌───────────────┐   │                   │
//! │   │ EntityService<R>  │───►│ Relation      │   │                   │
//! │   │ create / update / │    │ Resolver      │   │                   │
//! │   │ delete / list /   │    └──────┬────────┘   │                   │
//! │   │ get / traverse    │           │            │                   │
//! │   └────┬──────────────┘           │            │                   │
//! │        │ Paginator ◄── PageSource │            │                   │
//! │   ┌────▼──────────────────────────▼────────────▼──┐                │
//! │   │ Transport: URL building, token check,         │                │
//! │   │ JSON decoding, status classification          │                │
//! │   └────┬──────────────────────────────────────────┘                │
//! │        │ HttpBackend                                               │
//! │   ┌────▼────────────┐        ┌────────────────────┐                │
//! │   │ ReqwestBackend  │   or   │ InMemoryPlatform   │                │
//! │   │ (feature http)  │        │ (tests, local dev) │                │
//! │   └─────────────────┘        └────────────────────┘                │
//! │                                                                    │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - One network effect per call; retries are opt-in via [`retry`]
//! - An invalid access token fails locally before any request is built
//! - Absence is always an error (`NotFound`), never an empty success
//! - Pages are returned as the platform sends them; cursors are opaque

pub mod auth;
pub mod config;
pub mod error;
pub mod memory;
pub mod object;
pub mod pagination;
pub mod patch;
pub mod relations;
pub mod retry;
pub mod service;
pub mod transport;

pub use auth::AccessToken;
pub use config::OntologyConfig;
pub use error::{ConfigError, OntologyError, Operation, OperationContext, Result};
pub use memory::{InMemoryPlatform, KeyKind, LinkDef};
pub use object::{decode_record, encode_record, ObjectKey, ObjectType, OntologyObject};
pub use pagination::{FetchOptions, FetchResponse, PageSource, PageToken, Paginator};
pub use patch::{EntityPatch, PatchError};
pub use relations::{Cardinality, LinkType, Linked, LinkedSource, RelationResolver};
pub use retry::{retry, RetryPolicy};
pub use service::EntityService;
pub use transport::{
    ApiRequest, HttpBackend, Method, Transport, WireError, WireRequest, WireResponse,
};

#[cfg(feature = "http")]
pub use transport::http::ReqwestBackend;
