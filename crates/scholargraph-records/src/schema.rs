//! The scholar graph schema as one bundle
//!
//! [`ScholarGraph`] builds every adapter over a shared transport.
//! [`in_memory_platform`] registers the same object types and links on an
//! [`InMemoryPlatform`] so the adapters can run without a live platform.

use crate::google_pub::GooglePubs;
use crate::grant::Grants;
use crate::publication::Publications;
use crate::pubmed::PubMedArticles;
use crate::scholar::ScholarProfiles;
use scholargraph_ontology::{ConfigError, InMemoryPlatform, KeyKind, LinkDef, Transport};

#[cfg(feature = "http")]
use scholargraph_ontology::OntologyConfig;

#[derive(Debug, Clone)]
pub struct ScholarGraph {
    pub scholars: ScholarProfiles,
    pub google_pubs: GooglePubs,
    pub pubmed: PubMedArticles,
    pub publications: Publications,
    pub grants: Grants,
}

impl ScholarGraph {
    pub fn new(transport: Transport) -> Result<Self, ConfigError> {
        Ok(Self {
            scholars: ScholarProfiles::new(transport.clone())?,
            google_pubs: GooglePubs::new(transport.clone())?,
            pubmed: PubMedArticles::new(transport.clone())?,
            publications: Publications::new(transport.clone())?,
            grants: Grants::new(transport)?,
        })
    }

    /// Adapters over a reqwest transport for `config`
    #[cfg(feature = "http")]
    pub fn connect(config: OntologyConfig) -> Result<Self, ConfigError> {
        tracing::info!(
            base_url = %config.base_url,
            ontology_rid = %config.ontology_rid,
            "connecting scholar graph adapters"
        );
        Self::new(Transport::http(config)?)
    }

    /// Adapters configured from `FOUNDRY_URL` / `ONTOLOGY_RID`
    #[cfg(feature = "http")]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::connect(OntologyConfig::from_env()?)
    }
}

fn by_scholar_id(target_type: &str) -> LinkDef {
    LinkDef {
        target_type: target_type.to_string(),
        source_field: "scholarId".to_string(),
        target_field: "scholarId".to_string(),
    }
}

/// An in-memory platform with every scholar graph type and link registered
pub fn in_memory_platform(ontology_rid: &str) -> InMemoryPlatform {
    InMemoryPlatform::new(ontology_rid)
        .with_object_type(
            ScholarProfiles::TYPE_NAME,
            ScholarProfiles::SLUG,
            "scholarId",
            KeyKind::String,
        )
        .with_object_type(GooglePubs::TYPE_NAME, GooglePubs::SLUG, "id", KeyKind::Integer)
        .with_object_type(PubMedArticles::TYPE_NAME, PubMedArticles::SLUG, "pmid", KeyKind::Integer)
        .with_object_type(Publications::TYPE_NAME, Publications::SLUG, "id", KeyKind::Integer)
        .with_object_type(Grants::TYPE_NAME, Grants::SLUG, "grantId", KeyKind::String)
        .with_required_field(ScholarProfiles::TYPE_NAME, "name")
        .with_required_field(GooglePubs::TYPE_NAME, "title")
        .with_required_field(PubMedArticles::TYPE_NAME, "title")
        .with_required_field(Publications::TYPE_NAME, "title")
        .with_link(
            ScholarProfiles::TYPE_NAME,
            ScholarProfiles::GOOGLE_PUBS.name(),
            by_scholar_id(GooglePubs::TYPE_NAME),
        )
        .with_link(
            ScholarProfiles::TYPE_NAME,
            ScholarProfiles::PUBMED_ARTICLES.name(),
            by_scholar_id(PubMedArticles::TYPE_NAME),
        )
        .with_link(
            GooglePubs::TYPE_NAME,
            GooglePubs::SCHOLAR.name(),
            by_scholar_id(ScholarProfiles::TYPE_NAME),
        )
        .with_link(
            PubMedArticles::TYPE_NAME,
            PubMedArticles::SCHOLAR.name(),
            by_scholar_id(ScholarProfiles::TYPE_NAME),
        )
}
