//! Google Scholar publications

use crate::scholar::ScholarProfile;
use chrono::{DateTime, Utc};
use scholargraph_ontology::{
    ConfigError, EntityPatch, EntityService, FetchOptions, FetchResponse, LinkType, ObjectType,
    OntologyObject, Result, Transport,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GooglePub {
    /// Assigned by the platform on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scholar_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_pub_id: Option<String>,
    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citedby_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cites_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_citations: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl GooglePub {
    /// A new, not yet created publication of `scholar_id`
    pub fn for_scholar(scholar_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            scholar_id: Some(scholar_id.into()),
            created_at: Some(Utc::now()),
            ..Self::default()
        }
    }
}

impl OntologyObject for GooglePub {
    type Key = i64;
    const PRIMARY_KEY_FIELD: &'static str = "id";

    fn primary_key(&self) -> Option<&i64> {
        self.id.as_ref()
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("publication title is required".to_string());
        }
        if let Some(year) = self.pub_year {
            if !(1000..=9999).contains(&year) {
                return Err(format!("publication year {year} is not a four-digit year"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GooglePubs {
    service: EntityService<GooglePub>,
}

impl GooglePubs {
    pub const TYPE_NAME: &'static str = "GooglePubs";
    pub const SLUG: &'static str = "google-pubs";

    /// Every publication belongs to exactly one scholar
    pub const SCHOLAR: LinkType<ScholarProfile> = LinkType::one("ScholarProfile");

    pub fn new(transport: Transport) -> std::result::Result<Self, ConfigError> {
        let object_type = ObjectType::new(Self::TYPE_NAME, Self::SLUG)?;
        Ok(Self {
            service: EntityService::new(object_type, transport),
        })
    }

    pub fn service(&self) -> &EntityService<GooglePub> {
        &self.service
    }

    pub async fn save(&self, pubs: &[GooglePub], access_token: &str) -> Result<Vec<GooglePub>> {
        self.service.save_entities(pubs, access_token).await
    }

    pub async fn update(
        &self,
        id: i64,
        patch: &EntityPatch,
        access_token: &str,
    ) -> Result<GooglePub> {
        self.service.update_entity(&id, patch, access_token).await
    }

    pub async fn delete(&self, id: i64, access_token: &str) -> Result<()> {
        self.service.delete_entity(&id, access_token).await
    }

    pub async fn list(
        &self,
        access_token: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse<GooglePub>> {
        self.service.fetch_entities(access_token, options).await
    }

    pub async fn get(&self, id: i64, access_token: &str) -> Result<GooglePub> {
        self.service.fetch_entity_by_key(&id, access_token).await
    }

    /// The owning scholar; fails if the platform links zero or several
    pub async fn scholar(&self, id: i64, access_token: &str) -> Result<ScholarProfile> {
        self.service
            .fetch_single_linked(&id, Self::SCHOLAR.name(), access_token)
            .await
    }
}
