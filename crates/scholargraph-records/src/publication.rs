//! OpenAlex publications
//!
//! Unlike the other record types these use snake_case field names on the
//! wire, matching how the OpenAlex import writes them.

use scholargraph_ontology::{
    ConfigError, EntityPatch, EntityService, FetchOptions, FetchResponse, ObjectType,
    OntologyObject, Result, Transport,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_citations: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openalex_author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openalex_author_name: Option<String>,
}

impl OntologyObject for Publication {
    type Key = i64;
    const PRIMARY_KEY_FIELD: &'static str = "id";

    fn primary_key(&self) -> Option<&i64> {
        self.id.as_ref()
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("publication title is required".to_string());
        }
        if self.num_citations.is_some_and(|n| n < 0) {
            return Err("num_citations must not be negative".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Publications {
    service: EntityService<Publication>,
}

impl Publications {
    pub const TYPE_NAME: &'static str = "Publications";
    pub const SLUG: &'static str = "publications";

    pub fn new(transport: Transport) -> std::result::Result<Self, ConfigError> {
        let object_type = ObjectType::new(Self::TYPE_NAME, Self::SLUG)?;
        Ok(Self {
            service: EntityService::new(object_type, transport),
        })
    }

    pub fn service(&self) -> &EntityService<Publication> {
        &self.service
    }

    pub async fn save(
        &self,
        publications: &[Publication],
        access_token: &str,
    ) -> Result<Vec<Publication>> {
        tracing::debug!(count = publications.len(), "saving OpenAlex publications");
        self.service.save_entities(publications, access_token).await
    }

    pub async fn update(
        &self,
        id: i64,
        patch: &EntityPatch,
        access_token: &str,
    ) -> Result<Publication> {
        self.service.update_entity(&id, patch, access_token).await
    }

    pub async fn delete(&self, id: i64, access_token: &str) -> Result<()> {
        self.service.delete_entity(&id, access_token).await
    }

    pub async fn list(
        &self,
        access_token: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse<Publication>> {
        self.service.fetch_entities(access_token, options).await
    }

    pub async fn get(&self, id: i64, access_token: &str) -> Result<Publication> {
        self.service.fetch_entity_by_key(&id, access_token).await
    }

    /// All publications imported for one OpenAlex author
    pub async fn by_author(
        &self,
        openalex_author_id: &str,
        access_token: &str,
    ) -> Result<Vec<Publication>> {
        let filter = format!("openalex_author_id:{openalex_author_id}");
        self.service
            .fetch_all_entities(access_token, FetchOptions::new().filter(filter))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snake_case_wire_names() {
        let publication: Publication = serde_json::from_value(json!({
            "id": 4,
            "title": "Graph Rewriting",
            "publication_year": 2021,
            "num_citations": 17,
            "openalex_author_id": "A123"
        }))
        .unwrap();
        assert_eq!(publication.publication_year, Some(2021));
        assert_eq!(publication.openalex_author_id.as_deref(), Some("A123"));
    }

    #[test]
    fn test_validate() {
        let mut publication = Publication {
            title: "t".into(),
            ..Default::default()
        };
        assert!(publication.validate().is_ok());
        publication.num_citations = Some(-1);
        assert!(publication.validate().is_err());
        assert!(Publication::default().validate().is_err());
    }
}
