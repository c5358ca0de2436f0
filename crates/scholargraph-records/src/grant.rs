//! Research grants
//!
//! Accepts both the platform's camelCase field names and the PascalCase
//! names PubMed uses in its grant lists.

use scholargraph_ontology::{
    ConfigError, EntityPatch, EntityService, FetchOptions, FetchResponse, ObjectType,
    OntologyObject, Result, Transport,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    #[serde(alias = "GrantID")]
    pub grant_id: String,
    #[serde(default, alias = "Agency", skip_serializing_if = "Option::is_none")]
    pub agency: Option<String>,
    #[serde(default, alias = "Country", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, alias = "Acronym", skip_serializing_if = "Option::is_none")]
    pub acronym: Option<String>,
    #[serde(default, alias = "GrantNumber", skip_serializing_if = "Option::is_none")]
    pub grant_number: Option<String>,
    #[serde(default, alias = "ProjectName", skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Article that acknowledged the grant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmid: Option<i64>,
}

impl OntologyObject for Grant {
    type Key = String;
    const PRIMARY_KEY_FIELD: &'static str = "grantId";

    fn primary_key(&self) -> Option<&String> {
        Some(&self.grant_id)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.grant_id.trim().is_empty() {
            return Err("grantId is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Grants {
    service: EntityService<Grant>,
}

impl Grants {
    pub const TYPE_NAME: &'static str = "Grants";
    pub const SLUG: &'static str = "grants";

    pub fn new(transport: Transport) -> std::result::Result<Self, ConfigError> {
        let object_type = ObjectType::new(Self::TYPE_NAME, Self::SLUG)?;
        Ok(Self {
            service: EntityService::new(object_type, transport),
        })
    }

    pub fn service(&self) -> &EntityService<Grant> {
        &self.service
    }

    pub async fn save(&self, grants: &[Grant], access_token: &str) -> Result<Vec<Grant>> {
        self.service.save_entities(grants, access_token).await
    }

    pub async fn update(
        &self,
        grant_id: &str,
        patch: &EntityPatch,
        access_token: &str,
    ) -> Result<Grant> {
        self.service
            .update_entity(&grant_id.to_string(), patch, access_token)
            .await
    }

    pub async fn delete(&self, grant_id: &str, access_token: &str) -> Result<()> {
        self.service
            .delete_entity(&grant_id.to_string(), access_token)
            .await
    }

    pub async fn list(
        &self,
        access_token: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse<Grant>> {
        self.service.fetch_entities(access_token, options).await
    }

    pub async fn get(&self, grant_id: &str, access_token: &str) -> Result<Grant> {
        self.service
            .fetch_entity_by_key(&grant_id.to_string(), access_token)
            .await
    }

    /// Every grant acknowledged by one article
    pub async fn for_article(&self, pmid: i64, access_token: &str) -> Result<Vec<Grant>> {
        self.service
            .fetch_all_entities(access_token, FetchOptions::new().filter(format!("pmid:{pmid}")))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_camel_case() {
        let grant = Grant {
            grant_id: "G-1".into(),
            agency: Some("NSF".into()),
            pmid: Some(9),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&grant).unwrap(),
            json!({"grantId": "G-1", "agency": "NSF", "pmid": 9})
        );
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(serde_json::from_value::<Grant>(json!({"agency": "NSF"})).is_err());
        assert!(Grant::default().validate().is_err());
    }
}
