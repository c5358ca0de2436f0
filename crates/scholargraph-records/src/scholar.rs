//! Scholar profiles
//!
//! A researcher's Google Scholar profile plus the summary metrics the
//! platform keeps for it. Keyed by the Google Scholar id, which is also the
//! join field for the scholar's publications.

use crate::google_pub::GooglePub;
use crate::pubmed::PubMedArticle;
use chrono::{DateTime, Utc};
use scholargraph_ontology::{
    ConfigError, EntityPatch, EntityService, FetchOptions, FetchResponse, LinkType, ObjectType,
    OntologyError, OntologyObject, Operation, OperationContext, Result, Transport,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScholarProfile {
    pub scholar_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<String>,
    #[serde(flatten)]
    pub metrics: ScholarMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_training_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Citation metrics; also the partial-update shape for a metrics refresh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScholarMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citedby: Option<i64>,
    #[serde(default, rename = "citedby5y", skip_serializing_if = "Option::is_none")]
    pub citedby_5y: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hindex: Option<i64>,
    #[serde(default, rename = "hindex5y", skip_serializing_if = "Option::is_none")]
    pub hindex_5y: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i10index: Option<i64>,
    #[serde(default, rename = "i10index5y", skip_serializing_if = "Option::is_none")]
    pub i10index_5y: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pub: Option<i64>,
}

impl ScholarMetrics {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ScholarProfile {
    pub fn new(scholar_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scholar_id: scholar_id.into(),
            name: name.into(),
            full_name: None,
            email_domain: None,
            affiliation: None,
            homepage: None,
            interests: None,
            metrics: ScholarMetrics::default(),
            method: None,
            summary_training_start: None,
            created_at: Some(Utc::now()),
        }
    }

    /// Interests as stored: one comma-separated string
    pub fn interest_list(&self) -> Vec<&str> {
        self.interests
            .as_deref()
            .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}

impl OntologyObject for ScholarProfile {
    type Key = String;
    const PRIMARY_KEY_FIELD: &'static str = "scholarId";

    fn primary_key(&self) -> Option<&String> {
        Some(&self.scholar_id)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.scholar_id.trim().is_empty() {
            return Err("scholarId is required".to_string());
        }
        if self.name.trim().is_empty() {
            return Err(format!("scholar {} has no name", self.scholar_id));
        }
        Ok(())
    }
}

// ============================================================================
// Adapter
// ============================================================================

#[derive(Debug, Clone)]
pub struct ScholarProfiles {
    service: EntityService<ScholarProfile>,
}

impl ScholarProfiles {
    pub const TYPE_NAME: &'static str = "ScholarProfiles";
    pub const SLUG: &'static str = "scholar-profiles";

    pub const GOOGLE_PUBS: LinkType<GooglePub> = LinkType::many("GooglePubs");
    pub const PUBMED_ARTICLES: LinkType<PubMedArticle> = LinkType::many("PalantirPubMeds");

    pub fn new(transport: Transport) -> std::result::Result<Self, ConfigError> {
        let object_type = ObjectType::new(Self::TYPE_NAME, Self::SLUG)?;
        Ok(Self {
            service: EntityService::new(object_type, transport),
        })
    }

    pub fn service(&self) -> &EntityService<ScholarProfile> {
        &self.service
    }

    pub async fn save(
        &self,
        scholars: &[ScholarProfile],
        access_token: &str,
    ) -> Result<Vec<ScholarProfile>> {
        self.service.save_entities(scholars, access_token).await
    }

    /// Save a single profile and return it as stored
    pub async fn save_one(
        &self,
        scholar: ScholarProfile,
        access_token: &str,
    ) -> Result<ScholarProfile> {
        let name = scholar.name.clone();
        let mut saved = self.service.save_entities(&[scholar], access_token).await?;
        tracing::info!(scholar = %name, "scholar profile saved");
        saved.pop().ok_or_else(|| OntologyError::Validation {
            context: OperationContext::new(Operation::SaveEntities, Self::TYPE_NAME),
            message: "platform created no record".to_string(),
            status: None,
            payload: serde_json::Value::Null,
        })
    }

    pub async fn update(
        &self,
        scholar_id: &str,
        patch: &EntityPatch,
        access_token: &str,
    ) -> Result<ScholarProfile> {
        self.service
            .update_entity(&scholar_id.to_string(), patch, access_token)
            .await
    }

    /// Overwrite only the metrics that are `Some`
    pub async fn update_metrics(
        &self,
        scholar_id: &str,
        metrics: &ScholarMetrics,
        access_token: &str,
    ) -> Result<ScholarProfile> {
        let patch = EntityPatch::from_partial(metrics).map_err(|e| OntologyError::Validation {
            context: OperationContext::new(Operation::UpdateEntity, Self::TYPE_NAME),
            message: e.to_string(),
            status: None,
            payload: serde_json::Value::Null,
        })?;
        self.update(scholar_id, &patch, access_token).await
    }

    pub async fn delete(&self, scholar_id: &str, access_token: &str) -> Result<()> {
        self.service
            .delete_entity(&scholar_id.to_string(), access_token)
            .await
    }

    pub async fn list(
        &self,
        access_token: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse<ScholarProfile>> {
        self.service.fetch_entities(access_token, options).await
    }

    pub async fn get(&self, scholar_id: &str, access_token: &str) -> Result<ScholarProfile> {
        self.service
            .fetch_entity_by_key(&scholar_id.to_string(), access_token)
            .await
    }

    pub async fn google_pubs(
        &self,
        scholar_id: &str,
        access_token: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse<GooglePub>> {
        self.service
            .fetch_linked_entities(
                &scholar_id.to_string(),
                Self::GOOGLE_PUBS.name(),
                access_token,
                options,
            )
            .await
    }

    pub async fn pubmed_articles(
        &self,
        scholar_id: &str,
        access_token: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse<PubMedArticle>> {
        self.service
            .fetch_linked_entities(
                &scholar_id.to_string(),
                Self::PUBMED_ARTICLES.name(),
                access_token,
                options,
            )
            .await
    }

    /// Every Google Scholar publication of a scholar, across all pages
    pub async fn all_google_pubs(
        &self,
        scholar_id: &str,
        access_token: &str,
    ) -> Result<Vec<GooglePub>> {
        self.service
            .fetch_all_linked(
                &scholar_id.to_string(),
                Self::GOOGLE_PUBS.name(),
                access_token,
                FetchOptions::new(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        let mut scholar = ScholarProfile::new("abcDEF1", "Ada Lovelace");
        scholar.created_at = None;
        scholar.metrics.citedby_5y = Some(40);
        scholar.metrics.hindex = Some(12);

        let value = serde_json::to_value(&scholar).unwrap();
        assert_eq!(
            value,
            json!({"scholarId": "abcDEF1", "name": "Ada Lovelace", "citedby5y": 40, "hindex": 12})
        );

        let back: ScholarProfile = serde_json::from_value(value).unwrap();
        assert_eq!(back, scholar);
    }

    #[test]
    fn test_decodes_platform_record() {
        let scholar: ScholarProfile = serde_json::from_value(json!({
            "scholarId": "x1",
            "name": "Grace Hopper",
            "emailDomain": "navy.mil",
            "i10index5y": 3,
            "totalPub": 80,
            "interests": "compilers, , languages",
            "createdAt": "2024-02-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(scholar.metrics.i10index_5y, Some(3));
        assert_eq!(scholar.metrics.total_pub, Some(80));
        assert_eq!(scholar.interest_list(), vec!["compilers", "languages"]);
        assert_eq!(scholar.created_at.map(|t| t.timestamp()), Some(1_706_781_600));
    }

    #[test]
    fn test_validate() {
        assert!(ScholarProfile::new("id", "name").validate().is_ok());
        assert!(ScholarProfile::new(" ", "name").validate().is_err());
        assert!(ScholarProfile::new("id", "").validate().is_err());
    }

    #[test]
    fn test_metrics_patch_drops_unset_fields() {
        let metrics = ScholarMetrics {
            hindex: Some(20),
            ..Default::default()
        };
        assert!(!metrics.is_empty());
        let patch = EntityPatch::from_partial(&metrics).unwrap();
        assert_eq!(patch.len(), 1);
        assert!(patch.touches("hindex"));
        assert!(ScholarMetrics::default().is_empty());
    }
}
