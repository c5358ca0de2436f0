//! PubMed articles attached to scholars
//!
//! Multi-valued fields (authors, keywords, MeSH terms) are stored as single
//! delimited strings on the platform; the accessors split them. Grant support
//! is stored as the JSON array PubMed itself returns.

use crate::grant::Grant;
use crate::scholar::ScholarProfile;
use scholargraph_ontology::{
    ConfigError, EntityPatch, EntityService, FetchOptions, FetchResponse, LinkType, ObjectType,
    OntologyObject, Result, Transport,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubMedArticle {
    pub pmid: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scholar_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default, rename = "meShTerms", skip_serializing_if = "Option::is_none")]
    pub mesh_terms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_support: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_index: Option<i64>,
    /// Non-zero when the upstream PubMed record failed to parse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dict_error: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

fn split_list(raw: Option<&str>, separator: char) -> Vec<&str> {
    raw.map(|s| s.split(separator).map(str::trim).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

impl PubMedArticle {
    pub fn new(pmid: i64, title: impl Into<String>) -> Self {
        Self {
            pmid,
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn author_list(&self) -> Vec<&str> {
        split_list(self.authors.as_deref(), ',')
    }

    pub fn keyword_list(&self) -> Vec<&str> {
        split_list(self.keywords.as_deref(), ',')
    }

    pub fn mesh_term_list(&self) -> Vec<&str> {
        split_list(self.mesh_terms.as_deref(), ';')
    }

    /// Decode the grant support column. Empty or absent means no grants.
    pub fn grants(&self) -> std::result::Result<Vec<Grant>, serde_json::Error> {
        match self.grant_support.as_deref().map(str::trim) {
            None | Some("") | Some("null") => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(raw),
        }
    }

    pub fn has_parse_error(&self) -> bool {
        self.dict_error.is_some_and(|code| code != 0)
    }
}

impl OntologyObject for PubMedArticle {
    type Key = i64;
    const PRIMARY_KEY_FIELD: &'static str = "pmid";

    fn primary_key(&self) -> Option<&i64> {
        Some(&self.pmid)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.pmid <= 0 {
            return Err(format!("pmid {} is not a PubMed id", self.pmid));
        }
        if self.title.trim().is_empty() {
            return Err(format!("article {} has no title", self.pmid));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PubMedArticles {
    service: EntityService<PubMedArticle>,
}

impl PubMedArticles {
    pub const TYPE_NAME: &'static str = "PalantirPubMeds";
    pub const SLUG: &'static str = "palantir-pub-meds";

    pub const SCHOLAR: LinkType<ScholarProfile> = LinkType::one("ScholarProfile");

    pub fn new(transport: Transport) -> std::result::Result<Self, ConfigError> {
        let object_type = ObjectType::new(Self::TYPE_NAME, Self::SLUG)?;
        Ok(Self {
            service: EntityService::new(object_type, transport),
        })
    }

    pub fn service(&self) -> &EntityService<PubMedArticle> {
        &self.service
    }

    pub async fn save(
        &self,
        articles: &[PubMedArticle],
        access_token: &str,
    ) -> Result<Vec<PubMedArticle>> {
        self.service.save_entities(articles, access_token).await
    }

    pub async fn update(
        &self,
        pmid: i64,
        patch: &EntityPatch,
        access_token: &str,
    ) -> Result<PubMedArticle> {
        self.service.update_entity(&pmid, patch, access_token).await
    }

    pub async fn delete(&self, pmid: i64, access_token: &str) -> Result<()> {
        self.service.delete_entity(&pmid, access_token).await
    }

    pub async fn list(
        &self,
        access_token: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse<PubMedArticle>> {
        self.service.fetch_entities(access_token, options).await
    }

    pub async fn get(&self, pmid: i64, access_token: &str) -> Result<PubMedArticle> {
        self.service.fetch_entity_by_key(&pmid, access_token).await
    }

    /// Scholars linked to an article, as the page the platform returns
    pub async fn scholars(
        &self,
        pmid: i64,
        access_token: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse<ScholarProfile>> {
        self.service
            .fetch_linked_entities(&pmid, Self::SCHOLAR.name(), access_token, options)
            .await
    }

    pub async fn scholar(&self, pmid: i64, access_token: &str) -> Result<ScholarProfile> {
        self.service
            .fetch_single_linked(&pmid, Self::SCHOLAR.name(), access_token)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_platform_record() {
        let article: PubMedArticle = serde_json::from_value(json!({
            "pmid": 31452104,
            "title": "Sleep and memory",
            "scholarId": "s1",
            "abstract": "short",
            "abstractText": "long form",
            "authors": "Smith J, Doe A",
            "meShTerms": "Sleep; Memory;",
            "dictError": 0
        }))
        .unwrap();
        assert_eq!(article.abstract_summary.as_deref(), Some("short"));
        assert_eq!(article.author_list(), vec!["Smith J", "Doe A"]);
        assert_eq!(article.mesh_term_list(), vec!["Sleep", "Memory"]);
        assert!(!article.has_parse_error());
    }

    #[test]
    fn test_grants_from_pubmed_shape() {
        let mut article = PubMedArticle::new(1, "t");
        assert!(article.grants().unwrap().is_empty());

        article.grant_support = Some(
            r#"[{"GrantID": "R01 MH1", "Agency": "NIMH NIH HHS", "Country": "United States",
                 "Acronym": "MH", "GrantNumber": "R01", "ProjectName": ""}]"#
                .to_string(),
        );
        let grants = article.grants().unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].grant_id, "R01 MH1");
        assert_eq!(grants[0].agency.as_deref(), Some("NIMH NIH HHS"));

        article.grant_support = Some("not json".into());
        assert!(article.grants().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(PubMedArticle::new(12, "t").validate().is_ok());
        assert!(PubMedArticle::new(0, "t").validate().is_err());
        assert!(PubMedArticle::new(12, "").validate().is_err());
    }
}
