//! Platform configuration
//!
//! Injected once at startup and handed to the [`Transport`](crate::Transport).
//! Nothing in the client reads the environment on its own during a call.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const ENV_FOUNDRY_URL: &str = "FOUNDRY_URL";
pub const ENV_ONTOLOGY_RID: &str = "ONTOLOGY_RID";
pub const ENV_PAGE_SIZE: &str = "ONTOLOGY_PAGE_SIZE";
pub const ENV_TIMEOUT_SECS: &str = "FOUNDRY_TIMEOUT_SECS";

/// Ontology platform configuration loaded from environment or config file
#[derive(Debug, Clone, PartialEq)]
pub struct OntologyConfig {
    /// Platform host, without the API namespace
    pub base_url: Url,
    /// Ontology identifier, used as the namespace path segment
    pub ontology_rid: String,
    /// Page size sent when a fetch does not specify one.
    /// `None` omits `pageSize` entirely and defers to the platform default.
    pub default_page_size: Option<u32>,
    /// Per-request bound applied by the HTTP backend. `None` imposes no bound.
    pub request_timeout: Option<Duration>,
}

/// On-disk shape of the configuration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    base_url: String,
    ontology_rid: String,
    #[serde(default)]
    default_page_size: Option<u32>,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
}

impl OntologyConfig {
    pub fn new(base_url: &str, ontology_rid: &str) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(base_url)?;
        if ontology_rid.trim().is_empty() {
            return Err(ConfigError::Invalid("ontology rid must not be empty".to_string()));
        }
        Ok(Self {
            base_url,
            ontology_rid: ontology_rid.trim().to_string(),
            default_page_size: None,
            request_timeout: None,
        })
    }

    pub fn with_default_page_size(mut self, page_size: u32) -> Self {
        self.default_page_size = Some(page_size);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_FOUNDRY_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVar(ENV_FOUNDRY_URL))?;
        let rid = lookup(ENV_ONTOLOGY_RID)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVar(ENV_ONTOLOGY_RID))?;

        let mut config = Self::new(&base_url, &rid)?;

        if let Some(raw) = lookup(ENV_PAGE_SIZE) {
            config.default_page_size = Some(parse_page_size(ENV_PAGE_SIZE, &raw)?);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                name: ENV_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
            config.request_timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Load from a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let file: ConfigFile = serde_json::from_str(&raw)?;

        let mut config = Self::new(&file.base_url, &file.ontology_rid)?;
        if let Some(size) = file.default_page_size {
            if size == 0 {
                return Err(ConfigError::InvalidNumber {
                    name: "defaultPageSize",
                    value: size.to_string(),
                });
            }
            config.default_page_size = Some(size);
        }
        config.request_timeout = file.request_timeout_secs.map(Duration::from_secs);
        Ok(config)
    }

    /// Path segments of the API namespace: `api/v2/ontologies/<rid>`
    pub fn namespace_segments(&self) -> [&str; 4] {
        ["api", "v2", "ontologies", &self.ontology_rid]
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: "expected an http(s) base URL".to_string(),
        });
    }
    Ok(url)
}

fn parse_page_size(name: &'static str, raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(ConfigError::InvalidNumber {
            name,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_minimal() {
        let config = OntologyConfig::from_lookup(lookup_from(&[
            (ENV_FOUNDRY_URL, "https://stack.example.com"),
            (ENV_ONTOLOGY_RID, "ri.ontology.main.ontology.1234"),
        ]))
        .unwrap();

        assert_eq!(config.base_url.host_str(), Some("stack.example.com"));
        assert_eq!(config.ontology_rid, "ri.ontology.main.ontology.1234");
        assert_eq!(config.default_page_size, None);
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn test_from_lookup_missing_rid() {
        let err = OntologyConfig::from_lookup(lookup_from(&[(
            ENV_FOUNDRY_URL,
            "https://stack.example.com",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ENV_ONTOLOGY_RID)));
    }

    #[test]
    fn test_from_lookup_optional_values() {
        let config = OntologyConfig::from_lookup(lookup_from(&[
            (ENV_FOUNDRY_URL, "https://stack.example.com"),
            (ENV_ONTOLOGY_RID, "rid"),
            (ENV_PAGE_SIZE, "250"),
            (ENV_TIMEOUT_SECS, "30"),
        ]))
        .unwrap();
        assert_eq!(config.default_page_size, Some(250));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = OntologyConfig::from_lookup(lookup_from(&[
            (ENV_FOUNDRY_URL, "https://stack.example.com"),
            (ENV_ONTOLOGY_RID, "rid"),
            (ENV_PAGE_SIZE, "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(matches!(
            OntologyConfig::new("not a url", "rid"),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            OntologyConfig::new("ftp://stack.example.com", "rid"),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "baseUrl": "https://stack.example.com",
                "ontologyRid": "rid-1",
                "defaultPageSize": 100,
                "requestTimeoutSecs": 15
            }}"#
        )
        .unwrap();

        let config = OntologyConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.ontology_rid, "rid-1");
        assert_eq!(config.default_page_size, Some(100));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_namespace_segments() {
        let config = OntologyConfig::new("https://stack.example.com", "rid-9").unwrap();
        assert_eq!(
            config.namespace_segments(),
            ["api", "v2", "ontologies", "rid-9"]
        );
    }
}
