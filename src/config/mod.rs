//! Configuration loading and management
//!
//! The service reads one YAML document whose sections all have defaults, then
//! lets environment variables override individual values:
//!
//! ```yaml
//! server:
//!   bind: "0.0.0.0:3000"
//!   base_path: "/v5"
//! auth:
//!   admin_roles: ["administrator", "admin"]
//! store:
//!   member_table: "Member"
//!   member_trait_table: "MemberTrait"
//! search:
//!   host: "https://search-members.us-east-1.es.amazonaws.com"
//!   api_version: "6.8"
//! storage:
//!   photo_bucket: "member-photos"
//!   photo_url_template: "https://member-photos.s3.amazonaws.com/{{ key }}"
//! ```

use crate::core::auth::AdminRoles;
use crate::core::error::{ServiceError, ServiceResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Placeholder the photo URL template must contain
pub const PHOTO_KEY_PLACEHOLDER: &str = "{{ key }}";

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,

    /// Prefix every route is nested under (e.g. "/v5"); empty for none
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            base_path: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Roles granting administrative rights, compared case-insensitively
    pub admin_roles: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_roles: vec!["administrator".to_string(), "admin".to_string()],
        }
    }
}

impl AuthConfig {
    pub fn admin_roles(&self) -> AdminRoles {
        AdminRoles::new(&self.admin_roles)
    }
}

/// Document store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub member_table: String,
    pub member_trait_table: String,
    pub region: Option<String>,
    /// Endpoint override, e.g. a local DynamoDB
    pub endpoint: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            member_table: "Member".to_string(),
            member_trait_table: "MemberTrait".to_string(),
            region: None,
            endpoint: None,
        }
    }
}

/// Search index settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Base URL of the search cluster
    pub host: String,
    /// Cluster API version; 7 and later get the compatibility media type
    pub api_version: String,
    /// Signing region for managed clusters; resolved from the environment when absent
    pub region: Option<String>,
    pub member_index: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:9200".to_string(),
            api_version: "6.8".to_string(),
            region: None,
            member_index: "members".to_string(),
        }
    }
}

/// Object storage settings for member photos
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub photo_bucket: String,
    /// Public URL of an uploaded photo; `{{ key }}` is replaced by the object key
    pub photo_url_template: String,
    pub photo_acl: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            photo_bucket: "member-photos".to_string(),
            photo_url_template: "https://member-photos.s3.amazonaws.com/{{ key }}".to_string(),
            photo_acl: Some("public-read".to_string()),
        }
    }
}

/// Topics of the events the member service publishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    pub profile_update: String,
    pub photo_update: String,
    pub trait_create: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            profile_update: "member.action.profile.update".to_string(),
            photo_update: "member.action.profile.photo.update".to_string(),
            trait_create: "member.action.profile.trait.create".to_string(),
        }
    }
}

/// Message bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Token endpoint of the machine-to-machine auth provider
    pub auth_url: String,
    pub audience: String,
    pub client_id: String,
    pub client_secret: String,
    /// Base URL of the bus API; events are posted to `<bus_api_url>/bus/events`
    pub bus_api_url: String,
    pub error_topic: String,
    /// Originator stamped on every event
    pub originator: String,
    pub topics: TopicsConfig,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            auth_url: "http://localhost:4000/oauth/token".to_string(),
            audience: "https://m2m.example.com/".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            bus_api_url: "http://localhost:4000/v5".to_string(),
            error_topic: "common.error.reporting".to_string(),
            originator: "member-api".to_string(),
            topics: TopicsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_per_page: usize,
    pub max_per_page: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per_page: 20,
            max_per_page: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Install the global fmt subscriber
    ///
    /// Does nothing if a subscriber is already installed, so tests and
    /// embedding applications may call it freely.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.filter));

        if tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(self.with_target)
            .try_init()
            .is_err()
        {
            tracing::debug!("tracing subscriber already installed");
        }
    }
}

/// Complete configuration of the member service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub store: StoreConfig,
    pub search: SearchConfig,
    pub storage: StorageConfig,
    pub bus: BusConfig,
    pub pagination: PaginationConfig,
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("invalid configuration")?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let set = |name: &str, target: &mut String| {
            if let Some(value) = lookup(name) {
                *target = value;
            }
        };

        set("SERVER_BIND", &mut self.server.bind);
        set("BASE_PATH", &mut self.server.base_path);
        set("MEMBER_TABLE", &mut self.store.member_table);
        set("MEMBER_TRAIT_TABLE", &mut self.store.member_trait_table);
        set("ES_HOST", &mut self.search.host);
        set("ES_API_VERSION", &mut self.search.api_version);
        set("ES_MEMBER_INDEX", &mut self.search.member_index);
        set("PHOTO_S3_BUCKET", &mut self.storage.photo_bucket);
        set("PHOTO_URL_TEMPLATE", &mut self.storage.photo_url_template);
        set("AUTH0_URL", &mut self.bus.auth_url);
        set("AUTH0_AUDIENCE", &mut self.bus.audience);
        set("AUTH0_CLIENT_ID", &mut self.bus.client_id);
        set("AUTH0_CLIENT_SECRET", &mut self.bus.client_secret);
        set("BUSAPI_URL", &mut self.bus.bus_api_url);
        set("KAFKA_ERROR_TOPIC", &mut self.bus.error_topic);
        set("LOG_FILTER", &mut self.logging.filter);

        if let Some(roles) = lookup("ADMIN_ROLES") {
            self.auth.admin_roles = roles.split(',').map(|r| r.trim().to_string()).collect();
        }
        if let Some(region) = lookup("AWS_REGION") {
            self.store.region.get_or_insert_with(|| region.clone());
            self.search.region.get_or_insert(region);
        }
        if let Some(endpoint) = lookup("DYNAMODB_ENDPOINT") {
            self.store.endpoint = Some(endpoint);
        }
        let per_page = |name: &str| lookup(name).and_then(|v| v.parse::<usize>().ok());
        if let Some(n) = per_page("DEFAULT_PER_PAGE") {
            self.pagination.default_per_page = n;
        }
        if let Some(n) = per_page("MAX_PER_PAGE") {
            self.pagination.max_per_page = n;
        }

        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> ServiceResult<()> {
        if self.auth.admin_roles().is_empty() {
            return Err(ServiceError::Config(
                "auth.admin_roles must name at least one role".to_string(),
            ));
        }
        if self.pagination.default_per_page == 0 || self.pagination.max_per_page == 0 {
            return Err(ServiceError::Config(
                "pagination page sizes must be positive".to_string(),
            ));
        }
        if self.pagination.default_per_page > self.pagination.max_per_page {
            return Err(ServiceError::Config(
                "pagination.default_per_page exceeds pagination.max_per_page".to_string(),
            ));
        }
        if !self.storage.photo_url_template.contains(PHOTO_KEY_PLACEHOLDER) {
            return Err(ServiceError::Config(format!(
                "storage.photo_url_template must contain '{}'",
                PHOTO_KEY_PLACEHOLDER
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pagination.default_per_page, 20);
        assert!(config.auth.admin_roles().matches(["Administrator"]));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ServiceConfig::from_yaml_str(
            r#"
server:
  base_path: "/v5"
search:
  host: "https://search-members.us-east-1.es.amazonaws.com"
"#,
        )
        .unwrap();

        assert_eq!(config.server.base_path, "/v5");
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.search.api_version, "6.8");
        assert_eq!(config.store.member_table, "Member");
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(ServiceConfig::from_yaml_str("server: [").is_err());
    }

    #[test]
    fn test_overrides() {
        let vars = HashMap::from([
            ("ADMIN_ROLES", "copilot, Manager"),
            ("AWS_REGION", "eu-west-1"),
            ("MAX_PER_PAGE", "50"),
            ("DEFAULT_PER_PAGE", "not-a-number"),
            ("ES_HOST", "http://search:9200"),
        ]);
        let config = ServiceConfig::default()
            .with_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.auth.admin_roles, vec!["copilot", "Manager"]);
        assert!(config.auth.admin_roles().matches(["manager"]));
        assert_eq!(config.store.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.search.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.pagination.max_per_page, 50);
        assert_eq!(config.pagination.default_per_page, 20);
        assert_eq!(config.search.host, "http://search:9200");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServiceConfig::default();
        config.auth.admin_roles = vec![" ".to_string()];
        assert!(matches!(config.validate(), Err(ServiceError::Config(_))));

        let mut config = ServiceConfig::default();
        config.pagination.default_per_page = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.storage.photo_url_template = "https://cdn.example.com/photo".to_string();
        assert!(config.validate().is_err());
    }
}
