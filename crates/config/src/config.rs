use crate::GraphRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Variant used when neither the config nor a graph ref names one.
pub const DEFAULT_VARIANT: &str = "current";

/// Hosted API used for schema tags and field statistics.
pub const DEFAULT_ENGINE_ENDPOINT: &str = "https://graphql.api.apollographql.com/api/graphql";

/// Configuration for a single GraphQL client project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Remote graph id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,

    /// Schema tag (variant) to load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,

    /// Client-side settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Service settings (endpoint and local schema)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceConfig>,

    /// Hosted API settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl ProjectConfig {
    /// The graph reference declared by `client.service`, if it is one.
    #[must_use]
    pub fn service_graph_ref(&self) -> Option<GraphRef> {
        match self.client.service.as_ref()? {
            ClientServiceConfig::GraphRef(graph_ref) => graph_ref.parse().ok(),
            _ => None,
        }
    }

    /// The remote graph id: `graph` if set, otherwise the id from a
    /// `client.service` graph ref.
    #[must_use]
    pub fn graph_id(&self) -> Option<String> {
        self.graph
            .clone()
            .or_else(|| self.service_graph_ref().map(|r| r.graph_id().to_string()))
    }

    /// The schema tag: `variant` if set, otherwise the variant from a
    /// `client.service` graph ref, otherwise [`DEFAULT_VARIANT`].
    #[must_use]
    pub fn variant(&self) -> String {
        self.variant
            .clone()
            .or_else(|| {
                self.service_graph_ref()
                    .and_then(|r| r.variant().map(String::from))
            })
            .unwrap_or_else(|| DEFAULT_VARIANT.to_string())
    }

    /// Best-effort endpoint of the running service: the remote
    /// `client.service.url`, else `service.endpoint.url`.
    #[must_use]
    pub fn service_endpoint(&self) -> Option<&str> {
        if let Some(ClientServiceConfig::Remote(remote)) = &self.client.service {
            return Some(remote.url.as_str());
        }
        self.service
            .as_ref()
            .and_then(|service| service.endpoint.as_ref())
            .map(|endpoint| endpoint.url.as_str())
    }

    /// Local SDL file the service schema should be read from, if any.
    #[must_use]
    pub fn local_service_schema_file(&self) -> Option<&str> {
        if let Some(ClientServiceConfig::Local(local)) = &self.client.service {
            return Some(local.local_schema_file.as_str());
        }
        self.service
            .as_ref()
            .and_then(|service| service.local_schema_file.as_deref())
    }
}

/// Client-side settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Where the service schema comes from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ClientServiceConfig>,

    /// Document glob patterns to track
    pub includes: Vec<String>,

    /// Document glob patterns to ignore
    pub excludes: Vec<String>,

    /// Validation rule selection (defaults when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_rules: Option<RuleSelection>,

    /// Directives stripped from documents before they are sent to the service
    pub client_only_directives: Vec<String>,

    /// Directives marking fields resolved entirely on the client; annotated
    /// fields are removed before documents are sent to the service
    pub client_schema_directives: Vec<String>,

    /// Insert `__typename` into selection sets sent to the service
    pub add_typename: bool,

    /// Additional client schema extension SDL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_schema_file: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service: None,
            includes: vec!["src/**/*.graphql".to_string(), "src/**/*.gql".to_string()],
            excludes: vec![
                "**/node_modules/**".to_string(),
                "**/__tests__/**".to_string(),
            ],
            validation_rules: None,
            client_only_directives: vec!["connection".to_string(), "type".to_string()],
            client_schema_directives: vec!["client".to_string(), "rest".to_string()],
            add_typename: true,
            local_schema_file: None,
        }
    }
}

/// The service a client talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientServiceConfig {
    /// A graph reference string, `graph@variant`
    GraphRef(String),
    /// A running endpoint
    Remote(RemoteServiceConfig),
    /// A schema file on disk
    Local(LocalServiceConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteServiceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalServiceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub local_schema_file: String,
}

/// Which validation rules run.
///
/// ```yaml
/// client:
///   validationRules: [NoAnonymousQueries, ExecutableValidation]
/// ```
///
/// or, to filter the defaults:
///
/// ```yaml
/// client:
///   validationRules:
///     exclude: [NoTypenameAlias]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSelection {
    /// Run exactly these rules
    Only(Vec<String>),
    /// Run the default rules minus these
    Exclude { exclude: Vec<String> },
}

impl RuleSelection {
    /// Every rule name mentioned by this selection.
    #[must_use]
    pub fn names(&self) -> &[String] {
        match self {
            Self::Only(names) | Self::Exclude { exclude: names } => names,
        }
    }
}

/// Service settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EndpointConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_schema_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

/// Hosted API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// GraphQL endpoint for schema tags and field statistics
    pub endpoint: String,

    /// API key; falls back to the `APOLLO_KEY` environment variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Root URL of the explorer frontend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontend: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENGINE_ENDPOINT.to_string(),
            api_key: None,
            frontend: None,
        }
    }
}

impl EngineConfig {
    /// The configured API key, or `APOLLO_KEY` from the environment.
    #[must_use]
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("APOLLO_KEY").ok())
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_defaults() {
        let config = ProjectConfig::default();
        assert_eq!(config.client.client_only_directives, ["connection", "type"]);
        assert_eq!(config.client.client_schema_directives, ["client", "rest"]);
        assert!(config.client.add_typename);
        assert_eq!(config.variant(), DEFAULT_VARIANT);
        assert_eq!(config.graph_id(), None);
        assert_eq!(config.engine.endpoint, DEFAULT_ENGINE_ENDPOINT);
    }

    #[test]
    fn test_graph_ref_service_supplies_graph_and_variant() {
        let config: ProjectConfig =
            serde_json::from_str(r#"{ "client": { "service": "my-graph@staging" } }"#).unwrap();
        assert_eq!(config.graph_id().as_deref(), Some("my-graph"));
        assert_eq!(config.variant(), "staging");
        assert_eq!(config.service_endpoint(), None);
    }

    #[test]
    fn test_explicit_graph_and_variant_win() {
        let config: ProjectConfig = serde_json::from_str(
            r#"{ "graph": "other", "variant": "prod", "client": { "service": "my-graph@staging" } }"#,
        )
        .unwrap();
        assert_eq!(config.graph_id().as_deref(), Some("other"));
        assert_eq!(config.variant(), "prod");
    }

    #[test]
    fn test_remote_service_endpoint() {
        let config: ProjectConfig = serde_json::from_str(
            r#"{ "client": { "service": { "name": "api", "url": "http://localhost:4000/graphql" } } }"#,
        )
        .unwrap();
        assert!(matches!(
            config.client.service,
            Some(ClientServiceConfig::Remote(_))
        ));
        assert_eq!(
            config.service_endpoint(),
            Some("http://localhost:4000/graphql")
        );
    }

    #[test]
    fn test_service_endpoint_fallback() {
        let config: ProjectConfig = serde_json::from_str(
            r#"{ "service": { "endpoint": { "url": "http://localhost:4001" } } }"#,
        )
        .unwrap();
        assert_eq!(config.service_endpoint(), Some("http://localhost:4001"));
    }

    #[test]
    fn test_local_service_schema_file() {
        let config: ProjectConfig = serde_json::from_str(
            r#"{ "client": { "service": { "name": "local", "localSchemaFile": "schema.graphql" } } }"#,
        )
        .unwrap();
        assert_eq!(config.local_service_schema_file(), Some("schema.graphql"));
        assert_eq!(config.service_endpoint(), None);
    }

    #[test]
    fn test_rule_selection_forms() {
        let only: RuleSelection = serde_json::from_str(r#"["NoAnonymousQueries"]"#).unwrap();
        assert_eq!(only, RuleSelection::Only(vec!["NoAnonymousQueries".into()]));

        let exclude: RuleSelection =
            serde_json::from_str(r#"{ "exclude": ["NoTypenameAlias"] }"#).unwrap();
        assert_eq!(exclude.names(), ["NoTypenameAlias"]);
    }

    #[test]
    fn test_partial_client_keeps_other_defaults() {
        let config: ProjectConfig =
            serde_json::from_str(r#"{ "client": { "addTypename": false } }"#).unwrap();
        assert!(!config.client.add_typename);
        assert_eq!(config.client.client_schema_directives, ["client", "rest"]);
    }
}
