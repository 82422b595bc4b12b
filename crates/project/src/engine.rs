//! Usage data from the hosted engine API.

use crate::decorations::FieldLatencies;
use crate::error::{ProjectError, Result};
use crate::providers::{UsageData, UsageProvider};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const CLIENT_NAME: &str = "graphql-client";

const SCHEMA_TAGS_AND_FIELD_STATS: &str = r#"query SchemaTagsAndFieldStats($id: ID!) {
  service(id: $id) {
    schemaTags {
      tag
    }
    stats(from: "-86400", to: "-0") {
      fieldStats {
        groupBy {
          field
        }
        metrics {
          fieldHistogram {
            durationMs(percentile: 0.95)
          }
        }
      }
    }
  }
}"#;

const FRONTEND_URL_ROOT: &str = "query FrontendUrlRoot {
  frontendUrlRoot
}";

/// Client for the engine's GraphQL API.
///
/// ```no_run
/// use graphql_client_project::{EngineClient, UsageProvider};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = EngineClient::new("https://graphql.api.apollographql.com/api/graphql")
///     .with_api_key("service:my-graph:key")
///     .with_timeout(Duration::from_secs(10))
///     .with_retries(2);
/// let usage = client.load_schema_tags_and_field_latencies("my-graph").await?;
/// println!("{:?}", usage.schema_tags);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EngineClient {
    endpoint: String,
    api_key: Option<String>,
    headers: HashMap<String, String>,
    timeout: Duration,
    connect_timeout: Duration,
    retries: u32,
}

impl fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
enum EngineError {
    Network(String),
    Http(u16, String),
    Parse(String),
    GraphQl(String),
}

impl EngineError {
    /// Network failures and server errors are worth another attempt.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http(status, _) => *status >= 500,
            Self::Parse(_) | Self::GraphQl(_) => false,
        }
    }
}

impl From<EngineError> for ProjectError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::Http(status, message) => ProjectError::Http { status, message },
            EngineError::Network(message) => {
                ProjectError::Usage(format!("Engine request failed: {message}"))
            }
            EngineError::Parse(message) => {
                ProjectError::Usage(format!("Invalid engine response: {message}"))
            }
            EngineError::GraphQl(message) => ProjectError::Usage(message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaTagsAndFieldStatsData {
    service: Option<ServiceStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceStats {
    #[serde(default)]
    schema_tags: Vec<SchemaTag>,
    stats: Option<Stats>,
}

#[derive(Debug, Deserialize)]
struct SchemaTag {
    tag: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stats {
    #[serde(default)]
    field_stats: Vec<FieldStat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldStat {
    group_by: FieldStatGroup,
    metrics: FieldStatMetrics,
}

#[derive(Debug, Deserialize)]
struct FieldStatGroup {
    field: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldStatMetrics {
    field_histogram: FieldHistogram,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldHistogram {
    duration_ms: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrontendUrlRootData {
    frontend_url_root: String,
}

impl EngineClient {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            headers: HashMap::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            retries: 0,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Retries use exponential backoff starting at 1 second.
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: &serde_json::Value,
    ) -> std::result::Result<T, EngineError> {
        let mut last_error = None;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1));
                tracing::info!(attempt, delay_secs = delay.as_secs(), "Retrying after delay");
                tokio::time::sleep(delay).await;
            }

            match self.query_once(query, variables).await {
                Ok(data) => return Ok(data),
                Err(error) => {
                    tracing::warn!(attempt, ?error, "Engine request failed");
                    let retryable = error.is_retryable();
                    last_error = Some(error);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| EngineError::Network("No attempts made".to_string())))
    }

    async fn query_once<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: &serde_json::Value,
    ) -> std::result::Result<T, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| EngineError::Network(format!("Failed to create HTTP client: {e}")))?;

        let mut request = client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("apollographql-client-name", CLIENT_NAME)
            .header("apollographql-client-version", env!("CARGO_PKG_VERSION"));
        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key);
        }
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "Received response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Http(status.as_u16(), body));
        }

        let body: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| EngineError::Parse(e.to_string()))?;
        if let Some(error) = body.errors.first() {
            return Err(EngineError::GraphQl(error.message.clone()));
        }
        body.data
            .ok_or_else(|| EngineError::Parse("response has no data".to_string()))
    }
}

/// Group `Type.field` latency samples by type then field.
fn field_latencies(stats: Vec<FieldStat>) -> FieldLatencies {
    let mut latencies = FieldLatencies::new();
    for stat in stats {
        let (Some(coordinate), Some(duration_ms)) =
            (stat.group_by.field, stat.metrics.field_histogram.duration_ms)
        else {
            continue;
        };
        let Some((type_name, field_name)) = coordinate.split_once('.') else {
            continue;
        };
        latencies
            .entry(type_name.to_string())
            .or_default()
            .insert(field_name.to_string(), duration_ms);
    }
    latencies
}

#[async_trait]
impl UsageProvider for EngineClient {
    #[tracing::instrument(skip(self))]
    async fn load_schema_tags_and_field_latencies(&self, service_id: &str) -> Result<UsageData> {
        let data: SchemaTagsAndFieldStatsData = self
            .query(
                SCHEMA_TAGS_AND_FIELD_STATS,
                &serde_json::json!({ "id": service_id }),
            )
            .await?;
        let service = data
            .service
            .ok_or_else(|| ProjectError::Usage(format!("Unknown service `{service_id}`")))?;

        let usage = UsageData {
            schema_tags: service.schema_tags.into_iter().map(|tag| tag.tag).collect(),
            field_latencies_ms: field_latencies(
                service.stats.map(|stats| stats.field_stats).unwrap_or_default(),
            ),
        };
        tracing::info!(
            tags = usage.schema_tags.len(),
            types = usage.field_latencies_ms.len(),
            "Loaded usage data"
        );
        Ok(usage)
    }

    #[tracing::instrument(skip(self))]
    async fn load_frontend_url_root(&self) -> Result<String> {
        let data: FrontendUrlRootData = self
            .query(FRONTEND_URL_ROOT, &serde_json::Value::Null)
            .await?;
        Ok(data.frontend_url_root)
    }
}
