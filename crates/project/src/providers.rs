//! Sources of the service schema and of usage data.

use crate::compose::ServiceSchema;
use crate::decorations::FieldLatencies;
use crate::error::{ProjectError, Result};
use apollo_compiler::validation::Valid;
use apollo_compiler::Schema;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Which schema to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaResolveConfig {
    /// Schema tag (variant)
    pub tag: String,
    /// Bypass any cached schema
    pub force: bool,
}

#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn resolve_schema(&self, config: SchemaResolveConfig) -> Result<ServiceSchema>;
}

/// Serves one schema known up front, whatever the tag.
#[derive(Debug, Clone)]
pub struct StaticSchemaProvider {
    schema: ServiceSchema,
}

impl StaticSchemaProvider {
    #[must_use]
    pub fn new(schema: ServiceSchema) -> Self {
        Self { schema }
    }

    /// Parse and validate `sdl` now; later resolves cannot fail.
    pub fn from_sdl(sdl: &str, path: &str) -> Result<Self> {
        Ok(Self::new(ServiceSchema::parse(sdl, path)?))
    }

    #[must_use]
    pub fn from_schema(schema: Valid<Schema>) -> Self {
        Self::new(ServiceSchema::from_schema(schema))
    }
}

#[async_trait]
impl SchemaProvider for StaticSchemaProvider {
    async fn resolve_schema(&self, _config: SchemaResolveConfig) -> Result<ServiceSchema> {
        Ok(self.schema.clone())
    }
}

/// Reads SDL from a file, caching the parsed schema until a forced resolve.
#[derive(Debug)]
pub struct FileSchemaProvider {
    path: PathBuf,
    cached: Mutex<Option<ServiceSchema>>,
}

impl FileSchemaProvider {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SchemaProvider for FileSchemaProvider {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn resolve_schema(&self, config: SchemaResolveConfig) -> Result<ServiceSchema> {
        if !config.force {
            let cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(schema) = cached.as_ref() {
                return Ok(schema.clone());
            }
        }

        let sdl = tokio::fs::read_to_string(&self.path).await?;
        let schema = ServiceSchema::parse(&sdl, &self.path)?;
        tracing::info!(types = schema.schema().types.len(), "Loaded schema file");

        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = Some(schema.clone());
        Ok(schema)
    }
}

/// Schema tags and field latencies for one service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageData {
    pub schema_tags: Vec<String>,
    pub field_latencies_ms: FieldLatencies,
}

/// Best-effort usage statistics. Failures are reported to the caller, which
/// logs them and keeps its previous data.
#[async_trait]
pub trait UsageProvider: Send + Sync {
    async fn load_schema_tags_and_field_latencies(&self, service_id: &str) -> Result<UsageData>;

    async fn load_frontend_url_root(&self) -> Result<String>;
}

/// A usage provider with nothing to report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUsageProvider;

#[async_trait]
impl UsageProvider for NoUsageProvider {
    async fn load_schema_tags_and_field_latencies(&self, service_id: &str) -> Result<UsageData> {
        Err(ProjectError::Usage(format!(
            "no usage data available for `{service_id}`"
        )))
    }

    async fn load_frontend_url_root(&self) -> Result<String> {
        Err(ProjectError::Usage("no frontend URL root available".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn config(force: bool) -> SchemaResolveConfig {
        SchemaResolveConfig {
            tag: "current".to_string(),
            force,
        }
    }

    #[tokio::test]
    async fn test_static_provider_ignores_tag() {
        let provider = StaticSchemaProvider::from_sdl("type Query { a: Int }", "schema.graphql")
            .unwrap();
        let schema = provider.resolve_schema(config(false)).await.unwrap();
        assert!(schema.schema().types.contains_key("Query"));
    }

    #[tokio::test]
    async fn test_file_provider_caches_until_forced() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "type Query {{ a: Int }}").unwrap();
        let provider = FileSchemaProvider::new(file.path());

        let first = provider.resolve_schema(config(false)).await.unwrap();
        assert!(first.schema().get_object("Query").unwrap().fields.contains_key("a"));

        std::fs::write(file.path(), "type Query { b: Int }").unwrap();
        let cached = provider.resolve_schema(config(false)).await.unwrap();
        assert!(cached.schema().get_object("Query").unwrap().fields.contains_key("a"));

        let forced = provider.resolve_schema(config(true)).await.unwrap();
        assert!(forced.schema().get_object("Query").unwrap().fields.contains_key("b"));
    }

    #[tokio::test]
    async fn test_file_provider_reports_invalid_schema() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "type Query {{ a: Missing }}").unwrap();
        let provider = FileSchemaProvider::new(file.path());

        let error = provider.resolve_schema(config(false)).await.unwrap_err();
        assert!(matches!(error, ProjectError::SchemaLoad(_)), "{error}");
    }

    #[tokio::test]
    async fn test_file_provider_reports_missing_file() {
        let provider = FileSchemaProvider::new("/nonexistent/schema.graphql");
        let error = provider.resolve_schema(config(false)).await.unwrap_err();
        assert!(matches!(error, ProjectError::Io(_)), "{error}");
    }
}
