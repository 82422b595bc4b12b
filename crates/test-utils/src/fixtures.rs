//! Schemas, documents and a wired-up project for integration tests.

use crate::recording::EventLog;
use graphql_client_project::{
    ClientProject, InMemoryDocumentStore, ProjectError, StaticSchemaProvider, UsageData,
    UsageProvider,
};
use graphql_config::ProjectConfig;
use graphql_types::FileUri;
use std::sync::Arc;

/// A small service schema with a user, a feed and a mutation.
pub const SERVICE_SCHEMA: &str = r"
type Query {
  user(id: ID): User
  feed(first: Int): [Post!]!
}

type Mutation {
  likePost(id: ID!): Post
}

type User {
  id: ID!
  name: String
  friends: [User!]!
}

type Post {
  id: ID!
  title: String
  author: User!
}
";

/// Client extensions for [`SERVICE_SCHEMA`].
pub const CLIENT_SCHEMA: &str = r"
extend type User {
  isLoggedIn: Boolean
}

extend type Post {
  isLiked: Boolean!
}
";

/// `file:///<path>`
#[must_use]
pub fn uri(path: &str) -> FileUri {
    FileUri::new(format!("file:///{}", path.trim_start_matches('/')))
}

/// Serves the same usage data for every service.
#[derive(Debug, Clone, Default)]
pub struct FixedUsage(pub UsageData);

#[async_trait::async_trait]
impl UsageProvider for FixedUsage {
    async fn load_schema_tags_and_field_latencies(
        &self,
        _service_id: &str,
    ) -> Result<UsageData, ProjectError> {
        Ok(self.0.clone())
    }

    async fn load_frontend_url_root(&self) -> Result<String, ProjectError> {
        Err(ProjectError::Usage("no frontend root in fixtures".to_string()))
    }
}

/// A [`ClientProject`] over an in-memory store, recording everything it
/// publishes.
pub struct TestProject {
    pub store: Arc<InMemoryDocumentStore>,
    pub project: ClientProject,
    pub events: EventLog,
}

impl TestProject {
    /// A project over [`SERVICE_SCHEMA`] with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&ProjectConfig::default())
    }

    /// # Panics
    ///
    /// Panics if [`SERVICE_SCHEMA`] fails to parse.
    #[must_use]
    pub fn with_config(config: &ProjectConfig) -> Self {
        Self::with_schema(config, SERVICE_SCHEMA)
    }

    /// # Panics
    ///
    /// Panics if `sdl` is not a valid schema.
    #[must_use]
    pub fn with_schema(config: &ProjectConfig, sdl: &str) -> Self {
        let store = Arc::new(InMemoryDocumentStore::new());
        let provider = StaticSchemaProvider::from_sdl(sdl, "file:///schema.graphql")
            .unwrap_or_else(|error| panic!("fixture schema is invalid: {error}"));
        let events = EventLog::new();
        let project = ClientProject::new(config, store.clone(), Arc::new(provider))
            .with_notifier(Arc::new(events.clone()));
        events.observe(&project);
        Self {
            store,
            project,
            events,
        }
    }

    /// Serve `usage` as the project's usage data.
    #[must_use]
    pub fn with_usage(mut self, usage: UsageData) -> Self {
        self.project = self.project.with_usage_provider(Arc::new(FixedUsage(usage)));
        self
    }

    /// Track `source` as `file:///<path>`.
    #[must_use]
    pub fn add(&self, path: &str, source: &str) -> FileUri {
        let uri = uri(path);
        self.store.set_source(uri.clone(), source);
        uri
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
