//! The client project pipeline.
//!
//! A [`ClientProject`] owns a [`ProjectCore`] (document store, loading
//! handler, observers) and delegates client-specific behavior to a
//! [`ProjectCapability`]. Every trigger re-runs the whole pipeline against
//! a fresh snapshot of the documents.

use crate::closure::Closure;
use crate::compose::{client_extension_document, ComposedSchema, ServiceSchema};
use crate::decorations::{decorate, Decoration, ExplorerLinkContext, FieldLatencies};
use crate::diagnostics::{validate_project, Diagnostic, DiagnosticSet};
use crate::document::{DocumentSet, DocumentStore};
use crate::error::{AnonymousOperationError, ProjectError};
use crate::loading::{LoadingHandler, LoadingNotifier};
use crate::projection::{project, ProjectionOptions};
use crate::providers::{NoUsageProvider, SchemaProvider, SchemaResolveConfig, UsageProvider};
use crate::registry::{FragmentMap, OperationMap, Registry};
use crate::rules::{default_rules, resolve_validation_rules, RulesOverride, ValidationRule};
use apollo_compiler::{ast, Name};
use graphql_config::{ClientConfig, ProjectConfig};
use graphql_types::FileUri;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

type DiagnosticsObserver = Box<dyn Fn(&FileUri, &[Diagnostic]) + Send + Sync>;
type DecorationsObserver = Box<dyn Fn(&[Decoration]) + Send + Sync>;
type SchemaTagsObserver = Box<dyn Fn(&str, &[String]) + Send + Sync>;

/// One callback per event kind. Registering again replaces the previous
/// callback.
#[derive(Default)]
pub struct ProjectObservers {
    diagnostics: Option<DiagnosticsObserver>,
    decorations: Option<DecorationsObserver>,
    schema_tags: Option<SchemaTagsObserver>,
}

impl std::fmt::Debug for ProjectObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectObservers")
            .field("diagnostics", &self.diagnostics.is_some())
            .field("decorations", &self.decorations.is_some())
            .field("schema_tags", &self.schema_tags.is_some())
            .finish()
    }
}

impl ProjectObservers {
    pub fn on_diagnostics(
        &mut self,
        observer: impl Fn(&FileUri, &[Diagnostic]) + Send + Sync + 'static,
    ) {
        self.diagnostics = Some(Box::new(observer));
    }

    pub fn on_decorations(&mut self, observer: impl Fn(&[Decoration]) + Send + Sync + 'static) {
        self.decorations = Some(Box::new(observer));
    }

    pub fn on_schema_tags(&mut self, observer: impl Fn(&str, &[String]) + Send + Sync + 'static) {
        self.schema_tags = Some(Box::new(observer));
    }

    fn diagnostics(&self, uri: &FileUri, diagnostics: &[Diagnostic]) {
        if let Some(observer) = &self.diagnostics {
            observer(uri, diagnostics);
        }
    }

    fn decorations(&self, decorations: &[Decoration]) {
        if let Some(observer) = &self.decorations {
            observer(decorations);
        }
    }

    fn schema_tags(&self, service_id: &str, tags: &[String]) {
        if let Some(observer) = &self.schema_tags {
            observer(service_id, tags);
        }
    }
}

/// Document tracking and loading state shared by every kind of project.
#[derive(Debug)]
pub struct ProjectCore {
    store: Arc<dyn DocumentStore>,
    loading: LoadingHandler,
    observers: RwLock<ProjectObservers>,
}

impl ProjectCore {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            loading: LoadingHandler::default(),
            observers: RwLock::new(ProjectObservers::default()),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn LoadingNotifier>) -> Self {
        self.loading = LoadingHandler::new(notifier);
        self
    }

    /// A point-in-time copy of the tracked documents.
    #[must_use]
    pub fn documents(&self) -> DocumentSet {
        self.store.snapshot()
    }

    #[must_use]
    pub fn loading(&self) -> &LoadingHandler {
        &self.loading
    }

    /// Register callbacks.
    pub fn observe(&self, register: impl FnOnce(&mut ProjectObservers)) {
        register(&mut self.observers.write().unwrap_or_else(PoisonError::into_inner));
    }

    fn observers(&self) -> std::sync::RwLockReadGuard<'_, ProjectObservers> {
        self.observers.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Behavior specific to a kind of project.
pub trait ProjectCapability: Send + Sync {
    /// Type-system definitions to compose onto the service schema.
    fn client_extension(&self, documents: &DocumentSet) -> ast::Document;

    /// Rules run over every document.
    fn validation_rules(&self) -> Vec<Arc<dyn ValidationRule>>;

    /// How operations are made safe to send to the service.
    fn projection_options(&self) -> ProjectionOptions<'_>;
}

/// The capability of a client project: local schema extensions and client
/// directives.
pub struct ClientCapability {
    client_only_directives: Vec<String>,
    client_schema_directives: Vec<String>,
    add_typename: bool,
    local_schema: Option<ast::Document>,
    rules: Vec<Arc<dyn ValidationRule>>,
}

impl std::fmt::Debug for ClientCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCapability")
            .field("client_only_directives", &self.client_only_directives)
            .field("client_schema_directives", &self.client_schema_directives)
            .field("add_typename", &self.add_typename)
            .field("local_schema", &self.local_schema.is_some())
            .field("rules", &self.rules)
            .finish()
    }
}

impl ClientCapability {
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let rules_override = config
            .validation_rules
            .as_ref()
            .map(RulesOverride::from_selection);
        Self {
            client_only_directives: config.client_only_directives.clone(),
            client_schema_directives: config.client_schema_directives.clone(),
            add_typename: config.add_typename,
            local_schema: None,
            rules: resolve_validation_rules(default_rules(), rules_override.as_ref()),
        }
    }

    /// Compose the type-system definitions of `document` (typically the
    /// configured local schema file) along with those of tracked documents.
    #[must_use]
    pub fn with_local_schema(mut self, document: ast::Document) -> Self {
        self.local_schema = Some(document);
        self
    }
}

impl ProjectCapability for ClientCapability {
    fn client_extension(&self, documents: &DocumentSet) -> ast::Document {
        client_extension_document(documents, self.local_schema.as_ref())
    }

    fn validation_rules(&self) -> Vec<Arc<dyn ValidationRule>> {
        self.rules.clone()
    }

    fn projection_options(&self) -> ProjectionOptions<'_> {
        ProjectionOptions {
            client_only_directives: &self.client_only_directives,
            client_schema_directives: &self.client_schema_directives,
            add_typename: self.add_typename,
        }
    }
}

#[derive(Debug, Default)]
struct ProjectState {
    variant: String,
    service_schema: Option<ServiceSchema>,
    composed_schema: Option<ComposedSchema>,
    diagnostics: DiagnosticSet,
    field_latencies: Option<FieldLatencies>,
    frontend_url_root: Option<String>,
}

/// A client project: documents validated against the service schema
/// composed with client extensions.
pub struct ClientProject {
    core: ProjectCore,
    capability: Arc<dyn ProjectCapability>,
    schema_provider: Arc<dyn SchemaProvider>,
    usage_provider: Arc<dyn UsageProvider>,
    graph_id: Option<String>,
    endpoint: Option<String>,
    state: RwLock<ProjectState>,
}

impl std::fmt::Debug for ClientProject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientProject")
            .field("core", &self.core)
            .field("graph_id", &self.graph_id)
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ClientProject {
    /// A project configured by `config`, tracking the documents of `store`.
    #[must_use]
    pub fn new(
        config: &ProjectConfig,
        store: Arc<dyn DocumentStore>,
        schema_provider: Arc<dyn SchemaProvider>,
    ) -> Self {
        Self {
            core: ProjectCore::new(store),
            capability: Arc::new(ClientCapability::new(&config.client)),
            schema_provider,
            usage_provider: Arc::new(NoUsageProvider),
            graph_id: config.graph_id(),
            endpoint: config.service_endpoint().map(String::from),
            state: RwLock::new(ProjectState {
                variant: config.variant(),
                frontend_url_root: config.engine.frontend.clone(),
                ..ProjectState::default()
            }),
        }
    }

    #[must_use]
    pub fn with_capability(mut self, capability: Arc<dyn ProjectCapability>) -> Self {
        self.capability = capability;
        self
    }

    #[must_use]
    pub fn with_usage_provider(mut self, usage_provider: Arc<dyn UsageProvider>) -> Self {
        self.usage_provider = usage_provider;
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn LoadingNotifier>) -> Self {
        self.core = self.core.with_notifier(notifier);
        self
    }

    #[must_use]
    pub fn core(&self) -> &ProjectCore {
        &self.core
    }

    /// Register callbacks; see [`ProjectObservers`].
    pub fn observe(&self, register: impl FnOnce(&mut ProjectObservers)) {
        self.core.observe(register);
    }

    fn state(&self) -> std::sync::RwLockReadGuard<'_, ProjectState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> std::sync::RwLockWriteGuard<'_, ProjectState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn variant(&self) -> String {
        self.state().variant.clone()
    }

    /// Resolve the service schema for the current variant, then validate.
    ///
    /// On failure the previous schema stays in place. Returns whether a
    /// schema was loaded.
    pub async fn load_schema(&self, force: bool) -> bool {
        let tag = self.variant();
        let provider = Arc::clone(&self.schema_provider);
        let config = SchemaResolveConfig {
            tag: tag.clone(),
            force,
        };
        let label = format!("Loading schema for {tag}");
        let Some(schema) = self
            .core
            .loading
            .handle(&label, async move { provider.resolve_schema(config).await })
            .await
        else {
            return false;
        };

        self.state_mut().service_schema = Some(schema);
        self.validate();
        true
    }

    /// Fetch schema tags and field latencies for the remote graph, then
    /// regenerate decorations. Without a graph id there is nothing to load.
    pub async fn load_usage_data(&self) {
        let Some(graph_id) = self.graph_id.clone() else {
            tracing::debug!("No remote graph configured; skipping usage data");
            return;
        };

        let provider = Arc::clone(&self.usage_provider);
        let label = format!("Loading usage data for {graph_id}");
        let service_id = graph_id.clone();
        let usage = self
            .core
            .loading
            .handle(&label, async move {
                provider.load_schema_tags_and_field_latencies(&service_id).await
            })
            .await;

        let provider = Arc::clone(&self.usage_provider);
        let frontend_url_root = self
            .core
            .loading
            .handle("Loading frontend URL", async move {
                provider.load_frontend_url_root().await
            })
            .await;

        if let Some(root) = frontend_url_root {
            self.state_mut().frontend_url_root = Some(root);
        }
        if let Some(usage) = usage {
            self.core.observers().schema_tags(&graph_id, &usage.schema_tags);
            self.state_mut().field_latencies = Some(usage.field_latencies_ms);
        }
        self.generate_decorations();
    }

    /// Switch to another schema tag, reloading the schema when it changed.
    pub async fn set_variant(&self, tag: &str) {
        {
            let mut state = self.state_mut();
            if state.variant == tag {
                return;
            }
            tracing::info!(from = %state.variant, to = tag, "Schema tag changed");
            state.variant = tag.to_string();
        }
        self.load_schema(true).await;
    }

    /// Tracked documents changed: re-run validation.
    pub fn documents_changed(&self) {
        self.validate();
    }

    /// Validate every tracked document and publish the results.
    ///
    /// Diagnostics are published for every tracked file, so files that no
    /// longer have problems are cleared, and for any other file that
    /// received diagnostics. Decorations are regenerated afterwards.
    pub fn validate(&self) {
        let Some(service_schema) = self.state().service_schema.clone() else {
            tracing::debug!("No service schema loaded yet; skipping validation");
            return;
        };

        let documents = self.core.documents();
        let fragments = Registry::new(&documents).fragments();
        let extension = self.capability.client_extension(&documents);
        let rules = self.capability.validation_rules();
        let (composed, diagnostics) =
            validate_project(&service_schema, &extension, &documents, &fragments, &rules);

        {
            let observers = self.core.observers();
            let mut published = HashSet::new();
            for uri in documents.uris().chain(diagnostics.uris()) {
                if published.insert(uri) {
                    observers.diagnostics(uri, diagnostics.get(uri));
                }
            }
        }

        tracing::debug!(
            files = documents.len(),
            diagnostics = diagnostics.len(),
            "Validation pass complete"
        );
        {
            let mut state = self.state_mut();
            state.composed_schema = Some(composed);
            state.diagnostics = diagnostics;
        }

        self.generate_decorations();
    }

    /// Rebuild latency hints and run links and publish them.
    pub fn generate_decorations(&self) {
        let (composed, latencies, links) = {
            let state = self.state();
            let Some(composed) = state.composed_schema.clone() else {
                return;
            };
            let links = ExplorerLinkContext {
                frontend_url_root: state.frontend_url_root.clone(),
                graph_id: self.graph_id.clone(),
                variant: state.variant.clone(),
                endpoint: self.endpoint.clone(),
            };
            (composed, state.field_latencies.clone(), links)
        };

        let documents = self.core.documents();
        let fragments = Registry::new(&documents).fragments();
        let decorations = decorate(&composed, &documents, &fragments, latencies.as_ref(), &links);
        self.core.observers().decorations(&decorations);
    }

    /// Every fragment in the tracked documents.
    #[must_use]
    pub fn fragments(&self) -> FragmentMap {
        Registry::new(&self.core.documents()).fragments()
    }

    /// Every operation in the tracked documents.
    pub fn operations(&self) -> Result<OperationMap, AnonymousOperationError> {
        Registry::new(&self.core.documents()).operations()
    }

    /// Each operation with the fragments it transitively depends on, as a
    /// self-contained document.
    pub fn merged_operations_and_fragments(
        &self,
    ) -> Result<IndexMap<Name, ast::Document>, ProjectError> {
        let documents = self.core.documents();
        let registry = Registry::new(&documents);
        let fragments = registry.fragments();
        Ok(registry
            .operations()?
            .into_iter()
            .map(|(name, operation)| {
                (name, Closure::of_operation(&operation, &fragments).into_document())
            })
            .collect())
    }

    /// [`Self::merged_operations_and_fragments`] with client-only constructs
    /// removed. Operations that are entirely client-side are omitted.
    pub fn merged_operations_and_fragments_for_service(
        &self,
    ) -> Result<IndexMap<Name, ast::Document>, ProjectError> {
        let merged = self.merged_operations_and_fragments()?;
        Ok(project(merged, &self.capability.projection_options()))
    }

    /// The schema of the latest validation pass.
    #[must_use]
    pub fn composed_schema(&self) -> Option<ComposedSchema> {
        self.state().composed_schema.clone()
    }

    #[must_use]
    pub fn service_schema(&self) -> Option<ServiceSchema> {
        self.state().service_schema.clone()
    }

    /// Diagnostics of the latest validation pass.
    #[must_use]
    pub fn diagnostic_set(&self) -> DiagnosticSet {
        self.state().diagnostics.clone()
    }

    #[must_use]
    pub fn field_latencies(&self) -> Option<FieldLatencies> {
        self.state().field_latencies.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::InMemoryDocumentStore;
    use crate::providers::StaticSchemaProvider;
    use std::sync::Mutex;

    const SERVICE: &str = "type Query { user: User } type User { id: ID! name: String }";

    fn project(store: &Arc<InMemoryDocumentStore>) -> ClientProject {
        ClientProject::new(
            &ProjectConfig::default(),
            store.clone(),
            Arc::new(StaticSchemaProvider::from_sdl(SERVICE, "schema.graphql").unwrap()),
        )
    }

    #[test]
    fn test_validate_without_schema_publishes_nothing() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.set_source(FileUri::new("file:///q.graphql"), "{ user { id } }");
        let project = project(&store);

        let published = Arc::new(Mutex::new(0));
        let counter = published.clone();
        project.observe(|observers| {
            observers.on_diagnostics(move |_, _| *counter.lock().unwrap() += 1);
        });

        project.validate();
        assert_eq!(*published.lock().unwrap(), 0);
        assert!(project.composed_schema().is_none());
    }

    #[tokio::test]
    async fn test_load_schema_validates() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.set_source(FileUri::new("file:///q.graphql"), "{ user { id } }");
        let project = project(&store);

        assert!(project.load_schema(false).await);
        assert!(project.composed_schema().is_some());
        let diagnostics = project.diagnostic_set();
        let sources: Vec<_> = diagnostics
            .get(&FileUri::new("file:///q.graphql"))
            .iter()
            .map(|diagnostic| diagnostic.source.to_string())
            .collect();
        assert_eq!(sources, ["NoAnonymousQueries"]);
    }

    #[test]
    fn test_second_registration_replaces_first() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut observers = ProjectObservers::default();

        let first = calls.clone();
        observers.on_decorations(move |_| first.lock().unwrap().push("first"));
        let second = calls.clone();
        observers.on_decorations(move |_| second.lock().unwrap().push("second"));

        observers.decorations(&[]);
        assert_eq!(*calls.lock().unwrap(), ["second"]);
    }

    #[test]
    fn test_capability_from_config() {
        let config = ClientConfig {
            validation_rules: Some(graphql_config::RuleSelection::Exclude {
                exclude: vec!["NoAnonymousQueries".to_string()],
            }),
            ..ClientConfig::default()
        };
        let capability = ClientCapability::new(&config);
        let names: Vec<_> = capability
            .validation_rules()
            .iter()
            .map(|rule| rule.name())
            .collect();
        assert!(!names.contains(&"NoAnonymousQueries"));

        let options = capability.projection_options();
        assert_eq!(options.client_only_directives, ["connection", "type"]);
        assert_eq!(options.client_schema_directives, ["client", "rest"]);
        assert!(options.add_typename);
    }
}
