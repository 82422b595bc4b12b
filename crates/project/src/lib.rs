//! Project model for GraphQL client projects.
//!
//! A client project validates query, mutation and fragment documents
//! against a service schema extended with client-only types, fields and
//! directives. From the tracked documents it derives:
//!
//! - a **composed schema**: the service schema plus client extensions, with
//!   the standard client directives injected when their names are free
//! - **fragment closures**: each operation with every fragment it
//!   transitively spreads
//! - **service documents**: operations with client-only constructs removed
//! - **diagnostics** grouped by file
//! - **decorations**: field latency hints and run-in-explorer links
//!
//! # Example
//!
//! ```
//! use graphql_client_project::{
//!     compose, Closure, ProjectionOptions, Registry, ServiceSchema, SourceDocument, DocumentSet,
//! };
//! use graphql_types::FileUri;
//!
//! let service = ServiceSchema::parse(
//!     "type Query { user: User } type User { id: ID! }",
//!     "schema.graphql",
//! )?;
//!
//! let documents: DocumentSet = [
//!     SourceDocument::parse(
//!         FileUri::new("file:///user.graphql"),
//!         "query User { user { ...UserFields isLoggedIn @client } }",
//!     ),
//!     SourceDocument::parse(
//!         FileUri::new("file:///fragments.graphql"),
//!         "fragment UserFields on User { id }\nextend type User { isLoggedIn: Boolean }",
//!     ),
//! ]
//! .into_iter()
//! .collect();
//!
//! let extension = graphql_client_project::client_extension_document(&documents, None);
//! let composed = compose(&service, &extension)?;
//! assert!(composed.is_local_field("User", "isLoggedIn"));
//!
//! let registry = Registry::new(&documents);
//! let operations = registry.operations()?;
//! let closure = Closure::of_operation(&operations["User"], &registry.fragments());
//! assert_eq!(closure.fragment_names().count(), 1);
//! # Ok::<(), graphql_client_project::ProjectError>(())
//! ```

mod closure;
mod compose;
mod decorations;
mod diagnostics;
mod document;
mod engine;
mod error;
mod loading;
mod project;
mod projection;
mod providers;
mod registry;
mod rules;

pub use closure::Closure;
pub use compose::{
    client_extension_document, compose, ClientSchemaInfo, ComposedSchema, ServiceSchema,
    CLIENT_DIRECTIVES_SDL,
};
pub use decorations::{
    decorate, explorer_url_state, format_ms, Decoration, ExplorerLinkContext, FieldLatencies,
    LinkError, DEFAULT_FRONTEND_URL_ROOT,
};
pub use diagnostics::{validate, validate_project, Diagnostic, DiagnosticSet};
pub use document::{DocumentSet, DocumentStore, InMemoryDocumentStore, SourceDocument};
pub use engine::EngineClient;
pub use error::{
    AnonymousOperationError, CompositionDiagnostic, ProjectError, Result, SchemaCompositionError,
};
pub use loading::{LoadingHandler, LoadingNotifier, TracingNotifier};
pub use project::{
    ClientCapability, ClientProject, ProjectCapability, ProjectCore, ProjectObservers,
};
pub use projection::{project, project_document, ProjectionOptions};
pub use providers::{
    FileSchemaProvider, NoUsageProvider, SchemaProvider, SchemaResolveConfig,
    StaticSchemaProvider, UsageData, UsageProvider,
};
pub use registry::{FragmentMap, OperationMap, Registry, RegistryEntry};
pub use rules::{
    default_rules, resolve_validation_rules, rule_by_name, ExecutableValidation,
    NoAnonymousQueries, NoMissingClientDirectives, NoTypenameAlias, RuleContext, RulesOverride,
    ValidationRule,
};
