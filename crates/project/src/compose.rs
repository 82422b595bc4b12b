//! Schema composition: service schema + client extensions.

use crate::diagnostics::apollo_diagnostics;
use crate::document::DocumentSet;
use crate::error::{CompositionDiagnostic, ProjectError, SchemaCompositionError};
use apollo_compiler::ast;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::{DiagnosticList, Valid};
use apollo_compiler::{Name, Schema};
use graphql_apollo_ext::{append_definitions, DocumentExt};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Directives every client project understands unless it defines its own.
pub const CLIENT_DIRECTIVES_SDL: &str = r#""Direct the client to resolve this field locally, either from the cache or local resolvers."
directive @client(
  "When true, the client will never use the cache for this value."
  always: Boolean
) on FIELD | FRAGMENT_DEFINITION | INLINE_FRAGMENT

"Export this locally resolved field as a variable to be used in the remainder of this query."
directive @export(
  "The variable name to export this field as."
  as: String!
) on FIELD

"Specify a custom store key for this result."
directive @connection(
  "Specify the store key."
  key: String!
  "An array of query argument names to include in the generated custom store key."
  filter: [String!]
) on FIELD

"Exclude the field from the reactive tracking of its enclosing query."
directive @nonreactive on FIELD

"Treat a masked fragment spread as unmasked."
directive @unmask(
  "Set to `migrate` to warn when masked fields are accessed."
  mode: String
) on FRAGMENT_SPREAD
"#;

const CLIENT_DIRECTIVES_PATH: &str = "graphql-client:/client-directives.graphql";

static REPRINTED_SCHEMAS: AtomicU64 = AtomicU64::new(0);

/// The authoritative schema provided by the service.
///
/// The source AST is kept when the schema came from SDL text so that
/// composed-schema locations point back into it. Schemas built some other
/// way (e.g. from introspection) have none and are reprinted on demand.
#[derive(Debug, Clone)]
pub struct ServiceSchema {
    schema: Arc<Valid<Schema>>,
    ast: Option<Arc<ast::Document>>,
}

impl ServiceSchema {
    /// Parse and validate service SDL.
    pub fn parse(sdl: &str, path: impl AsRef<Path>) -> crate::Result<Self> {
        let document = ast::Document::parse(sdl, path.as_ref())
            .map_err(|with_errors| ProjectError::SchemaLoad(error_summary(&with_errors.errors)))?;
        let schema = Schema::builder()
            .add_ast(&document)
            .build()
            .map_err(|with_errors| ProjectError::SchemaLoad(error_summary(&with_errors.errors)))?
            .validate()
            .map_err(|with_errors| ProjectError::SchemaLoad(error_summary(&with_errors.errors)))?;

        tracing::debug!(types = schema.types.len(), "Parsed service schema");
        Ok(Self {
            schema: Arc::new(schema),
            ast: Some(Arc::new(document)),
        })
    }

    /// Wrap an already-built schema that has no source text.
    #[must_use]
    pub fn from_schema(schema: Valid<Schema>) -> Self {
        Self {
            schema: Arc::new(schema),
            ast: None,
        }
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<Valid<Schema>> {
        &self.schema
    }

    #[must_use]
    pub fn ast(&self) -> Option<&Arc<ast::Document>> {
        self.ast.as_ref()
    }

    /// The schema's source AST, reprinting and reparsing the schema from a
    /// fresh synthetic source when there is none.
    pub fn fidelity_ast(&self) -> Result<Arc<ast::Document>, SchemaCompositionError> {
        if let Some(ast) = &self.ast {
            return Ok(Arc::clone(ast));
        }

        let id = REPRINTED_SCHEMAS.fetch_add(1, Ordering::Relaxed);
        let path = format!("graphql-schema:/service-schema-{id}.graphql");
        tracing::debug!(path, "Reprinting service schema without source text");

        let sdl = self.schema.serialize().to_string();
        ast::Document::parse(sdl, path)
            .map(Arc::new)
            .map_err(|with_errors| composition_error(&with_errors.errors))
    }
}

/// Client metadata for one object type of the composed schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSchemaInfo {
    /// Fields added to the type by client extensions
    pub local_fields: Vec<Name>,
}

/// A service schema with client extensions applied.
#[derive(Debug, Clone)]
pub struct ComposedSchema {
    schema: Arc<Valid<Schema>>,
    client_info: IndexMap<Name, ClientSchemaInfo>,
    injected_directives: Vec<Name>,
}

impl ComposedSchema {
    /// The bare service schema, used when composition fails.
    #[must_use]
    pub fn service_only(service: &ServiceSchema) -> Self {
        Self {
            schema: Arc::clone(service.schema()),
            client_info: IndexMap::new(),
            injected_directives: Vec::new(),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<Valid<Schema>> {
        &self.schema
    }

    /// Client metadata for a type; `None` when no extension touched it.
    #[must_use]
    pub fn client_schema(&self, type_name: &str) -> Option<&ClientSchemaInfo> {
        self.client_info.get(type_name)
    }

    pub fn client_schemas(&self) -> impl Iterator<Item = (&Name, &ClientSchemaInfo)> {
        self.client_info.iter()
    }

    /// Whether `type_name.field_name` was added by a client extension.
    #[must_use]
    pub fn is_local_field(&self, type_name: &str, field_name: &str) -> bool {
        self.client_schema(type_name).is_some_and(|info| {
            info.local_fields
                .iter()
                .any(|field| field.as_str() == field_name)
        })
    }

    /// Names of the standard client directives that were injected.
    #[must_use]
    pub fn injected_directives(&self) -> &[Name] {
        &self.injected_directives
    }
}

/// Gather every type-system definition found in tracked documents (plus an
/// optional local schema file) into one client extension document.
#[must_use]
pub fn client_extension_document(
    documents: &DocumentSet,
    local_schema: Option<&ast::Document>,
) -> ast::Document {
    let mut extension = ast::Document::new();
    for document in local_schema
        .into_iter()
        .chain(documents.parsed().map(|(_, ast)| ast.as_ref()))
    {
        let definitions: Vec<_> = document.type_system_definitions().cloned().collect();
        if !definitions.is_empty() {
            append_definitions(&mut extension, document, definitions);
        }
    }
    extension
}

/// Merge `client_extension` into the service schema.
///
/// The standard client directives are injected only when none of their
/// names is already taken by the service schema or by a directive the
/// extension document declares.
#[tracing::instrument(skip_all, fields(extension_definitions = client_extension.definitions.len()))]
pub fn compose(
    service: &ServiceSchema,
    client_extension: &ast::Document,
) -> Result<ComposedSchema, SchemaCompositionError> {
    let service_ast = service.fidelity_ast()?;
    let library = ast::Document::parse(CLIENT_DIRECTIVES_SDL, CLIENT_DIRECTIVES_PATH)
        .map_err(|with_errors| composition_error(&with_errors.errors))?;

    let taken: HashSet<&str> = service
        .schema()
        .directive_definitions
        .keys()
        .map(Name::as_str)
        .chain(
            client_extension
                .directive_definitions()
                .map(|directive| directive.name.as_str()),
        )
        .collect();
    let library_names: Vec<Name> = library
        .directive_definitions()
        .map(|directive| directive.name.clone())
        .collect();
    let inject = library_names
        .iter()
        .all(|name| !taken.contains(name.as_str()));

    let mut builder = Schema::builder().add_ast(&service_ast);
    if inject {
        builder = builder.add_ast(&library);
    } else {
        tracing::debug!("Standard client directives collide with existing names; not injecting");
    }
    builder = builder.add_ast(&type_system_only(client_extension));

    let schema = builder
        .build()
        .map_err(|with_errors| composition_error(&with_errors.errors))?
        .validate()
        .map_err(|with_errors| composition_error(&with_errors.errors))?;

    let mut client_info: IndexMap<Name, ClientSchemaInfo> = IndexMap::new();
    for extension in client_extension.object_type_extensions() {
        if !matches!(schema.types.get(&extension.name), Some(ExtendedType::Object(_))) {
            continue;
        }
        client_info
            .entry(extension.name.clone())
            .or_default()
            .local_fields
            .extend(extension.fields.iter().map(|field| field.name.clone()));
    }

    tracing::debug!(
        types = schema.types.len(),
        extended_types = client_info.len(),
        injected = inject,
        "Composed client schema"
    );

    Ok(ComposedSchema {
        schema: Arc::new(schema),
        client_info,
        injected_directives: if inject { library_names } else { Vec::new() },
    })
}

fn type_system_only(document: &ast::Document) -> ast::Document {
    graphql_apollo_ext::document_with(document, document.type_system_definitions().cloned())
}

fn composition_error(errors: &DiagnosticList) -> SchemaCompositionError {
    let diagnostics = apollo_diagnostics(errors, "schema")
        .into_iter()
        .map(|(uri, diagnostic)| CompositionDiagnostic {
            message: diagnostic.message.to_string(),
            range: uri.is_some().then_some(diagnostic.range),
            uri,
        })
        .collect();
    SchemaCompositionError { diagnostics }
}

fn error_summary(errors: &DiagnosticList) -> String {
    errors
        .iter()
        .map(|diagnostic| diagnostic.error.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
