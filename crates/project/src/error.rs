use apollo_compiler::ast;
use apollo_compiler::Node;
use graphql_types::{FileUri, Range};

/// Errors produced by the client project pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error(transparent)]
    Composition(#[from] SchemaCompositionError),

    #[error(transparent)]
    AnonymousOperation(#[from] AnonymousOperationError),

    #[error("Failed to load schema: {0}")]
    SchemaLoad(String),

    #[error("Failed to load usage data: {0}")]
    Usage(String),

    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProjectError>;

/// One problem found while merging client extensions into a service schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionDiagnostic {
    pub message: String,
    /// File the problem originates from, when apollo-compiler reported one
    pub uri: Option<FileUri>,
    pub range: Option<Range>,
}

/// The client extension document is structurally invalid against the
/// service schema, e.g. it extends a type the service does not define.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Client schema extensions could not be composed with the service schema: {}", summary(.diagnostics))]
pub struct SchemaCompositionError {
    pub diagnostics: Vec<CompositionDiagnostic>,
}

fn summary(diagnostics: &[CompositionDiagnostic]) -> String {
    match diagnostics {
        [] => "unknown error".to_string(),
        [only] => only.message.clone(),
        [first, rest @ ..] => format!("{} (and {} more)", first.message, rest.len()),
    }
}

/// An operation without a name was found while building the operation
/// registry.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Anonymous operation in {uri}; every operation must have a name")]
pub struct AnonymousOperationError {
    pub uri: FileUri,
    pub operation: Node<ast::OperationDefinition>,
}
