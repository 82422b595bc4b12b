//! Diagnostics and their per-file aggregation.

use crate::compose::{compose, ComposedSchema, ServiceSchema};
use crate::document::DocumentSet;
use crate::registry::FragmentMap;
use crate::rules::{RuleContext, ValidationRule};
use apollo_compiler::ast;
use apollo_compiler::diagnostic::ToCliReport;
use apollo_compiler::validation::DiagnosticList;
use graphql_types::{DiagnosticSeverity, FileUri, Position, Range};
use indexmap::IndexMap;
use std::sync::Arc;

/// A diagnostic attached to a range of a tracked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub message: Arc<str>,
    pub range: Range,
    /// What produced the diagnostic: a rule name, `apollo-compiler`, ...
    pub source: Arc<str>,
    pub code: Option<Arc<str>>,
}

impl Diagnostic {
    #[must_use]
    pub fn error(message: impl Into<Arc<str>>, range: Range, source: impl Into<Arc<str>>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            message: message.into(),
            range,
            source: source.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn warning(
        message: impl Into<Arc<str>>,
        range: Range,
        source: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            ..Self::error(message, range, source)
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Diagnostics grouped by source URI, in insertion order.
///
/// Built append-only during one validation pass and replaced wholesale by
/// the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticSet {
    by_file: IndexMap<FileUri, Vec<Diagnostic>>,
}

impl DiagnosticSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, uri: FileUri, diagnostic: Diagnostic) {
        self.by_file.entry(uri).or_default().push(diagnostic);
    }

    pub fn extend(&mut self, uri: FileUri, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        let mut diagnostics = diagnostics.into_iter().peekable();
        if diagnostics.peek().is_some() {
            self.by_file.entry(uri).or_default().extend(diagnostics);
        }
    }

    /// Diagnostics for one file; empty when the file has none.
    #[must_use]
    pub fn get(&self, uri: &FileUri) -> &[Diagnostic] {
        self.by_file.get(uri).map_or(&[], Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FileUri, &[Diagnostic])> {
        self.by_file
            .iter()
            .map(|(uri, diagnostics)| (uri, diagnostics.as_slice()))
    }

    pub fn uris(&self) -> impl Iterator<Item = &FileUri> {
        self.by_file.keys()
    }

    /// Total number of diagnostics across all files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_file.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.by_file
            .values()
            .flatten()
            .filter(|diagnostic| diagnostic.severity.is_error())
            .count()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

/// Convert apollo-compiler diagnostics, pairing each with the file it
/// points into (when it has a location).
pub(crate) fn apollo_diagnostics(
    errors: &DiagnosticList,
    source: &str,
) -> Vec<(Option<FileUri>, Diagnostic)> {
    errors
        .iter()
        .map(|apollo_diag| {
            let uri = apollo_diag.error.location().and_then(|location| {
                apollo_diag
                    .sources
                    .get(&location.file_id())
                    .map(|source_file| FileUri::new(source_file.path().to_string_lossy()))
            });

            // apollo-compiler positions are 1-indexed
            let range = apollo_diag.line_column_range().map_or_else(Range::default, |range| {
                Range::new(
                    Position::from_one_based(range.start.line, range.start.column),
                    Position::from_one_based(range.end.line, range.end.column),
                )
            });

            let diagnostic = Diagnostic::error(apollo_diag.error.to_string(), range, source);
            (uri, diagnostic)
        })
        .collect()
}

/// Compose the client extensions onto the service schema and validate every
/// tracked document against the result.
///
/// A composition failure does not abort the pass: its diagnostics are
/// reported at the extension's own location and the documents are validated
/// against the bare service schema instead.
#[must_use]
#[tracing::instrument(skip_all, fields(files = documents.len(), rules = rules.len()))]
pub fn validate_project(
    service: &ServiceSchema,
    client_extension: &ast::Document,
    documents: &DocumentSet,
    fragments: &FragmentMap,
    rules: &[Arc<dyn ValidationRule>],
) -> (ComposedSchema, DiagnosticSet) {
    let mut diagnostics = DiagnosticSet::new();

    let composed = match compose(service, client_extension) {
        Ok(composed) => composed,
        Err(error) => {
            tracing::warn!(
                error_count = error.diagnostics.len(),
                "Client schema composition failed; validating against the service schema"
            );
            for problem in error.diagnostics {
                match problem.uri {
                    Some(uri) => diagnostics.push(
                        uri,
                        Diagnostic::error(
                            problem.message,
                            problem.range.unwrap_or_default(),
                            "schema",
                        ),
                    ),
                    None => {
                        tracing::warn!(message = %problem.message, "Composition error without a location");
                    }
                }
            }
            ComposedSchema::service_only(service)
        }
    };

    validate(&composed, documents, fragments, rules, &mut diagnostics);
    (composed, diagnostics)
}

/// Run `rules` over every parsed document, appending to `diagnostics` under
/// the document's URI. Unparsed documents contribute nothing.
pub fn validate(
    schema: &ComposedSchema,
    documents: &DocumentSet,
    fragments: &FragmentMap,
    rules: &[Arc<dyn ValidationRule>],
    diagnostics: &mut DiagnosticSet,
) {
    for (uri, document) in documents.parsed() {
        let context = RuleContext {
            schema,
            uri,
            document,
            fragments,
        };

        let mut found = Vec::new();
        for rule in rules {
            rule.check(&context, &mut found);
        }

        tracing::debug!(uri = %uri, count = found.len(), "Validated document");
        diagnostics.extend(uri.clone(), found);
    }
}
