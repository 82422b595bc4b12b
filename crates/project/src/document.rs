//! Tracked documents and the store they are read from.

use crate::diagnostics::{apollo_diagnostics, Diagnostic};
use apollo_compiler::ast;
use graphql_types::FileUri;
use indexmap::IndexMap;
use std::sync::{Arc, PoisonError, RwLock};

/// One parsed document of a tracked file.
///
/// `ast` is `None` when the source failed to parse; every pipeline stage
/// skips such documents.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub uri: FileUri,
    pub ast: Option<Arc<ast::Document>>,
}

impl SourceDocument {
    #[must_use]
    pub fn new(uri: FileUri, ast: ast::Document) -> Self {
        Self {
            uri,
            ast: Some(Arc::new(ast)),
        }
    }

    /// A document whose source could not be parsed.
    #[must_use]
    pub fn unparsed(uri: FileUri) -> Self {
        Self { uri, ast: None }
    }

    /// Parse `source`, using the URI as the source path so that node
    /// locations map back to the file.
    #[must_use]
    pub fn parse(uri: FileUri, source: &str) -> Self {
        Self::parse_with_diagnostics(uri, source).0
    }

    /// Parse `source`, also returning the syntax errors that made the AST
    /// unavailable.
    #[must_use]
    pub fn parse_with_diagnostics(uri: FileUri, source: &str) -> (Self, Vec<Diagnostic>) {
        match ast::Document::parse(source, uri.as_str()) {
            Ok(document) => (Self::new(uri, document), Vec::new()),
            Err(with_errors) => {
                tracing::debug!(
                    uri = %uri,
                    error_count = with_errors.errors.len(),
                    "Document failed to parse"
                );
                let diagnostics = apollo_diagnostics(&with_errors.errors, "syntax")
                    .into_iter()
                    .map(|(_, diagnostic)| diagnostic)
                    .collect();
                (Self::unparsed(uri), diagnostics)
            }
        }
    }
}

/// Point-in-time snapshot of every tracked file and its documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    files: IndexMap<FileUri, Vec<SourceDocument>>,
}

impl DocumentSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the documents of a file.
    pub fn insert(&mut self, uri: FileUri, documents: Vec<SourceDocument>) {
        self.files.insert(uri, documents);
    }

    #[must_use]
    pub fn documents(&self, uri: &FileUri) -> &[SourceDocument] {
        self.files.get(uri).map_or(&[], Vec::as_slice)
    }

    /// Every document of every file, in tracking order.
    pub fn all_documents(&self) -> impl Iterator<Item = &SourceDocument> {
        self.files.values().flatten()
    }

    /// Every successfully parsed document with the file it belongs to.
    pub fn parsed(&self) -> impl Iterator<Item = (&FileUri, &Arc<ast::Document>)> {
        self.files.iter().flat_map(|(uri, documents)| {
            documents
                .iter()
                .filter_map(move |document| document.ast.as_ref().map(|ast| (uri, ast)))
        })
    }

    pub fn uris(&self) -> impl Iterator<Item = &FileUri> {
        self.files.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<SourceDocument> for DocumentSet {
    fn from_iter<I: IntoIterator<Item = SourceDocument>>(iter: I) -> Self {
        let mut set = Self::new();
        for document in iter {
            set.files
                .entry(document.uri.clone())
                .or_default()
                .push(document);
        }
        set
    }
}

/// Source of the documents a project tracks.
///
/// Implementations hand out immutable snapshots; the pipeline never holds a
/// store borrow while it works.
pub trait DocumentStore: Send + Sync {
    fn snapshot(&self) -> DocumentSet;
}

impl std::fmt::Debug for dyn DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("files", &self.snapshot().len())
            .finish()
    }
}

/// A [`DocumentStore`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    files: RwLock<DocumentSet>,
}

impl InMemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the documents of a file.
    pub fn set_file(&self, uri: FileUri, documents: Vec<SourceDocument>) {
        tracing::debug!(uri = %uri, documents = documents.len(), "Setting file");
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri, documents);
    }

    /// Parse `source` and track it as the only document of `uri`.
    pub fn set_source(&self, uri: FileUri, source: &str) {
        let document = SourceDocument::parse(uri.clone(), source);
        self.set_file(uri, vec![document]);
    }

    /// Stop tracking a file. Returns whether it was tracked.
    #[must_use]
    pub fn remove_file(&self, uri: &FileUri) -> bool {
        tracing::debug!(uri = %uri, "Removing file");
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .files
            .shift_remove(uri)
            .is_some()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn snapshot(&self) -> DocumentSet {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
