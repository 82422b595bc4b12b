//! Fragment and operation registry.
//!
//! The maps are rebuilt from the document snapshot on every call. Duplicate
//! names across files are not reported here: the definition seen last wins.

use crate::document::DocumentSet;
use crate::error::AnonymousOperationError;
use apollo_compiler::ast;
use apollo_compiler::{Name, Node};
use graphql_apollo_ext::DocumentExt;
use graphql_types::FileUri;
use indexmap::IndexMap;
use std::sync::Arc;

/// A definition together with the file and document it came from.
#[derive(Debug, Clone)]
pub struct RegistryEntry<T> {
    pub uri: FileUri,
    /// The whole document, for its source map
    pub document: Arc<ast::Document>,
    pub node: Node<T>,
}

pub type FragmentMap = IndexMap<Name, RegistryEntry<ast::FragmentDefinition>>;
pub type OperationMap = IndexMap<Name, RegistryEntry<ast::OperationDefinition>>;

impl RegistryEntry<ast::FragmentDefinition> {
    #[must_use]
    pub fn definition(&self) -> ast::Definition {
        ast::Definition::FragmentDefinition(self.node.clone())
    }
}

impl RegistryEntry<ast::OperationDefinition> {
    #[must_use]
    pub fn definition(&self) -> ast::Definition {
        ast::Definition::OperationDefinition(self.node.clone())
    }

    /// The operation name. Registry entries are always named.
    #[must_use]
    pub fn name(&self) -> Option<&Name> {
        self.node.name.as_ref()
    }
}

/// Read access to the definitions of a document snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Registry<'a> {
    documents: &'a DocumentSet,
}

impl<'a> Registry<'a> {
    #[must_use]
    pub fn new(documents: &'a DocumentSet) -> Self {
        Self { documents }
    }

    /// Every fragment definition by name.
    #[must_use]
    pub fn fragments(&self) -> FragmentMap {
        let mut fragments = FragmentMap::new();
        for (uri, document) in self.documents.parsed() {
            for fragment in document.fragments() {
                if let Some(previous) = fragments.insert(
                    fragment.name.clone(),
                    RegistryEntry {
                        uri: uri.clone(),
                        document: Arc::clone(document),
                        node: fragment.clone(),
                    },
                ) {
                    tracing::trace!(
                        name = %fragment.name,
                        previous = %previous.uri,
                        uri = %uri,
                        "Fragment redefined"
                    );
                }
            }
        }
        fragments
    }

    /// Every operation definition by name.
    ///
    /// Fails on the first anonymous operation found, discarding everything
    /// collected so far.
    pub fn operations(&self) -> Result<OperationMap, AnonymousOperationError> {
        let mut operations = OperationMap::new();
        for (uri, document) in self.documents.parsed() {
            for operation in document.operations() {
                let Some(name) = &operation.name else {
                    return Err(AnonymousOperationError {
                        uri: uri.clone(),
                        operation: operation.clone(),
                    });
                };
                operations.insert(
                    name.clone(),
                    RegistryEntry {
                        uri: uri.clone(),
                        document: Arc::clone(document),
                        node: operation.clone(),
                    },
                );
            }
        }
        Ok(operations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceDocument;

    fn documents(files: &[(&str, &str)]) -> DocumentSet {
        files
            .iter()
            .map(|(uri, source)| SourceDocument::parse(FileUri::new(*uri), source))
            .collect()
    }

    #[test]
    fn test_fragments_and_operations_across_files() {
        let documents = documents(&[
            ("file:///a.graphql", "query A { user { ...F } }"),
            ("file:///b.graphql", "fragment F on User { id } mutation B { x }"),
        ]);
        let registry = Registry::new(&documents);

        let fragments = registry.fragments();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments["F"].uri.as_str(), "file:///b.graphql");

        let operations = registry.operations().unwrap();
        let names: Vec<_> = operations.keys().map(Name::as_str).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn test_anonymous_operation_fails_whole_build() {
        let documents = documents(&[
            ("file:///a.graphql", "query A { a }"),
            ("file:///b.graphql", "{ b }"),
            ("file:///c.graphql", "query C { c }"),
        ]);

        let error = Registry::new(&documents).operations().unwrap_err();
        assert_eq!(error.uri.as_str(), "file:///b.graphql");
        assert!(error.operation.name.is_none());
    }

    #[test]
    fn test_last_definition_wins() {
        let documents = documents(&[
            ("file:///a.graphql", "fragment F on User { id } query Q { a }"),
            ("file:///b.graphql", "fragment F on User { name } query Q { b }"),
        ]);
        let registry = Registry::new(&documents);

        assert_eq!(registry.fragments()["F"].uri.as_str(), "file:///b.graphql");
        assert_eq!(
            registry.operations().unwrap()["Q"].uri.as_str(),
            "file:///b.graphql"
        );
    }

    #[test]
    fn test_unparsed_documents_are_skipped() {
        let documents = documents(&[
            ("file:///a.graphql", "query A {"),
            ("file:///b.graphql", "query B { b }"),
        ]);
        let operations = Registry::new(&documents).operations().unwrap();
        assert_eq!(operations.len(), 1);
    }
}
