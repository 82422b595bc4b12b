//! Definition filtering utilities for GraphQL documents.
//!
//! This module provides convenient iterators and functions for working with
//! specific kinds of definitions in an `apollo_compiler::ast::Document`.
//!
//! # Example
//!
//! ```
//! use graphql_apollo_ext::DocumentExt;
//! use apollo_compiler::ast::Document;
//!
//! let source = r"
//!     query GetUser { user { id } }
//!     mutation UpdateUser { updateUser { id } }
//!     fragment UserFields on User { name }
//!     extend type User { isLoggedIn: Boolean }
//! ";
//! let document = Document::parse(source, "doc.graphql").unwrap();
//!
//! assert_eq!(document.operations().count(), 2);
//! assert_eq!(document.fragments().count(), 1);
//! assert_eq!(document.type_system_definitions().count(), 1);
//! ```

use apollo_compiler::ast;
use apollo_compiler::Node;
use std::sync::Arc;

/// Extension trait for convenient access to document definitions.
pub trait DocumentExt {
    /// Iterate over all operation definitions in the document.
    fn operations(&self) -> impl Iterator<Item = &Node<ast::OperationDefinition>>;

    /// Iterate over all fragment definitions in the document.
    fn fragments(&self) -> impl Iterator<Item = &Node<ast::FragmentDefinition>>;

    /// Iterate over operation and fragment definitions, in document order.
    fn executable_definitions(&self) -> impl Iterator<Item = &ast::Definition>;

    /// Iterate over type-system definitions and extensions, in document order.
    fn type_system_definitions(&self) -> impl Iterator<Item = &ast::Definition>;

    /// Iterate over all object type extensions in the document.
    fn object_type_extensions(&self) -> impl Iterator<Item = &Node<ast::ObjectTypeExtension>>;

    /// Iterate over all directive definitions in the document.
    fn directive_definitions(&self) -> impl Iterator<Item = &Node<ast::DirectiveDefinition>>;
}

impl DocumentExt for ast::Document {
    fn operations(&self) -> impl Iterator<Item = &Node<ast::OperationDefinition>> {
        self.definitions.iter().filter_map(|def| match def {
            ast::Definition::OperationDefinition(op) => Some(op),
            _ => None,
        })
    }

    fn fragments(&self) -> impl Iterator<Item = &Node<ast::FragmentDefinition>> {
        self.definitions.iter().filter_map(|def| match def {
            ast::Definition::FragmentDefinition(frag) => Some(frag),
            _ => None,
        })
    }

    fn executable_definitions(&self) -> impl Iterator<Item = &ast::Definition> {
        self.definitions
            .iter()
            .filter(|def| def.is_executable_definition())
    }

    fn type_system_definitions(&self) -> impl Iterator<Item = &ast::Definition> {
        self.definitions
            .iter()
            .filter(|def| !def.is_executable_definition())
    }

    fn object_type_extensions(&self) -> impl Iterator<Item = &Node<ast::ObjectTypeExtension>> {
        self.definitions.iter().filter_map(|def| match def {
            ast::Definition::ObjectTypeExtension(ext) => Some(ext),
            _ => None,
        })
    }

    fn directive_definitions(&self) -> impl Iterator<Item = &Node<ast::DirectiveDefinition>> {
        self.definitions.iter().filter_map(|def| match def {
            ast::Definition::DirectiveDefinition(dir) => Some(dir),
            _ => None,
        })
    }
}

/// Build a document that holds the given definitions and shares the source
/// map of `template`, so node locations stay resolvable.
#[must_use]
pub fn document_with(
    template: &ast::Document,
    definitions: impl IntoIterator<Item = ast::Definition>,
) -> ast::Document {
    let mut document = ast::Document::new();
    document.sources = template.sources.clone();
    document.definitions = definitions.into_iter().collect();
    document
}

/// Append definitions taken from `source` to `target`, bringing along the
/// source files they were parsed from.
pub fn append_definitions(
    target: &mut ast::Document,
    source: &ast::Document,
    definitions: impl IntoIterator<Item = ast::Definition>,
) {
    if !Arc::ptr_eq(&target.sources, &source.sources) {
        Arc::make_mut(&mut target.sources)
            .extend(source.sources.iter().map(|(id, file)| (*id, file.clone())));
    }
    target.definitions.extend(definitions);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ast::Document {
        ast::Document::parse(source, "test.graphql").unwrap()
    }

    #[test]
    fn test_operations() {
        let document = parse(
            r"
            query GetUser { user { id } }
            mutation UpdateUser { updateUser { id } }
            subscription OnUpdate { userUpdated { id } }
            ",
        );

        let names: Vec<_> = document
            .operations()
            .filter_map(|op| op.name.as_ref().map(|n| n.to_string()))
            .collect();
        assert_eq!(names, ["GetUser", "UpdateUser", "OnUpdate"]);
    }

    #[test]
    fn test_fragments() {
        let document = parse("fragment A on User { id } fragment B on User { name }");
        let names: Vec<_> = document.fragments().map(|f| f.name.to_string()).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn test_executable_and_type_system_split() {
        let document = parse(
            r"
            type Local { id: ID }
            query Q { user { id } }
            extend type User { isLoggedIn: Boolean }
            directive @local on FIELD
            fragment F on User { id }
            ",
        );

        assert_eq!(document.executable_definitions().count(), 2);
        assert_eq!(document.type_system_definitions().count(), 3);
        assert_eq!(document.object_type_extensions().count(), 1);
        assert_eq!(document.directive_definitions().count(), 1);
    }

    #[test]
    fn test_document_with_keeps_sources() {
        let document = parse("query A { a } query B { b }");
        let subset = document_with(&document, document.definitions[1..].iter().cloned());
        assert_eq!(subset.definitions.len(), 1);
        assert_eq!(subset.sources.len(), document.sources.len());
        let names: Vec<_> = subset.operations().filter_map(|op| op.name.as_deref()).collect();
        assert_eq!(names, ["B"]);
    }

    #[test]
    fn test_append_definitions_merges_sources() {
        let a = ast::Document::parse("query A { a }", "a.graphql").unwrap();
        let b = ast::Document::parse("fragment B on T { b }", "b.graphql").unwrap();

        let mut merged = document_with(&a, a.definitions.iter().cloned());
        append_definitions(&mut merged, &b, b.definitions.iter().cloned());

        assert_eq!(merged.definitions.len(), 2);
        assert!(merged.sources.len() >= 2);
        let fragment = merged.fragments().next().unwrap();
        assert_eq!(fragment.name.as_str(), "B");
        let file_id = fragment.location().unwrap().file_id();
        assert!(merged.sources.contains_key(&file_id));
    }
}
