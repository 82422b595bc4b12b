//! Transitive fragment dependencies of executable definitions.

use crate::registry::{FragmentMap, RegistryEntry};
use apollo_compiler::ast;
use apollo_compiler::Name;
use graphql_apollo_ext::{append_definitions, document_with, fragment_spreads};
use std::collections::{HashSet, VecDeque};

/// Definitions followed by every fragment they transitively spread.
///
/// Ordering is deterministic: the seed definitions first, then fragments in
/// breadth-first discovery order. Spreads of fragments missing from the
/// registry are ignored.
#[derive(Debug, Clone)]
pub struct Closure {
    document: ast::Document,
}

impl Closure {
    /// Closure of one registered operation.
    #[must_use]
    pub fn of_operation(
        operation: &RegistryEntry<ast::OperationDefinition>,
        fragments: &FragmentMap,
    ) -> Self {
        Self::of_definitions(&operation.document, [operation.definition()], fragments)
    }

    /// Closure of `seeds`, all taken from `source`.
    ///
    /// Fragments among the seeds count as already discovered, so they are
    /// not repeated when other seeds spread them.
    #[must_use]
    pub fn of_definitions(
        source: &ast::Document,
        seeds: impl IntoIterator<Item = ast::Definition>,
        fragments: &FragmentMap,
    ) -> Self {
        let mut document = document_with(source, seeds);
        let mut seen: HashSet<Name> = document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                ast::Definition::FragmentDefinition(fragment) => Some(fragment.name.clone()),
                _ => None,
            })
            .collect();

        let mut queue: VecDeque<ast::Definition> = document.definitions.iter().cloned().collect();
        while let Some(definition) = queue.pop_front() {
            for name in fragment_spreads(&definition) {
                if seen.contains(&name) {
                    continue;
                }
                let Some(entry) = fragments.get(&name) else {
                    tracing::trace!(fragment = %name, "Ignoring spread of unknown fragment");
                    continue;
                };
                seen.insert(name);
                let fragment = entry.definition();
                append_definitions(&mut document, &entry.document, [fragment.clone()]);
                queue.push_back(fragment);
            }
        }

        Self { document }
    }

    /// The seed definitions followed by their dependencies.
    #[must_use]
    pub fn definitions(&self) -> &[ast::Definition] {
        &self.document.definitions
    }

    /// Names of the fragments in the closure, in order.
    pub fn fragment_names(&self) -> impl Iterator<Item = &Name> {
        self.document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                ast::Definition::FragmentDefinition(fragment) => Some(&fragment.name),
                _ => None,
            })
    }

    /// The closure as a self-contained document whose source map covers
    /// every file a definition came from.
    #[must_use]
    pub fn document(&self) -> &ast::Document {
        &self.document
    }

    #[must_use]
    pub fn into_document(self) -> ast::Document {
        self.document
    }

    /// Print each definition, separated by blank lines.
    #[must_use]
    pub fn print(&self) -> String {
        self.document
            .definitions
            .iter()
            .map(|definition| definition.serialize().to_string().trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentSet, SourceDocument};
    use crate::registry::Registry;
    use graphql_types::FileUri;

    fn documents(files: &[(&str, &str)]) -> DocumentSet {
        files
            .iter()
            .map(|(uri, source)| SourceDocument::parse(FileUri::new(*uri), source))
            .collect()
    }

    fn closure_names(documents: &DocumentSet, operation: &str) -> Vec<String> {
        let registry = Registry::new(documents);
        let operations = registry.operations().unwrap();
        let closure = Closure::of_operation(&operations[operation], &registry.fragments());
        closure
            .definitions()
            .iter()
            .map(|definition| definition.name().map_or("<anonymous>", Name::as_str).to_string())
            .collect()
    }

    #[test]
    fn test_no_spreads_is_just_the_operation() {
        let documents = documents(&[("file:///q.graphql", "query O { user { id } }")]);
        assert_eq!(closure_names(&documents, "O"), ["O"]);
    }

    #[test]
    fn test_cycle_terminates_with_each_definition_once() {
        let documents = documents(&[(
            "file:///q.graphql",
            r"
            query O { user { ...F1 } }
            fragment F1 on User { ...F2 }
            fragment F2 on User { ...F1 }
            ",
        )]);
        assert_eq!(closure_names(&documents, "O"), ["O", "F1", "F2"]);
    }

    #[test]
    fn test_breadth_first_order_across_files() {
        let documents = documents(&[
            ("file:///q.graphql", "query O { a { ...A } b { ...B } }"),
            ("file:///a.graphql", "fragment A on T { ...C }"),
            ("file:///b.graphql", "fragment B on T { id }"),
            ("file:///c.graphql", "fragment C on T { id }"),
        ]);
        assert_eq!(closure_names(&documents, "O"), ["O", "A", "B", "C"]);
    }

    #[test]
    fn test_unknown_spreads_are_ignored() {
        let documents = documents(&[("file:///q.graphql", "query O { ...Missing a }")]);
        assert_eq!(closure_names(&documents, "O"), ["O"]);
    }

    #[test]
    fn test_seed_fragments_are_not_repeated() {
        let documents = documents(&[
            (
                "file:///q.graphql",
                "query O { ...Local } fragment Local on Query { ...Remote }",
            ),
            ("file:///r.graphql", "fragment Remote on Query { ...Local }"),
        ]);
        let registry = Registry::new(&documents);
        let (_, document) = documents.parsed().next().unwrap();

        let closure = Closure::of_definitions(
            document,
            document.definitions.iter().cloned(),
            &registry.fragments(),
        );
        let fragments: Vec<_> = closure.fragment_names().map(Name::as_str).collect();
        assert_eq!(fragments, ["Local", "Remote"]);
    }

    #[test]
    fn test_print_separates_definitions_with_blank_lines() {
        let documents = documents(&[(
            "file:///q.graphql",
            "query O { user { ...F } } fragment F on User { id }",
        )]);
        let registry = Registry::new(&documents);
        let operations = registry.operations().unwrap();
        let closure = Closure::of_operation(&operations["O"], &registry.fragments());

        insta::assert_snapshot!(closure.print(), @r"
        query O {
          user {
            ...F
          }
        }

        fragment F on User {
          id
        }
        ");
    }

    #[test]
    fn test_closure_locations_resolve_to_original_files() {
        let documents = documents(&[
            ("file:///q.graphql", "query O { ...F }"),
            ("file:///f.graphql", "fragment F on Query { a }"),
        ]);
        let registry = Registry::new(&documents);
        let operations = registry.operations().unwrap();
        let closure = Closure::of_operation(&operations["O"], &registry.fragments());

        let fragment = &closure.definitions()[1];
        let uri = graphql_apollo_ext::uri_of(fragment.location(), &closure.document().sources);
        assert_eq!(uri.as_ref().map(FileUri::as_str), Some("file:///f.graphql"));
    }
}
