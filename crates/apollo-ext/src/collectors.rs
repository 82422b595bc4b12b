//! Collection utilities for executable definitions.
//!
//! Spreads are collected from the definition itself only; nested fragments
//! are not expanded. Callers that need the transitive set walk the result.

use apollo_compiler::ast;
use apollo_compiler::Name;
use indexmap::IndexSet;

/// Names of the fragments spread anywhere inside `definition`, in
/// first-occurrence order. Type-system definitions have none.
#[must_use]
pub fn fragment_spreads(definition: &ast::Definition) -> IndexSet<Name> {
    let mut names = IndexSet::new();
    if let Some(selections) = selection_set_of(definition) {
        collect_spreads(selections, &mut names);
    }
    names
}

fn collect_spreads(selections: &[ast::Selection], names: &mut IndexSet<Name>) {
    for selection in selections {
        match selection {
            ast::Selection::Field(field) => collect_spreads(&field.selection_set, names),
            ast::Selection::FragmentSpread(spread) => {
                names.insert(spread.fragment_name.clone());
            }
            ast::Selection::InlineFragment(inline) => {
                collect_spreads(&inline.selection_set, names);
            }
        }
    }
}

/// The top-level selection set of an operation or fragment definition.
#[must_use]
pub fn selection_set_of(definition: &ast::Definition) -> Option<&[ast::Selection]> {
    match definition {
        ast::Definition::OperationDefinition(op) => Some(&op.selection_set),
        ast::Definition::FragmentDefinition(frag) => Some(&frag.selection_set),
        _ => None,
    }
}

/// Whether the selection set directly selects `__typename` or another
/// `__`-prefixed meta field, aliased or not.
#[must_use]
pub fn has_meta_field(selections: &[ast::Selection]) -> bool {
    selections.iter().any(|selection| {
        matches!(
            selection,
            ast::Selection::Field(field) if field.name.as_str().starts_with("__")
        )
    })
}

/// Whether any directive in `directives` is named in `names`.
#[must_use]
pub fn has_any_directive<S: AsRef<str>>(directives: &ast::DirectiveList, names: &[S]) -> bool {
    directives
        .iter()
        .any(|directive| names.iter().any(|name| directive.name.as_str() == name.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_definition(source: &str) -> ast::Definition {
        let document = ast::Document::parse(source, "test.graphql").unwrap();
        document.definitions[0].clone()
    }

    fn names(set: &IndexSet<Name>) -> Vec<&str> {
        set.iter().map(Name::as_str).collect()
    }

    #[test]
    fn test_fragment_spreads_in_order() {
        let definition = first_definition(
            r"
            query Q {
              user { ...B friends { ...A } }
              ... on Query { ...C }
              ...B
            }
            ",
        );
        assert_eq!(names(&fragment_spreads(&definition)), ["B", "A", "C"]);
    }

    #[test]
    fn test_fragment_spreads_of_fragment_definition() {
        let definition = first_definition("fragment F on User { ...G }");
        assert_eq!(names(&fragment_spreads(&definition)), ["G"]);
    }

    #[test]
    fn test_no_spreads() {
        let definition = first_definition("query Q { user { id } }");
        assert!(fragment_spreads(&definition).is_empty());

        let definition = first_definition("type User { id: ID }");
        assert!(fragment_spreads(&definition).is_empty());
        assert!(selection_set_of(&definition).is_none());
    }

    #[test]
    fn test_has_meta_field() {
        let selects = |source: &str| {
            has_meta_field(selection_set_of(&first_definition(source)).unwrap())
        };

        assert!(selects("query Q { __typename user { id } }"));
        assert!(selects("query Q { kind: __typename }"));
        assert!(selects("query Q { __schema { types { name } } }"));
        // Only the top level counts
        assert!(!selects("query Q { user { __typename id } }"));
    }

    #[test]
    fn test_has_any_directive() {
        let ast::Definition::OperationDefinition(op) =
            first_definition("query Q @client @live { a }")
        else {
            panic!("expected operation");
        };
        assert!(has_any_directive(&op.directives, &["client"]));
        assert!(!has_any_directive(&op.directives, &["connection", "rest"]));
        assert!(!has_any_directive::<&str>(&op.directives, &[]));
    }
}
