//! Service-safe documents: client-only constructs stripped out.

use apollo_compiler::ast;
use apollo_compiler::{name, Name, Node};
use graphql_apollo_ext::{has_any_directive, has_meta_field};
use indexmap::IndexMap;
use std::collections::HashSet;

/// What to strip from documents before they go to the service.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionOptions<'a> {
    /// Directives removed from every node (the nodes stay)
    pub client_only_directives: &'a [String],
    /// Directives whose annotated fields are removed entirely
    pub client_schema_directives: &'a [String],
    /// Insert `__typename` into nested selection sets that lack it
    pub add_typename: bool,
}

impl ProjectionOptions<'_> {
    fn is_identity(&self) -> bool {
        self.client_only_directives.is_empty() && self.client_schema_directives.is_empty()
    }
}

/// Project every operation's merged document to its service-safe form.
///
/// With no directives configured the input is returned untouched. An
/// operation left with nothing to send is omitted from the result.
#[must_use]
pub fn project(
    merged: IndexMap<Name, ast::Document>,
    options: &ProjectionOptions<'_>,
) -> IndexMap<Name, ast::Document> {
    if options.is_identity() {
        return merged;
    }

    merged
        .into_iter()
        .filter_map(|(name, document)| match project_document(document, options) {
            Some(document) => Some((name, document)),
            None => {
                tracing::debug!(operation = %name, "Operation is client-only; not sent to the service");
                None
            }
        })
        .collect()
}

/// Project one document. Returns `None` when no operation survives.
#[must_use]
pub fn project_document(
    mut document: ast::Document,
    options: &ProjectionOptions<'_>,
) -> Option<ast::Document> {
    for definition in &mut document.definitions {
        match definition {
            ast::Definition::OperationDefinition(op) => {
                let op = op.make_mut();
                strip_directives(&mut op.directives, options.client_only_directives);
                filter_selections(&mut op.selection_set, options);
            }
            ast::Definition::FragmentDefinition(fragment) => {
                let fragment = fragment.make_mut();
                strip_directives(&mut fragment.directives, options.client_only_directives);
                filter_selections(&mut fragment.selection_set, options);
            }
            _ => {}
        }
    }

    // Dropping a fragment can empty the selection sets that spread it, so
    // repeat until nothing more is removed.
    loop {
        let removed: HashSet<Name> = document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                ast::Definition::FragmentDefinition(fragment)
                    if fragment.selection_set.is_empty()
                        || has_any_directive(
                            &fragment.directives,
                            options.client_schema_directives,
                        ) =>
                {
                    Some(fragment.name.clone())
                }
                _ => None,
            })
            .collect();
        if removed.is_empty() {
            break;
        }

        document.definitions.retain(|definition| {
            !matches!(definition, ast::Definition::FragmentDefinition(fragment) if removed.contains(&fragment.name))
        });
        for definition in &mut document.definitions {
            match definition {
                ast::Definition::OperationDefinition(op) => {
                    remove_spreads(&mut op.make_mut().selection_set, &removed);
                }
                ast::Definition::FragmentDefinition(fragment) => {
                    remove_spreads(&mut fragment.make_mut().selection_set, &removed);
                }
                _ => {}
            }
        }
    }

    document.definitions.retain(|definition| match definition {
        ast::Definition::OperationDefinition(op) => !op.selection_set.is_empty(),
        _ => true,
    });
    if !document
        .definitions
        .iter()
        .any(|definition| matches!(definition, ast::Definition::OperationDefinition(_)))
    {
        return None;
    }

    if options.add_typename {
        for definition in &mut document.definitions {
            match definition {
                ast::Definition::OperationDefinition(op) => {
                    // The root selection set itself is left alone
                    add_typename_within(&mut op.make_mut().selection_set);
                }
                ast::Definition::FragmentDefinition(fragment) => {
                    add_typename(&mut fragment.make_mut().selection_set);
                }
                _ => {}
            }
        }
    }

    Some(document)
}

fn strip_directives(directives: &mut ast::DirectiveList, names: &[String]) {
    if !names.is_empty() {
        directives
            .0
            .retain(|directive| !names.iter().any(|name| directive.name.as_str() == name.as_str()));
    }
}

/// Remove client-schema annotated selections and client-only directives;
/// selections whose nested selection set becomes empty are removed too.
fn filter_selections(selections: &mut Vec<ast::Selection>, options: &ProjectionOptions<'_>) {
    selections.retain_mut(|selection| match selection {
        ast::Selection::Field(field) => {
            if has_any_directive(&field.directives, options.client_schema_directives) {
                return false;
            }
            let had_selections = !field.selection_set.is_empty();
            let field = field.make_mut();
            strip_directives(&mut field.directives, options.client_only_directives);
            filter_selections(&mut field.selection_set, options);
            !(had_selections && field.selection_set.is_empty())
        }
        ast::Selection::InlineFragment(inline) => {
            if has_any_directive(&inline.directives, options.client_schema_directives) {
                return false;
            }
            let inline = inline.make_mut();
            strip_directives(&mut inline.directives, options.client_only_directives);
            filter_selections(&mut inline.selection_set, options);
            !inline.selection_set.is_empty()
        }
        ast::Selection::FragmentSpread(spread) => {
            if has_any_directive(&spread.directives, options.client_schema_directives) {
                return false;
            }
            strip_directives(
                &mut spread.make_mut().directives,
                options.client_only_directives,
            );
            true
        }
    });
}

fn remove_spreads(selections: &mut Vec<ast::Selection>, removed: &HashSet<Name>) {
    selections.retain_mut(|selection| match selection {
        ast::Selection::FragmentSpread(spread) => !removed.contains(&spread.fragment_name),
        ast::Selection::Field(field) => {
            if field.selection_set.is_empty() {
                return true;
            }
            let field = field.make_mut();
            remove_spreads(&mut field.selection_set, removed);
            !field.selection_set.is_empty()
        }
        ast::Selection::InlineFragment(inline) => {
            let inline = inline.make_mut();
            remove_spreads(&mut inline.selection_set, removed);
            !inline.selection_set.is_empty()
        }
    });
}

/// Add `__typename` to the selection sets nested inside `selection`.
fn add_typename_below(selection: &mut ast::Selection) {
    match selection {
        ast::Selection::Field(field) if !field.selection_set.is_empty() => {
            // An exported field feeds a variable; its own set stays as written
            let exported = has_any_directive(&field.directives, &["export"]);
            let selections = &mut field.make_mut().selection_set;
            if exported {
                add_typename_within(selections);
            } else {
                add_typename(selections);
            }
        }
        ast::Selection::InlineFragment(inline) => {
            add_typename(&mut inline.make_mut().selection_set);
        }
        _ => {}
    }
}

/// Ensure a composite selection set selects `__typename`, then recurse.
/// Sets that already select a meta field are left as they are.
fn add_typename(selections: &mut Vec<ast::Selection>) {
    if !has_meta_field(selections) {
        selections.insert(0, typename_field());
    }
    add_typename_within(selections);
}

fn add_typename_within(selections: &mut [ast::Selection]) {
    for selection in selections {
        add_typename_below(selection);
    }
}

fn typename_field() -> ast::Selection {
    ast::Selection::Field(Node::new(ast::Field {
        alias: None,
        name: name!("__typename"),
        arguments: Vec::new(),
        directives: ast::DirectiveList::default(),
        selection_set: Vec::new(),
    }))
}
