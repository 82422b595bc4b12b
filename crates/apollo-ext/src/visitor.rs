//! Visitor pattern for executable GraphQL AST traversal.
//!
//! This module provides a visitor trait that allows traversing the
//! executable definitions of an `apollo_compiler::ast::Document` with custom
//! logic at each node type. Default implementations do nothing, so you only
//! need to override the methods you care about.
//!
//! When a schema is supplied, the walk tracks the parent type of every
//! selection: the root operation type for an operation, the type condition
//! for fragments, and the named return type of each field for its nested
//! selections. Without a schema (or when a lookup fails) the parent type
//! is `None` for everything below the point where it became unknown.
//!
//! # Example
//!
//! ```
//! use graphql_apollo_ext::{walk_document, AstVisitor};
//! use apollo_compiler::{ast, Name, Node, Schema};
//!
//! let schema = Schema::parse("type Query { user: User } type User { id: ID }", "s.graphql").unwrap();
//! let document = ast::Document::parse("query Q { user { id } }", "q.graphql").unwrap();
//!
//! #[derive(Default)]
//! struct Coordinates(Vec<String>);
//!
//! impl AstVisitor for Coordinates {
//!     fn enter_field(&mut self, field: &Node<ast::Field>, parent_type: Option<&Name>) {
//!         let parent = parent_type.map_or("?", |name| name.as_str());
//!         self.0.push(format!("{parent}.{}", field.name));
//!     }
//! }
//!
//! let mut visitor = Coordinates::default();
//! walk_document(&mut visitor, Some(&schema), &document);
//! assert_eq!(visitor.0, ["Query.user", "User.id"]);
//! ```

use apollo_compiler::ast;
use apollo_compiler::{Name, Node, Schema};

/// A visitor for executable AST nodes.
///
/// Methods prefixed with `enter_` are called before visiting children,
/// and `exit_` methods are called after. Simple `visit_` methods are called
/// once without separate enter/exit phases.
#[allow(unused_variables)]
pub trait AstVisitor {
    /// Called when entering an operation definition
    fn enter_operation(&mut self, op: &Node<ast::OperationDefinition>) {}

    /// Called when exiting an operation definition
    fn exit_operation(&mut self, op: &Node<ast::OperationDefinition>) {}

    /// Called when entering a fragment definition
    fn enter_fragment_definition(&mut self, frag: &Node<ast::FragmentDefinition>) {}

    /// Called when exiting a fragment definition
    fn exit_fragment_definition(&mut self, frag: &Node<ast::FragmentDefinition>) {}

    /// Called for each field, with the type the field is selected on
    fn enter_field(&mut self, field: &Node<ast::Field>, parent_type: Option<&Name>) {}

    /// Called after a field's nested selections have been visited
    fn exit_field(&mut self, field: &Node<ast::Field>, parent_type: Option<&Name>) {}

    /// Called for each fragment spread (`...FragmentName`)
    fn visit_fragment_spread(
        &mut self,
        spread: &Node<ast::FragmentSpread>,
        parent_type: Option<&Name>,
    ) {
    }

    /// Called when entering an inline fragment (`... on Type { }`)
    fn enter_inline_fragment(
        &mut self,
        inline: &Node<ast::InlineFragment>,
        parent_type: Option<&Name>,
    ) {
    }

    /// Called when exiting an inline fragment
    fn exit_inline_fragment(
        &mut self,
        inline: &Node<ast::InlineFragment>,
        parent_type: Option<&Name>,
    ) {
    }
}

/// Walk every executable definition of a document.
///
/// Type-system definitions are skipped.
pub fn walk_document<V: AstVisitor>(
    visitor: &mut V,
    schema: Option<&Schema>,
    document: &ast::Document,
) {
    for definition in &document.definitions {
        match definition {
            ast::Definition::OperationDefinition(op) => walk_operation(visitor, schema, op),
            ast::Definition::FragmentDefinition(frag) => {
                walk_fragment_definition(visitor, schema, frag);
            }
            _ => {}
        }
    }
}

/// Walk an operation definition.
pub fn walk_operation<V: AstVisitor>(
    visitor: &mut V,
    schema: Option<&Schema>,
    op: &Node<ast::OperationDefinition>,
) {
    visitor.enter_operation(op);

    let root = schema.and_then(|schema| schema.root_operation(op.operation_type));
    walk_selection_set(visitor, schema, root, &op.selection_set);

    visitor.exit_operation(op);
}

/// Walk a fragment definition.
pub fn walk_fragment_definition<V: AstVisitor>(
    visitor: &mut V,
    schema: Option<&Schema>,
    frag: &Node<ast::FragmentDefinition>,
) {
    visitor.enter_fragment_definition(frag);

    let parent = schema
        .is_some_and(|schema| schema.types.contains_key(&frag.type_condition))
        .then_some(&frag.type_condition);
    walk_selection_set(visitor, schema, parent, &frag.selection_set);

    visitor.exit_fragment_definition(frag);
}

/// Walk a selection set whose selections are made on `parent_type`.
pub fn walk_selection_set<V: AstVisitor>(
    visitor: &mut V,
    schema: Option<&Schema>,
    parent_type: Option<&Name>,
    selections: &[ast::Selection],
) {
    for selection in selections {
        match selection {
            ast::Selection::Field(field) => walk_field(visitor, schema, parent_type, field),
            ast::Selection::FragmentSpread(spread) => {
                visitor.visit_fragment_spread(spread, parent_type);
            }
            ast::Selection::InlineFragment(inline) => {
                walk_inline_fragment(visitor, schema, parent_type, inline);
            }
        }
    }
}

/// Walk a field selection.
pub fn walk_field<V: AstVisitor>(
    visitor: &mut V,
    schema: Option<&Schema>,
    parent_type: Option<&Name>,
    field: &Node<ast::Field>,
) {
    visitor.enter_field(field, parent_type);

    if !field.selection_set.is_empty() {
        let field_type = field_type(schema, parent_type, &field.name);
        walk_selection_set(visitor, schema, field_type, &field.selection_set);
    }

    visitor.exit_field(field, parent_type);
}

/// Walk an inline fragment.
pub fn walk_inline_fragment<V: AstVisitor>(
    visitor: &mut V,
    schema: Option<&Schema>,
    parent_type: Option<&Name>,
    inline: &Node<ast::InlineFragment>,
) {
    visitor.enter_inline_fragment(inline, parent_type);

    let inner = match &inline.type_condition {
        Some(condition) => schema
            .is_some_and(|schema| schema.types.contains_key(condition))
            .then_some(condition),
        None => parent_type,
    };
    walk_selection_set(visitor, schema, inner, &inline.selection_set);

    visitor.exit_inline_fragment(inline, parent_type);
}

/// The named (unwrapped) return type of `parent_type.field_name`.
fn field_type<'schema>(
    schema: Option<&'schema Schema>,
    parent_type: Option<&Name>,
    field_name: &Name,
) -> Option<&'schema Name> {
    let schema = schema?;
    let parent_type = parent_type?;
    schema
        .type_field(parent_type, field_name)
        .ok()
        .map(|definition| definition.ty.inner_named_type())
}
