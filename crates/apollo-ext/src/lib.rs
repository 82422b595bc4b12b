//! Extensions for `apollo-compiler` ASTs: visitor pattern, definition
//! iterators, collection utilities, and source location conversion.
//!
//! This crate provides:
//! - **Type-tracking visitor** for walking executable definitions with the
//!   parent type of every selection resolved against a schema
//! - **Definition iterators** for filtering document definitions
//! - **Collection utilities** for gathering fragment spreads and directive usage
//! - **Location helpers** for turning AST locations into editor ranges
//!
//! # Example
//!
//! ```
//! use graphql_apollo_ext::{walk_document, AstVisitor};
//! use apollo_compiler::ast;
//! use apollo_compiler::{Name, Node};
//!
//! struct FieldCounter(usize);
//!
//! impl AstVisitor for FieldCounter {
//!     fn enter_field(&mut self, _field: &Node<ast::Field>, _parent_type: Option<&Name>) {
//!         self.0 += 1;
//!     }
//! }
//!
//! let document = ast::Document::parse("query Q { user { name email } }", "q.graphql").unwrap();
//! let mut counter = FieldCounter(0);
//! walk_document(&mut counter, None, &document);
//! assert_eq!(counter.0, 3); // user, name, email
//! ```

mod collectors;
mod definitions;
mod location;
mod visitor;

pub use collectors::*;
pub use definitions::*;
pub use location::*;
pub use visitor::*;
