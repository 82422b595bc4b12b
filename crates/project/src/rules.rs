//! Validation rules run by the diagnostics aggregator.

use crate::closure::Closure;
use crate::compose::ComposedSchema;
use crate::diagnostics::{apollo_diagnostics, Diagnostic};
use crate::registry::FragmentMap;
use apollo_compiler::ast;
use apollo_compiler::validation::{DiagnosticList, Valid};
use apollo_compiler::{ExecutableDocument, Name, Node, Schema};
use graphql_apollo_ext::{has_any_directive, range_of, walk_document, AstVisitor, DocumentExt};
use graphql_config::RuleSelection;
use graphql_types::{FileUri, Range};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Everything a rule may look at while checking one document.
pub struct RuleContext<'a> {
    pub schema: &'a ComposedSchema,
    pub uri: &'a FileUri,
    pub document: &'a ast::Document,
    /// Every fragment in the project, for cross-file resolution
    pub fragments: &'a FragmentMap,
}

impl RuleContext<'_> {
    fn range_of<T>(&self, node: &Node<T>) -> Range {
        range_of(node.location(), &self.document.sources).unwrap_or_default()
    }
}

/// A check over one document against the composed schema.
pub trait ValidationRule: Send + Sync {
    /// Stable name, used to select rules from configuration
    fn name(&self) -> &'static str;

    fn check(&self, context: &RuleContext<'_>, diagnostics: &mut Vec<Diagnostic>);
}

impl fmt::Debug for dyn ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every operation must be named.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnonymousQueries;

impl ValidationRule for NoAnonymousQueries {
    fn name(&self) -> &'static str {
        "NoAnonymousQueries"
    }

    fn check(&self, context: &RuleContext<'_>, diagnostics: &mut Vec<Diagnostic>) {
        for operation in context.document.operations() {
            if operation.name.is_none() {
                diagnostics.push(Diagnostic::error(
                    "Anonymous operations are not supported; every operation needs a name",
                    context.range_of(operation),
                    self.name(),
                ));
            }
        }
    }
}

/// No field may be aliased to `__typename`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTypenameAlias;

impl ValidationRule for NoTypenameAlias {
    fn name(&self) -> &'static str {
        "NoTypenameAlias"
    }

    fn check(&self, context: &RuleContext<'_>, diagnostics: &mut Vec<Diagnostic>) {
        struct Visitor<'a, 'b> {
            context: &'a RuleContext<'b>,
            diagnostics: &'a mut Vec<Diagnostic>,
        }

        impl AstVisitor for Visitor<'_, '_> {
            fn enter_field(&mut self, field: &Node<ast::Field>, _parent_type: Option<&Name>) {
                if field
                    .alias
                    .as_ref()
                    .is_some_and(|alias| alias.as_str() == "__typename")
                {
                    self.diagnostics.push(Diagnostic::error(
                        format!(
                            "Field `{}` is aliased to `__typename`, which is reserved for the type name",
                            field.name
                        ),
                        self.context.range_of(field),
                        NoTypenameAlias.name(),
                    ));
                }
            }
        }

        walk_document(
            &mut Visitor {
                context,
                diagnostics,
            },
            None,
            context.document,
        );
    }
}

/// Fields added by client extensions must be resolved with `@client`, on the
/// field itself or on an enclosing field, inline fragment or fragment
/// definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMissingClientDirectives;

impl ValidationRule for NoMissingClientDirectives {
    fn name(&self) -> &'static str {
        "NoMissingClientDirectives"
    }

    fn check(&self, context: &RuleContext<'_>, diagnostics: &mut Vec<Diagnostic>) {
        struct Visitor<'a, 'b> {
            context: &'a RuleContext<'b>,
            diagnostics: &'a mut Vec<Diagnostic>,
            // One entry per enclosing scope: whether @client applies there
            client_scopes: Vec<bool>,
        }

        impl Visitor<'_, '_> {
            fn in_client_scope(&self) -> bool {
                self.client_scopes.last().copied().unwrap_or(false)
            }
        }

        impl AstVisitor for Visitor<'_, '_> {
            fn enter_operation(&mut self, _op: &Node<ast::OperationDefinition>) {
                self.client_scopes.clear();
            }

            fn enter_fragment_definition(&mut self, frag: &Node<ast::FragmentDefinition>) {
                self.client_scopes.clear();
                self.client_scopes.push(has_any_directive(&frag.directives, &["client"]));
            }

            fn enter_field(&mut self, field: &Node<ast::Field>, parent_type: Option<&Name>) {
                let is_client =
                    self.in_client_scope() || has_any_directive(&field.directives, &["client"]);
                if !is_client {
                    if let Some(parent_type) = parent_type {
                        if self
                            .context
                            .schema
                            .is_local_field(parent_type, &field.name)
                        {
                            self.diagnostics.push(Diagnostic::error(
                                format!(
                                    "Local field `{parent_type}.{}` must have a @client directive",
                                    field.name
                                ),
                                self.context.range_of(field),
                                NoMissingClientDirectives.name(),
                            ));
                        }
                    }
                }
                self.client_scopes.push(is_client);
            }

            fn exit_field(&mut self, _field: &Node<ast::Field>, _parent_type: Option<&Name>) {
                self.client_scopes.pop();
            }

            fn enter_inline_fragment(
                &mut self,
                inline: &Node<ast::InlineFragment>,
                _parent_type: Option<&Name>,
            ) {
                let is_client =
                    self.in_client_scope() || has_any_directive(&inline.directives, &["client"]);
                self.client_scopes.push(is_client);
            }

            fn exit_inline_fragment(
                &mut self,
                _inline: &Node<ast::InlineFragment>,
                _parent_type: Option<&Name>,
            ) {
                self.client_scopes.pop();
            }
        }

        let mut visitor = Visitor {
            context,
            diagnostics,
            client_scopes: Vec::new(),
        };
        let schema: &Schema = context.schema.schema();
        walk_document(&mut visitor, Some(schema), context.document);
    }
}

/// Full executable-document validation by apollo-compiler.
///
/// Fragments defined in other files are brought in so spreads resolve.
/// "Unused fragment" errors are dropped because a fragment may be used
/// from another file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutableValidation;

impl ValidationRule for ExecutableValidation {
    fn name(&self) -> &'static str {
        "ExecutableValidation"
    }

    fn check(&self, context: &RuleContext<'_>, diagnostics: &mut Vec<Diagnostic>) {
        let local: Vec<ast::Definition> =
            context.document.executable_definitions().cloned().collect();
        if local.is_empty() {
            return;
        }
        let local_fragments: HashSet<Name> = context
            .document
            .fragments()
            .map(|fragment| fragment.name.clone())
            .collect();

        let closure =
            Closure::of_definitions(context.document, local.iter().cloned(), context.fragments);
        let main = graphql_apollo_ext::document_with(context.document, local);
        let mut external = ast::Document::new();
        for definition in closure.definitions() {
            if let ast::Definition::FragmentDefinition(fragment) = definition {
                if !local_fragments.contains(&fragment.name) {
                    external.definitions.push(definition.clone());
                }
            }
        }
        external.sources = closure.document().sources.clone();

        let schema: &Valid<Schema> = context.schema.schema();
        let mut errors = DiagnosticList::new(Arc::default());
        let mut builder = ExecutableDocument::builder(Some(schema), &mut errors);
        builder.add_ast_document(&main, true);
        if !external.definitions.is_empty() {
            builder.add_ast_document(&external, false);
        }
        let document = builder.build();

        let errors = if errors.is_empty() {
            match document.validate(schema) {
                Ok(_) => return,
                Err(with_errors) => with_errors.errors,
            }
        } else {
            errors
        };

        for (uri, diagnostic) in apollo_diagnostics(&errors, "apollo-compiler") {
            if uri.as_ref().is_some_and(|uri| uri != context.uri) {
                continue;
            }
            if diagnostic.message.contains("must be used in an operation") {
                continue;
            }
            diagnostics.push(diagnostic);
        }
    }
}

/// The rules run when configuration does not say otherwise, in order.
#[must_use]
pub fn default_rules() -> Vec<Arc<dyn ValidationRule>> {
    vec![
        Arc::new(NoAnonymousQueries),
        Arc::new(NoTypenameAlias),
        Arc::new(NoMissingClientDirectives),
        Arc::new(ExecutableValidation),
    ]
}

/// Look up a built-in rule by its name.
#[must_use]
pub fn rule_by_name(name: &str) -> Option<Arc<dyn ValidationRule>> {
    default_rules().into_iter().find(|rule| rule.name() == name)
}

/// A replacement for the default rule list.
pub enum RulesOverride {
    /// Keep the defaults this predicate accepts
    Filter(Box<dyn Fn(&dyn ValidationRule) -> bool + Send + Sync>),
    /// Use exactly these rules
    List(Vec<Arc<dyn ValidationRule>>),
}

impl fmt::Debug for RulesOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter(_) => f.write_str("Filter(..)"),
            Self::List(rules) => f.debug_tuple("List").field(rules).finish(),
        }
    }
}

impl RulesOverride {
    /// The override a configured rule selection describes.
    ///
    /// Unknown names in an explicit list are logged and skipped.
    #[must_use]
    pub fn from_selection(selection: &RuleSelection) -> Self {
        match selection {
            RuleSelection::Only(names) => Self::List(
                names
                    .iter()
                    .filter_map(|name| {
                        let rule = rule_by_name(name);
                        if rule.is_none() {
                            tracing::warn!(rule = %name, "Unknown validation rule; skipping");
                        }
                        rule
                    })
                    .collect(),
            ),
            RuleSelection::Exclude { exclude } => {
                let exclude = exclude.clone();
                Self::Filter(Box::new(move |rule| {
                    !exclude.iter().any(|name| name == rule.name())
                }))
            }
        }
    }
}

/// Apply an override to the default rules: a filter selects among the
/// defaults, a list replaces them, and no override keeps them.
#[must_use]
pub fn resolve_validation_rules(
    defaults: Vec<Arc<dyn ValidationRule>>,
    rules_override: Option<&RulesOverride>,
) -> Vec<Arc<dyn ValidationRule>> {
    match rules_override {
        None => defaults,
        Some(RulesOverride::List(rules)) => rules.clone(),
        Some(RulesOverride::Filter(keep)) => defaults
            .into_iter()
            .filter(|rule| keep(rule.as_ref()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose, ServiceSchema};
    use crate::document::{DocumentSet, SourceDocument};
    use crate::registry::Registry;

    const SERVICE: &str = r"
        type Query { user: User }
        type User { id: ID!, name: String, friends: [User!]! }
    ";

    fn schema() -> ComposedSchema {
        let service = ServiceSchema::parse(SERVICE, "file:///service.graphql").unwrap();
        let extension = ast::Document::parse(
            "extend type User { isLoggedIn: Boolean }",
            "file:///client.graphql",
        )
        .unwrap();
        compose(&service, &extension).unwrap()
    }

    fn check(rule: &dyn ValidationRule, files: &[(&str, &str)]) -> Vec<String> {
        let schema = schema();
        let documents: DocumentSet = files
            .iter()
            .map(|(uri, source)| SourceDocument::parse(FileUri::new(*uri), source))
            .collect();
        let fragments = Registry::new(&documents).fragments();

        let (uri, document) = documents.parsed().next().unwrap();
        let context = RuleContext {
            schema: &schema,
            uri,
            document,
            fragments: &fragments,
        };
        let mut diagnostics = Vec::new();
        rule.check(&context, &mut diagnostics);
        diagnostics
            .iter()
            .map(|diagnostic| format!("{}: {}", diagnostic.range, diagnostic.message))
            .collect()
    }

    #[test]
    fn test_no_anonymous_queries() {
        let found = check(&NoAnonymousQueries, &[("file:///q.graphql", "{ user { id } }")]);
        assert_eq!(found.len(), 1);
        assert!(found[0].starts_with("1:1-"), "{found:?}");

        let found = check(&NoAnonymousQueries, &[("file:///q.graphql", "query Q { user { id } }")]);
        assert!(found.is_empty());
    }

    #[test]
    fn test_no_typename_alias() {
        let found = check(
            &NoTypenameAlias,
            &[("file:///q.graphql", "query Q { user { __typename: name id } }")],
        );
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("`name` is aliased to `__typename`"), "{found:?}");
    }

    #[test]
    fn test_missing_client_directive() {
        let found = check(
            &NoMissingClientDirectives,
            &[("file:///q.graphql", "query Q { user { id isLoggedIn } }")],
        );
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("`User.isLoggedIn`"), "{found:?}");
    }

    #[test]
    fn test_client_directive_scopes() {
        for source in [
            "query Q { user { isLoggedIn @client } }",
            "query Q { user @client { isLoggedIn } }",
            "query Q { user { ... on User @client { isLoggedIn } } }",
            "fragment F on User @client { isLoggedIn }",
        ] {
            let found = check(&NoMissingClientDirectives, &[("file:///q.graphql", source)]);
            assert!(found.is_empty(), "{source}: {found:?}");
        }

        // Scope ends with the annotated field
        let found = check(
            &NoMissingClientDirectives,
            &[(
                "file:///q.graphql",
                "query Q { user { friends @client { id } isLoggedIn } }",
            )],
        );
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_executable_validation_resolves_fragments_from_other_files() {
        let found = check(
            &ExecutableValidation,
            &[
                ("file:///q.graphql", "query Q { user { ...UserFields } }"),
                ("file:///f.graphql", "fragment UserFields on User { id name }"),
            ],
        );
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn test_executable_validation_reports_unknown_fields() {
        let found = check(
            &ExecutableValidation,
            &[("file:///q.graphql", "query Q { user { id nope } }")],
        );
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("nope"), "{found:?}");
    }

    #[test]
    fn test_executable_validation_ignores_unused_fragments() {
        let found = check(
            &ExecutableValidation,
            &[("file:///f.graphql", "fragment UserFields on User { id }")],
        );
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn test_executable_validation_only_reports_current_file() {
        let found = check(
            &ExecutableValidation,
            &[
                ("file:///q.graphql", "query Q { user { ...Broken } }"),
                ("file:///f.graphql", "fragment Broken on User { missing }"),
            ],
        );
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn test_resolve_validation_rules() {
        let names = |rules: &[Arc<dyn ValidationRule>]| -> Vec<&'static str> {
            rules.iter().map(|rule| rule.name()).collect()
        };

        let rules = resolve_validation_rules(default_rules(), None);
        assert_eq!(
            names(&rules),
            [
                "NoAnonymousQueries",
                "NoTypenameAlias",
                "NoMissingClientDirectives",
                "ExecutableValidation"
            ]
        );

        let filter = RulesOverride::Filter(Box::new(|rule| rule.name() != "NoTypenameAlias"));
        let rules = resolve_validation_rules(default_rules(), Some(&filter));
        assert_eq!(names(&rules).len(), 3);
        assert!(!names(&rules).contains(&"NoTypenameAlias"));

        let list = RulesOverride::List(vec![Arc::new(ExecutableValidation)]);
        let rules = resolve_validation_rules(default_rules(), Some(&list));
        assert_eq!(names(&rules), ["ExecutableValidation"]);
    }

    #[test]
    fn test_override_from_selection() {
        let selection = RuleSelection::Only(vec![
            "ExecutableValidation".to_string(),
            "NotARule".to_string(),
            "NoAnonymousQueries".to_string(),
        ]);
        let rules = resolve_validation_rules(
            default_rules(),
            Some(&RulesOverride::from_selection(&selection)),
        );
        let names: Vec<_> = rules.iter().map(|rule| rule.name()).collect();
        assert_eq!(names, ["ExecutableValidation", "NoAnonymousQueries"]);

        let selection = RuleSelection::Exclude {
            exclude: vec!["ExecutableValidation".to_string()],
        };
        let rules = resolve_validation_rules(
            default_rules(),
            Some(&RulesOverride::from_selection(&selection)),
        );
        assert_eq!(rules.len(), 3);
    }
}
