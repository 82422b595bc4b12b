//! Schema composition through the public API.

use apollo_compiler::ast;
use graphql_client_project::{
    client_extension_document, compose, validate_project, DocumentSet, Registry, ServiceSchema,
    SourceDocument, CLIENT_DIRECTIVES_SDL,
};
use graphql_test_utils::fixtures::{uri, CLIENT_SCHEMA, SERVICE_SCHEMA};
use graphql_test_utils::format_diagnostic_set;

fn service() -> ServiceSchema {
    ServiceSchema::parse(SERVICE_SCHEMA, "file:///schema.graphql").unwrap()
}

fn library_directive_names() -> Vec<String> {
    let library = ast::Document::parse(CLIENT_DIRECTIVES_SDL, "library.graphql").unwrap();
    library
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            ast::Definition::DirectiveDefinition(directive) => Some(directive.name.to_string()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_library_is_injected_without_collisions() {
    let extension = ast::Document::parse(CLIENT_SCHEMA, "file:///client.graphql").unwrap();
    let composed = compose(&service(), &extension).unwrap();

    let injected: Vec<_> = composed
        .injected_directives()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(injected, library_directive_names());
    for name in library_directive_names() {
        assert!(
            composed.schema().directive_definitions.contains_key(name.as_str()),
            "{name} missing"
        );
    }
}

#[test]
fn test_any_collision_injects_nothing() {
    // Only @client collides; @export and the rest must not be injected either
    let extension = ast::Document::parse(
        "directive @client on FIELD\nextend type User { isLoggedIn: Boolean }",
        "file:///client.graphql",
    )
    .unwrap();
    let composed = compose(&service(), &extension).unwrap();

    assert!(composed.injected_directives().is_empty());
    assert!(!composed.schema().directive_definitions.contains_key("export"));
    assert!(composed.schema().directive_definitions.contains_key("client"));
}

#[test]
fn test_service_directive_collision_injects_nothing() {
    let service = ServiceSchema::parse(
        "directive @connection(key: String!) on FIELD\ntype Query { a: Int }",
        "file:///schema.graphql",
    )
    .unwrap();
    let composed = compose(&service, &ast::Document::new()).unwrap();
    assert!(composed.injected_directives().is_empty());
}

#[test]
fn test_local_fields_are_recorded_per_type() {
    let extension = ast::Document::parse(CLIENT_SCHEMA, "file:///client.graphql").unwrap();
    let composed = compose(&service(), &extension).unwrap();

    let user = composed.schema().get_object("User").unwrap();
    assert!(user.fields.contains_key("id"));
    assert!(user.fields.contains_key("isLoggedIn"));

    let local: Vec<_> = composed
        .client_schema("User")
        .unwrap()
        .local_fields
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(local, ["isLoggedIn"]);
    assert!(composed.is_local_field("Post", "isLiked"));
    assert!(!composed.is_local_field("User", "id"));
    assert!(composed.client_schema("Query").is_none());
}

#[test]
fn test_service_schema_without_source_is_reprinted() {
    let schema = apollo_compiler::Schema::parse_and_validate(SERVICE_SCHEMA, "schema.graphql")
        .unwrap();
    let service = ServiceSchema::from_schema(schema);
    assert!(service.ast().is_none());

    let extension = ast::Document::parse(CLIENT_SCHEMA, "file:///client.graphql").unwrap();
    let composed = compose(&service, &extension).unwrap();
    let user = composed.schema().get_object("User").unwrap();

    let location = user.location().unwrap();
    let path = composed.schema().sources[&location.file_id()]
        .path()
        .to_string_lossy()
        .to_string();
    assert!(path.starts_with("graphql-schema:/service-schema-"), "{path}");
}

#[test]
fn test_extension_of_unknown_type_falls_back_to_service_schema() {
    let documents: DocumentSet = [
        SourceDocument::parse(uri("client.graphql"), "extend type Missing { local: Int }"),
        SourceDocument::parse(uri("query.graphql"), "query Q { user { id } }"),
    ]
    .into_iter()
    .collect();
    let extension = client_extension_document(&documents, None);
    let fragments = Registry::new(&documents).fragments();

    let error = compose(&service(), &extension).unwrap_err();
    assert_eq!(error.diagnostics[0].uri, Some(uri("client.graphql")));

    let (composed, diagnostics) = validate_project(
        &service(),
        &extension,
        &documents,
        &fragments,
        &graphql_client_project::default_rules(),
    );
    assert!(composed.injected_directives().is_empty());
    assert_eq!(diagnostics.uris().collect::<Vec<_>>(), [&uri("client.graphql")]);
    assert!(diagnostics.get(&uri("query.graphql")).is_empty());

    insta::assert_snapshot!(format_diagnostic_set(&diagnostics), @r"
    file:///client.graphql
    [1] 1:13-1:20 error(schema): type extension for undefined type `Missing`
    ");
}
