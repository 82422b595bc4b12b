//! Editor annotations: field latency hints and run-in-explorer links.

use crate::closure::Closure;
use crate::compose::ComposedSchema;
use crate::document::DocumentSet;
use crate::registry::FragmentMap;
use apollo_compiler::ast;
use apollo_compiler::{Name, Node, Schema};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use graphql_apollo_ext::{range_of, walk_document, AstVisitor, DocumentExt};
use graphql_types::{FileUri, Range};
use std::collections::HashMap;
use std::io::Write;
use url::Url;

/// Explorer root used when none is configured or loaded.
pub const DEFAULT_FRONTEND_URL_ROOT: &str = "https://studio.apollographql.com";

/// Latency samples in milliseconds, by parent type name then field name.
pub type FieldLatencies = HashMap<String, HashMap<String, f64>>;

/// An annotation attached to a range of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoration {
    /// Inline hint shown after a field
    Text {
        document: FileUri,
        message: String,
        range: Range,
    },
    /// Hover link on an operation
    RunLink {
        document: FileUri,
        range: Range,
        hover_message: String,
        url: String,
    },
}

impl Decoration {
    #[must_use]
    pub fn document(&self) -> &FileUri {
        match self {
            Self::Text { document, .. } | Self::RunLink { document, .. } => document,
        }
    }

    #[must_use]
    pub fn range(&self) -> Range {
        match self {
            Self::Text { range, .. } | Self::RunLink { range, .. } => *range,
        }
    }
}

/// What run links point at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplorerLinkContext {
    /// Explorer root; [`DEFAULT_FRONTEND_URL_ROOT`] when unset
    pub frontend_url_root: Option<String>,
    /// Hosted graph to open; the sandbox explorer is used without one
    pub graph_id: Option<String>,
    pub variant: String,
    /// Service endpoint handed to the sandbox, when known
    pub endpoint: Option<String>,
}

impl ExplorerLinkContext {
    fn root(&self) -> &str {
        self.frontend_url_root
            .as_deref()
            .unwrap_or(DEFAULT_FRONTEND_URL_ROOT)
            .trim_end_matches('/')
    }

    /// Explorer URL that opens `document` (a printed operation closure).
    pub fn url_for(&self, document: &str) -> Result<Url, LinkError> {
        let state = explorer_url_state(document)?;
        let mut url = match &self.graph_id {
            Some(graph_id) => {
                let mut url = Url::parse(&format!("{}/graph/{graph_id}/explorer", self.root()))?;
                url.query_pairs_mut().append_pair("variant", &self.variant);
                url
            }
            None => {
                let mut url = Url::parse(&format!("{}/sandbox/explorer", self.root()))?;
                if let Some(endpoint) = &self.endpoint {
                    url.query_pairs_mut().append_pair("endpoint", endpoint);
                }
                url
            }
        };
        url.query_pairs_mut()
            .append_pair("explorerURLState", &state)
            .append_pair("referrer", "vscode");
        Ok(url)
    }
}

/// Why a run link could not be built.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Invalid explorer URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Failed to encode explorer state: {0}")]
    Encode(#[from] std::io::Error),
    #[error("Failed to serialize explorer state: {0}")]
    Json(#[from] serde_json::Error),
}

/// Compact, URL-safe encoding of the explorer state for `document`.
pub fn explorer_url_state(document: &str) -> Result<String, LinkError> {
    let json = serde_json::to_vec(&serde_json::json!({ "document": document }))?;
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(URL_SAFE_NO_PAD.encode(encoder.finish()?))
}

const UNITS: [(&str, f64); 5] = [
    ("hr", 3_600_000.0),
    ("min", 60_000.0),
    ("s", 1_000.0),
    ("ms", 1.0),
    ("μs", 0.001),
];

/// Format a duration in milliseconds with the largest fitting unit.
///
/// ```
/// use graphql_client_project::format_ms;
///
/// assert_eq!(format_ms(250.0), "250ms");
/// assert_eq!(format_ms(1500.0), "1.50s");
/// assert_eq!(format_ms(0.5), "500μs");
/// ```
#[must_use]
pub fn format_ms(ms: f64) -> String {
    let (unit, scale) = UNITS
        .iter()
        .copied()
        .find(|(_, scale)| ms >= *scale)
        .unwrap_or(UNITS[UNITS.len() - 1]);
    let value = ms / scale;
    let decimals = if value >= 100.0 {
        0
    } else if value >= 10.0 {
        1
    } else {
        2
    };
    format!("{value:.decimals$}{unit}")
}

/// Build latency hints and run links for every parsed document.
#[must_use]
#[tracing::instrument(skip_all, fields(files = documents.len()))]
pub fn decorate(
    schema: &ComposedSchema,
    documents: &DocumentSet,
    fragments: &FragmentMap,
    latencies: Option<&FieldLatencies>,
    links: &ExplorerLinkContext,
) -> Vec<Decoration> {
    let mut decorations = Vec::new();
    let schema: &Schema = schema.schema();

    for (uri, document) in documents.parsed() {
        if let Some(latencies) = latencies {
            let mut visitor = LatencyVisitor {
                uri,
                document,
                latencies,
                decorations: &mut decorations,
            };
            walk_document(&mut visitor, Some(schema), document);
        }

        for operation in document.operations() {
            let closure = Closure::of_definitions(
                document,
                [ast::Definition::OperationDefinition(operation.clone())],
                fragments,
            );
            match links.url_for(&closure.print()) {
                Ok(url) => decorations.push(Decoration::RunLink {
                    document: uri.clone(),
                    range: range_of(operation.location(), &document.sources).unwrap_or_default(),
                    hover_message: format!("[`Run in Studio`]({url})"),
                    url: url.into(),
                }),
                Err(error) => {
                    tracing::warn!(uri = %uri, %error, "Could not build run link");
                }
            }
        }
    }

    tracing::debug!(count = decorations.len(), "Generated decorations");
    decorations
}

struct LatencyVisitor<'a> {
    uri: &'a FileUri,
    document: &'a ast::Document,
    latencies: &'a FieldLatencies,
    decorations: &'a mut Vec<Decoration>,
}

impl AstVisitor for LatencyVisitor<'_> {
    fn enter_field(&mut self, field: &Node<ast::Field>, parent_type: Option<&Name>) {
        let Some(parent_type) = parent_type else {
            return;
        };
        let Some(ms) = self
            .latencies
            .get(parent_type.as_str())
            .and_then(|fields| fields.get(field.name.as_str()))
        else {
            return;
        };
        if *ms > 1.0 {
            self.decorations.push(Decoration::Text {
                document: self.uri.clone(),
                message: format!("~{}", format_ms(*ms)),
                range: range_of(field.location(), &self.document.sources).unwrap_or_default(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose, ServiceSchema};
    use crate::document::SourceDocument;
    use crate::registry::Registry;
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    fn schema() -> ComposedSchema {
        let service = ServiceSchema::parse(
            "type Query { user: User } type User { id: ID! name: String }",
            "file:///service.graphql",
        )
        .unwrap();
        compose(&service, &ast::Document::new()).unwrap()
    }

    fn latencies(entries: &[(&str, &str, f64)]) -> FieldLatencies {
        let mut latencies = FieldLatencies::new();
        for (parent, field, ms) in entries {
            latencies
                .entry((*parent).to_string())
                .or_default()
                .insert((*field).to_string(), *ms);
        }
        latencies
    }

    fn decorate_source(
        source: &str,
        latencies: Option<&FieldLatencies>,
        links: &ExplorerLinkContext,
    ) -> Vec<Decoration> {
        let documents: DocumentSet =
            [SourceDocument::parse(FileUri::new("file:///q.graphql"), source)]
                .into_iter()
                .collect();
        let fragments = Registry::new(&documents).fragments();
        decorate(&schema(), &documents, &fragments, latencies, links)
    }

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(250.0), "250ms");
        assert_eq!(format_ms(12.34), "12.3ms");
        assert_eq!(format_ms(1.5), "1.50ms");
        assert_eq!(format_ms(1500.0), "1.50s");
        assert_eq!(format_ms(90_000.0), "1.50min");
        assert_eq!(format_ms(7_200_000.0), "2.00hr");
        assert_eq!(format_ms(0.25), "250μs");
    }

    #[test]
    fn test_latency_hint_on_matching_field_only() {
        let stats = latencies(&[("Query", "user", 250.0)]);
        let decorations =
            decorate_source("query Q { user { id } }", Some(&stats), &ExplorerLinkContext::default());

        let texts: Vec<_> = decorations
            .iter()
            .filter_map(|decoration| match decoration {
                Decoration::Text { message, range, .. } => Some((message.as_str(), *range)),
                Decoration::RunLink { .. } => None,
            })
            .collect();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].0, "~250ms");
        assert_eq!(texts[0].1.to_string(), "1:11-1:22");
    }

    #[test]
    fn test_latency_at_or_below_threshold_is_skipped() {
        let stats = latencies(&[("Query", "user", 1.0), ("User", "id", 0.5)]);
        let decorations =
            decorate_source("query Q { user { id } }", Some(&stats), &ExplorerLinkContext::default());
        assert!(decorations
            .iter()
            .all(|decoration| matches!(decoration, Decoration::RunLink { .. })));
    }

    #[test]
    fn test_fields_below_unknown_types_get_no_hint() {
        let stats = latencies(&[
            ("User", "id", 300.0),
            ("Ghost", "name", 300.0),
            ("User", "name", 400.0),
        ]);
        let decorations = decorate_source(
            "query Q { missing { id } ... on Ghost { name } user { name } }",
            Some(&stats),
            &ExplorerLinkContext::default(),
        );

        let messages: Vec<_> = decorations
            .iter()
            .filter_map(|decoration| match decoration {
                Decoration::Text { message, .. } => Some(message.as_str()),
                Decoration::RunLink { .. } => None,
            })
            .collect();
        assert_eq!(messages, ["~400ms"]);
    }

    #[test]
    fn test_run_link_per_operation() {
        let decorations = decorate_source(
            "query A { user { id } } query B { user { name } }",
            None,
            &ExplorerLinkContext::default(),
        );
        assert_eq!(decorations.len(), 2);
        let Decoration::RunLink { hover_message, url, .. } = &decorations[0] else {
            panic!("expected a run link");
        };
        assert!(url.starts_with("https://studio.apollographql.com/sandbox/explorer?explorerURLState="));
        assert!(url.ends_with("&referrer=vscode"));
        assert_eq!(hover_message, &format!("[`Run in Studio`]({url})"));
    }

    #[test]
    fn test_hosted_and_sandbox_urls() {
        let hosted = ExplorerLinkContext {
            frontend_url_root: Some("https://studio.example.com/".to_string()),
            graph_id: Some("my-graph".to_string()),
            variant: "staging".to_string(),
            endpoint: None,
        };
        let url = hosted.url_for("query Q { a }").unwrap();
        assert_eq!(url.path(), "/graph/my-graph/explorer");
        let keys: Vec<_> = url.query_pairs().map(|(key, _)| key.into_owned()).collect();
        assert_eq!(keys, ["variant", "explorerURLState", "referrer"]);

        let sandbox = ExplorerLinkContext {
            endpoint: Some("http://localhost:4000/graphql".to_string()),
            ..ExplorerLinkContext::default()
        };
        let url = sandbox.url_for("query Q { a }").unwrap();
        assert_eq!(url.path(), "/sandbox/explorer");
        let endpoint = url
            .query_pairs()
            .find(|(key, _)| key == "endpoint")
            .map(|(_, value)| value.into_owned());
        assert_eq!(endpoint.as_deref(), Some("http://localhost:4000/graphql"));
    }

    #[test]
    fn test_explorer_state_decodes_to_document() {
        let token = explorer_url_state("query Q { a }").unwrap();
        let compressed = URL_SAFE_NO_PAD.decode(token).unwrap();
        let mut json = String::new();
        DeflateDecoder::new(compressed.as_slice())
            .read_to_string(&mut json)
            .unwrap();
        assert_eq!(json, r#"{"document":"query Q { a }"}"#);
    }

    #[test]
    fn test_run_link_includes_fragment_closure() {
        let documents: DocumentSet = [
            SourceDocument::parse(FileUri::new("file:///q.graphql"), "query Q { user { ...F } }"),
            SourceDocument::parse(FileUri::new("file:///f.graphql"), "fragment F on User { id }"),
        ]
        .into_iter()
        .collect();
        let fragments = Registry::new(&documents).fragments();
        let links = ExplorerLinkContext::default();
        let decorations = decorate(&schema(), &documents, &fragments, None, &links);

        let expected = links
            .url_for("query Q {\n  user {\n    ...F\n  }\n}\n\nfragment F on User {\n  id\n}")
            .unwrap();
        assert_eq!(decorations.len(), 1);
        assert!(matches!(&decorations[0], Decoration::RunLink { url, .. } if *url == expected.as_str()));
    }
}
