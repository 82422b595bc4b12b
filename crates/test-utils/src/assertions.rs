//! Snapshot formatting for diagnostics and decorations.
//!
//! Output is one line per item, numbered, with 1-based positions, so
//! snapshots read like compiler output.

use graphql_client_project::{Decoration, Diagnostic, DiagnosticSet};

/// Format the diagnostics of one file.
///
/// ```
/// use graphql_client_project::Diagnostic;
/// use graphql_test_utils::format_diagnostics;
/// use graphql_types::{Position, Range};
///
/// let diagnostic = Diagnostic::error("Unknown field", Range::at(Position::new(0, 4)), "test");
/// assert_eq!(format_diagnostics(&[diagnostic]), "[1] 1:5-1:5 error(test): Unknown field");
/// ```
#[must_use]
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return String::from("(no diagnostics)");
    }

    diagnostics
        .iter()
        .enumerate()
        .map(|(i, d)| {
            format!(
                "[{}] {} {}({}): {}",
                i + 1,
                d.range,
                d.severity,
                d.source,
                d.message
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a whole diagnostic set, grouped under each file's URI.
#[must_use]
pub fn format_diagnostic_set(set: &DiagnosticSet) -> String {
    if set.is_empty() {
        return String::from("(no diagnostics)");
    }

    set.iter()
        .filter(|(_, diagnostics)| !diagnostics.is_empty())
        .map(|(uri, diagnostics)| format!("{uri}\n{}", format_diagnostics(diagnostics)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format decorations. Run links show their hover message only, since the
/// URL embeds an opaque token.
#[must_use]
pub fn format_decorations(decorations: &[Decoration]) -> String {
    if decorations.is_empty() {
        return String::from("(no decorations)");
    }

    decorations
        .iter()
        .enumerate()
        .map(|(i, decoration)| match decoration {
            Decoration::Text {
                document,
                message,
                range,
            } => format!("[{}] {document} {range} text: {message}", i + 1),
            Decoration::RunLink {
                document, range, ..
            } => format!("[{}] {document} {range} run link", i + 1),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
