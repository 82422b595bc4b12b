use crate::commands::CommandContext;
use crate::{ExitCode, GlobalOptions, OutputFormat};
use anyhow::Result;
use colored::Colorize;
use graphql_client_project::Diagnostic;
use graphql_types::DiagnosticSeverity;

/// Diagnostics of one file, keyed by its display path.
struct FileReport {
    file: String,
    diagnostics: Vec<Diagnostic>,
}

#[tracing::instrument(skip_all, fields(format = ?format))]
pub async fn run(global: &GlobalOptions, format: OutputFormat) -> Result<()> {
    let start_time = std::time::Instant::now();
    let context = CommandContext::load(global);
    context.load_schema().await;

    let workspace = &context.workspace;
    let mut reports: Vec<FileReport> = workspace
        .parse_errors
        .iter()
        .map(|(uri, diagnostics)| (uri, diagnostics.as_slice()))
        .chain(context.project.diagnostic_set().iter())
        .filter(|(_, diagnostics)| !diagnostics.is_empty())
        .map(|(uri, diagnostics)| FileReport {
            file: workspace.display_path(uri),
            diagnostics: diagnostics.to_vec(),
        })
        .collect();
    reports.sort_by(|a, b| a.file.cmp(&b.file));

    let total_errors = count(&reports, DiagnosticSeverity::is_error);
    tracing::info!(
        files_with_diagnostics = reports.len(),
        total_errors,
        "Validation completed"
    );

    match format {
        OutputFormat::Human => {
            print_human(&reports);
            if global.output.show_info {
                println!();
                if total_errors == 0 {
                    println!(
                        "{}",
                        format!("✓ {} documents valid", workspace.document_count())
                            .green()
                            .bold()
                    );
                } else {
                    println!("{}", format!("✗ Found {total_errors} error(s)").red());
                }
                println!(
                    "  {} total: {:.2}s",
                    "⏱".dimmed(),
                    start_time.elapsed().as_secs_f64()
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_report(&reports))?);
        }
    }

    if total_errors > 0 {
        ExitCode::ValidationError.exit();
    }
    Ok(())
}

fn count(reports: &[FileReport], predicate: impl Fn(DiagnosticSeverity) -> bool) -> usize {
    reports
        .iter()
        .flat_map(|report| &report.diagnostics)
        .filter(|diagnostic| predicate(diagnostic.severity))
        .count()
}

fn print_human(reports: &[FileReport]) {
    for report in reports {
        for diagnostic in &report.diagnostics {
            let severity = match diagnostic.severity {
                DiagnosticSeverity::Error => "error:".red().bold(),
                DiagnosticSeverity::Warning => "warning:".yellow().bold(),
                DiagnosticSeverity::Information | DiagnosticSeverity::Hint => {
                    "info:".blue().bold()
                }
            };
            println!(
                "{}:{}: {severity} {} {}",
                report.file,
                diagnostic.range.start,
                diagnostic.message,
                format!("({})", diagnostic.source).dimmed()
            );
        }
    }
}

fn json_report(reports: &[FileReport]) -> serde_json::Value {
    let files: Vec<_> = reports
        .iter()
        .map(|report| {
            let diagnostics: Vec<_> = report
                .diagnostics
                .iter()
                .map(|diagnostic| {
                    serde_json::json!({
                        "message": &*diagnostic.message,
                        "severity": diagnostic.severity.to_string(),
                        "source": &*diagnostic.source,
                        "location": {
                            "line": diagnostic.range.start.line + 1,
                            "column": diagnostic.range.start.character + 1,
                        },
                    })
                })
                .collect();
            serde_json::json!({ "file": report.file, "diagnostics": diagnostics })
        })
        .collect();

    let total_errors = count(reports, DiagnosticSeverity::is_error);
    serde_json::json!({
        "success": total_errors == 0,
        "files": files,
        "stats": {
            "total_files": reports.len(),
            "total_errors": total_errors,
            "total_warnings": count(reports, |severity| severity == DiagnosticSeverity::Warning),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql_types::{Position, Range};

    #[test]
    fn test_json_report() {
        let reports = [FileReport {
            file: "src/user.graphql".to_string(),
            diagnostics: vec![
                Diagnostic::error(
                    "Local field `User.isLoggedIn` must have a @client directive",
                    Range::new(Position::new(2, 4), Position::new(2, 14)),
                    "NoMissingClientDirectives",
                ),
                Diagnostic::warning("Deprecated", Range::default(), "apollo-compiler"),
            ],
        }];

        let report = json_report(&reports);
        assert_eq!(report["success"], false);
        assert_eq!(report["stats"]["total_errors"], 1);
        assert_eq!(report["stats"]["total_warnings"], 1);

        let first = &report["files"][0]["diagnostics"][0];
        assert_eq!(first["severity"], "error");
        assert_eq!(first["source"], "NoMissingClientDirectives");
        assert_eq!(first["location"]["line"], 3);
        assert_eq!(first["location"]["column"], 5);
    }

    #[test]
    fn test_empty_report_succeeds() {
        let report = json_report(&[]);
        assert_eq!(report["success"], true);
        assert_eq!(report["files"].as_array().map(Vec::len), Some(0));
    }
}
