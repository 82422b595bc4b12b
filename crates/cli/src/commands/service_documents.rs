use crate::commands::CommandContext;
use crate::{fail, ExitCode, GlobalOptions};
use anyhow::Result;
use colored::Colorize;
use graphql_client_project::ProjectError;

#[tracing::instrument(skip_all)]
pub async fn run(global: &GlobalOptions) -> Result<()> {
    let context = CommandContext::load(global);
    context.load_schema().await;

    let documents = match context.project.merged_operations_and_fragments_for_service() {
        Ok(documents) => documents,
        Err(ProjectError::AnonymousOperation(error)) => fail(
            ExitCode::ValidationError,
            &anyhow::anyhow!(
                "Anonymous operation in {}; every operation must have a name",
                context.workspace.display_path(&error.uri)
            ),
        ),
        Err(error) => return Err(error.into()),
    };

    if global.output.show_info && documents.is_empty() {
        eprintln!("{}", "No operations are sent to the service".yellow());
    }

    let mut first = true;
    for (name, document) in &documents {
        if !first {
            println!();
        }
        first = false;
        println!("{}", format!("# {name}").dimmed());
        println!("{}", document.serialize().to_string().trim_end());
    }
    Ok(())
}
