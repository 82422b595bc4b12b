use crate::commands::CommandContext;
use crate::GlobalOptions;
use anyhow::Result;
use colored::Colorize;
use graphql_client_project::Decoration;
use std::sync::{Arc, Mutex, PoisonError};

#[tracing::instrument(skip_all)]
pub async fn run(global: &GlobalOptions) -> Result<()> {
    let context = CommandContext::load(global);

    let latest = Arc::new(Mutex::new(Vec::new()));
    let sink = latest.clone();
    context.project.observe(|observers| {
        observers.on_decorations(move |decorations| {
            *sink.lock().unwrap_or_else(PoisonError::into_inner) = decorations.to_vec();
        });
    });

    context.load_schema().await;
    // Picks up the frontend root and field latencies when a graph is configured
    context.project.load_usage_data().await;

    let decorations = std::mem::take(&mut *latest.lock().unwrap_or_else(PoisonError::into_inner));
    for decoration in &decorations {
        match decoration {
            Decoration::RunLink {
                document,
                range,
                url,
                ..
            } => {
                let location = format!("{}:{}", context.workspace.display_path(document), range.start);
                println!("{} {url}", location.bold());
            }
            Decoration::Text {
                document,
                message,
                range,
            } => {
                tracing::debug!(uri = %document, %range, hint = %message, "Latency hint");
            }
        }
    }
    Ok(())
}
