pub mod links;
pub mod service_documents;
pub mod validate;

use crate::progress::SpinnerNotifier;
use crate::workspace::Workspace;
use crate::{fail, ExitCode, GlobalOptions};
use graphql_client_project::{ClientProject, LoadingNotifier, TracingNotifier};
use std::sync::Arc;

/// A loaded workspace and the project over it, schema not yet loaded.
pub struct CommandContext {
    pub workspace: Workspace,
    pub project: ClientProject,
}

impl CommandContext {
    /// Load config and documents, exiting with the matching code on
    /// failure.
    pub fn load(global: &GlobalOptions) -> Self {
        let (config, base_dir) = Workspace::load_config(global.config.as_deref())
            .unwrap_or_else(|error| fail(ExitCode::ConfigError, &error));
        let workspace = Workspace::open(config, base_dir)
            .unwrap_or_else(|error| fail(ExitCode::IoError, &error));

        if workspace.document_count() == 0 {
            fail(
                ExitCode::ConfigError,
                &anyhow::anyhow!("No documents found matching client.includes"),
            );
        }

        let Some(schema_path) = workspace.service_schema_path(global.schema.as_deref()) else {
            fail(
                ExitCode::SchemaError,
                &anyhow::anyhow!(
                    "No service schema configured: pass --schema or set client.service.localSchemaFile"
                ),
            );
        };

        let notifier: Arc<dyn LoadingNotifier> = if global.output.show_progress {
            Arc::new(SpinnerNotifier::default())
        } else {
            Arc::new(TracingNotifier)
        };
        let project = workspace
            .project(schema_path, notifier)
            .unwrap_or_else(|error| fail(ExitCode::ConfigError, &error));

        Self { workspace, project }
    }

    /// Load the service schema, which also runs validation.
    pub async fn load_schema(&self) {
        if !self.project.load_schema(false).await {
            fail(
                ExitCode::SchemaError,
                &anyhow::anyhow!("Failed to load the service schema (run with RUST_LOG=debug for details)"),
            );
        }
    }
}
