//! Shared test utilities for GraphQL client project crates.
//!
//! - [`fixtures`]: schemas and documents used across integration tests, plus a
//!   builder for a fully wired [`ClientProject`](graphql_client_project::ClientProject)
//! - [`assertions`]: stable text renderings of diagnostics and decorations
//!   for `insta` snapshots
//! - [`recording`]: observers and notifiers that record what the pipeline
//!   published, with checkpoints for "what happened since"

pub mod assertions;
pub mod fixtures;
pub mod recording;

pub use assertions::{format_decorations, format_diagnostic_set, format_diagnostics};
pub use fixtures::TestProject;
pub use recording::{Event, EventLog};
