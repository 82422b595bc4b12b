//! Configuration for GraphQL client projects.
//!
//! A project is described by an `apollo.config.{json,yaml,yml}` (or `.apollorc`)
//! file. The model in [`ProjectConfig`] carries everything the project model
//! consumes: the remote graph and variant, client directive settings, the
//! validation rule selection, and where the service and explorer live.

mod config;
mod error;
mod graph_ref;
mod loader;

pub use config::{
    ClientConfig, ClientServiceConfig, EndpointConfig, EngineConfig, LocalServiceConfig,
    ProjectConfig, RemoteServiceConfig, RuleSelection, ServiceConfig, DEFAULT_ENGINE_ENDPOINT,
    DEFAULT_VARIANT,
};
pub use error::{ConfigError, Result};
pub use graph_ref::GraphRef;
pub use loader::{find_config, load_config, load_config_from_str};
