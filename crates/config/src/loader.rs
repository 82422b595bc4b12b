use crate::{ClientServiceConfig, ConfigError, GraphRef, ProjectConfig, Result, RuleSelection};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file names to search for, in order of preference
const CONFIG_FILES: &[&str] = &[
    "apollo.config.json",
    "apollo.config.yaml",
    "apollo.config.yml",
    ".apollorc",
];

/// Find a project config file by walking up the directory tree from the given start directory.
/// Returns the path to the config file if found.
#[tracing::instrument(fields(start = %start_dir.display()))]
pub fn find_config(start_dir: &Path) -> Result<Option<PathBuf>> {
    let mut current_dir = start_dir.to_path_buf();
    let mut checked_dirs = 0;

    loop {
        tracing::trace!(dir = %current_dir.display(), "Checking directory for config files");
        for file_name in CONFIG_FILES {
            let config_path = current_dir.join(file_name);
            if config_path.is_file() {
                tracing::info!(path = %config_path.display(), checked_dirs, "Found config file");
                return Ok(Some(config_path));
            }
        }

        checked_dirs += 1;
        if !current_dir.pop() {
            tracing::debug!(checked_dirs, "No config file found");
            break;
        }
    }

    Ok(None)
}

/// Load a project config from the specified path.
/// Automatically detects the format based on file extension.
#[tracing::instrument(fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Result<ProjectConfig> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    tracing::debug!("Reading config file");
    let contents = fs::read_to_string(path)?;
    let config = load_config_from_str(&contents, path)?;
    tracing::info!(
        graph = config.graph_id().as_deref().unwrap_or("<none>"),
        variant = %config.variant(),
        "Config loaded successfully"
    );
    Ok(config)
}

/// Load a project config from a string.
/// The path is used for error messages and format detection.
#[tracing::instrument(skip(contents), fields(path = %path.display(), size = contents.len()))]
pub fn load_config_from_str(contents: &str, path: &Path) -> Result<ProjectConfig> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("");

    tracing::debug!(extension, file_name, "Detecting config format");

    let config = match extension {
        "yml" | "yaml" => parse_yaml(contents, path)?,
        "json" => parse_json(contents, path)?,
        "" if file_name == ".apollorc" => {
            // .apollorc without extension - try YAML first, then JSON
            tracing::trace!("Trying YAML then JSON for .apollorc");
            parse_yaml(contents, path).or_else(|_| parse_json(contents, path))?
        }
        _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    };

    tracing::debug!("Validating config");
    validate_config(&config, path)?;

    Ok(config)
}

fn parse_yaml(contents: &str, path: &Path) -> Result<ProjectConfig> {
    serde_saphyr::from_str(contents).map_err(|e| ConfigError::Invalid {
        path: path.to_path_buf(),
        message: format!("YAML parse error: {e}"),
    })
}

fn parse_json(contents: &str, path: &Path) -> Result<ProjectConfig> {
    serde_json::from_str(contents).map_err(|e| ConfigError::Invalid {
        path: path.to_path_buf(),
        message: format!("JSON parse error: {e}"),
    })
}

/// Validate the loaded configuration
fn validate_config(config: &ProjectConfig, path: &Path) -> Result<()> {
    let invalid = |message: String| ConfigError::Invalid {
        path: path.to_path_buf(),
        message,
    };

    match &config.client.service {
        Some(ClientServiceConfig::GraphRef(graph_ref)) => {
            graph_ref
                .parse::<GraphRef>()
                .map_err(|e| invalid(format!("Invalid client.service '{graph_ref}': {e}")))?;
        }
        Some(ClientServiceConfig::Remote(remote)) => {
            if !(remote.url.starts_with("http://") || remote.url.starts_with("https://")) {
                return Err(invalid(format!(
                    "client.service.url must be an http(s) URL, got '{}'",
                    remote.url
                )));
            }
        }
        Some(ClientServiceConfig::Local(local)) => {
            if local.local_schema_file.trim().is_empty() {
                return Err(invalid(
                    "client.service.localSchemaFile must not be empty".to_string(),
                ));
            }
        }
        None => {}
    }

    if let Some(selection) = &config.client.validation_rules {
        if selection.names().iter().any(|name| name.trim().is_empty()) {
            return Err(invalid(
                "client.validationRules contains an empty rule name".to_string(),
            ));
        }
        if matches!(selection, RuleSelection::Only(names) if names.is_empty()) {
            tracing::warn!("client.validationRules is an empty list; no validation will run");
        }
    }

    tracing::debug!("Config validation passed");
    Ok(())
}
