//! Loading a client project from files on disk.

use anyhow::{Context, Result};
use graphql_client_project::{
    ClientCapability, ClientProject, Diagnostic, EngineClient, FileSchemaProvider,
    InMemoryDocumentStore, LoadingNotifier, SourceDocument,
};
use graphql_config::{ClientConfig, ProjectConfig};
use graphql_types::FileUri;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DOCUMENT_EXTENSIONS: &[&str] = &["graphql", "gql"];

/// A config file and the documents it selects.
pub struct Workspace {
    pub config: ProjectConfig,
    pub base_dir: PathBuf,
    pub store: Arc<InMemoryDocumentStore>,
    /// Syntax errors of documents tracked without an AST
    pub parse_errors: Vec<(FileUri, Vec<Diagnostic>)>,
    paths: HashMap<FileUri, PathBuf>,
}

impl Workspace {
    /// Load the config at `config_path`, or the nearest one above the
    /// current directory. Without any config file the defaults apply to the
    /// current directory.
    #[tracing::instrument(skip_all)]
    pub fn load_config(config_path: Option<&Path>) -> Result<(ProjectConfig, PathBuf)> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        let path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => graphql_config::find_config(&current_dir)?,
        };

        let Some(path) = path else {
            tracing::info!(dir = %current_dir.display(), "No config file found; using defaults");
            return Ok((ProjectConfig::default(), current_dir));
        };

        let config = graphql_config::load_config(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        let base_dir = path
            .parent()
            .map_or_else(|| current_dir.clone(), Path::to_path_buf);
        Ok((config, base_dir))
    }

    /// Discover and parse every document selected by `config`.
    #[tracing::instrument(skip_all, fields(base = %base_dir.display()))]
    pub fn open(config: ProjectConfig, base_dir: PathBuf) -> Result<Self> {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mut parse_errors = Vec::new();
        let mut paths = HashMap::new();

        for path in discover_documents(&config.client, &base_dir)? {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?;
            let uri = file_uri(&path);
            let (document, errors) = SourceDocument::parse_with_diagnostics(uri.clone(), &source);
            if !errors.is_empty() {
                parse_errors.push((uri.clone(), errors));
            }
            store.set_file(uri.clone(), vec![document]);
            paths.insert(uri, path);
        }

        tracing::info!(
            documents = paths.len(),
            parse_failures = parse_errors.len(),
            "Documents loaded"
        );
        Ok(Self {
            config,
            base_dir,
            store,
            parse_errors,
            paths,
        })
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.paths.len()
    }

    /// `uri` as a path relative to the config directory, for display.
    #[must_use]
    pub fn display_path(&self, uri: &FileUri) -> String {
        self.paths.get(uri).map_or_else(
            || uri.to_string(),
            |path| {
                path.strip_prefix(&self.base_dir)
                    .unwrap_or(path)
                    .display()
                    .to_string()
            },
        )
    }

    /// The service schema file: `schema_override`, else the one the config
    /// names. Relative config paths resolve against the config directory.
    #[must_use]
    pub fn service_schema_path(&self, schema_override: Option<&Path>) -> Option<PathBuf> {
        schema_override.map(Path::to_path_buf).or_else(|| {
            self.config
                .local_service_schema_file()
                .map(|file| self.base_dir.join(file))
        })
    }

    /// Build the project over the loaded documents.
    pub fn project(
        &self,
        schema_path: PathBuf,
        notifier: Arc<dyn LoadingNotifier>,
    ) -> Result<ClientProject> {
        let mut capability = ClientCapability::new(&self.config.client);
        if let Some(file) = &self.config.client.local_schema_file {
            let path = self.base_dir.join(file);
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read local schema: {}", path.display()))?;
            let document = apollo_compiler::ast::Document::parse(source, file_uri(&path).as_str())
                .map_err(|with_errors| anyhow::anyhow!("{}", with_errors.errors))
                .with_context(|| format!("Invalid local schema: {}", path.display()))?;
            capability = capability.with_local_schema(document);
        }

        let mut project = ClientProject::new(
            &self.config,
            self.store.clone(),
            Arc::new(FileSchemaProvider::new(schema_path)),
        )
        .with_capability(Arc::new(capability))
        .with_notifier(notifier);

        let engine = &self.config.engine;
        if let (Some(_), Some(api_key)) = (self.config.graph_id(), engine.resolved_api_key()) {
            tracing::debug!(endpoint = %engine.endpoint, "Usage data enabled");
            project = project
                .with_usage_provider(Arc::new(EngineClient::new(&engine.endpoint).with_api_key(api_key)));
        }
        Ok(project)
    }
}

fn file_uri(path: &Path) -> FileUri {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    FileUri::new(format!("file://{}", absolute.display()))
}

/// Expand `client.includes` relative to `base_dir`, minus `client.excludes`,
/// keeping GraphQL files only. Sorted for stable output.
pub fn discover_documents(client: &ClientConfig, base_dir: &Path) -> Result<Vec<PathBuf>> {
    let excludes = client
        .excludes
        .iter()
        .flat_map(|pattern| expand_braces(pattern))
        .map(|pattern| {
            glob::Pattern::new(&pattern).with_context(|| format!("Invalid exclude pattern: {pattern}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut files = BTreeSet::new();
    for pattern in client.includes.iter().flat_map(|pattern| expand_braces(pattern)) {
        let full_pattern = base_dir.join(&pattern).display().to_string();
        for entry in glob::glob(&full_pattern)
            .with_context(|| format!("Invalid glob pattern: {full_pattern}"))?
        {
            let path = entry.context("Glob error")?;
            if !path.is_file() || !has_document_extension(&path) {
                continue;
            }
            let relative = path.strip_prefix(base_dir).unwrap_or(&path);
            if excludes.iter().any(|exclude| exclude.matches_path(relative)) {
                tracing::trace!(path = %path.display(), "Excluded");
                continue;
            }
            files.insert(path);
        }
    }
    Ok(files.into_iter().collect())
}

fn has_document_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext))
}

/// Expand a single brace group: `src/**/*.{graphql,gql}` becomes two patterns.
fn expand_braces(pattern: &str) -> Vec<String> {
    if let (Some(start), Some(end)) = (pattern.find('{'), pattern.find('}')) {
        if start < end {
            let before = &pattern[..start];
            let after = &pattern[end + 1..];
            return pattern[start + 1..end]
                .split(',')
                .map(|option| format!("{before}{}{after}", option.trim()))
                .collect();
        }
    }
    vec![pattern.to_string()]
}
