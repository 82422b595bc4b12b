//! File identity: [`FileUri`].

use std::sync::Arc;

/// A URI string identifying a tracked source.
///
/// This is typically a `file://` URI for documents on disk, or a custom scheme
/// for in-memory sources (e.g., `graphql-schema:` for a service schema that was
/// reprinted because it carried no source text).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileUri(Arc<str>);

impl FileUri {
    /// Create a new `FileUri` from a string.
    #[must_use]
    pub fn new(uri: impl Into<Arc<str>>) -> Self {
        Self(uri.into())
    }

    /// Get the URI as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The URI scheme (`file` in `file:///a.graphql`), if there is one.
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        let (scheme, _) = self.0.split_once(':')?;
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) {
            return None;
        }
        Some(scheme)
    }
}

impl std::fmt::Display for FileUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FileUri {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for FileUri {
    fn from(uri: String) -> Self {
        Self::new(uri)
    }
}

impl AsRef<str> for FileUri {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
