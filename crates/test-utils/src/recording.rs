//! Recording of everything a project publishes.
//!
//! ## Usage
//!
//! ```ignore
//! use graphql_test_utils::TestProject;
//!
//! let test = TestProject::new();
//! let checkpoint = test.events.checkpoint();
//! test.project.validate();
//! assert_eq!(test.events.diagnostics_since(checkpoint).len(), 1);
//! ```

use graphql_client_project::{ClientProject, Decoration, Diagnostic, LoadingNotifier};
use graphql_types::FileUri;
use std::sync::{Arc, Mutex, PoisonError};

/// Something the project published or a loading transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Diagnostics {
        uri: FileUri,
        diagnostics: Vec<Diagnostic>,
    },
    Decorations(Vec<Decoration>),
    SchemaTags {
        service_id: String,
        tags: Vec<String>,
    },
    LoadingStarted(String),
    LoadingFinished(String),
    LoadingFailed {
        label: String,
        message: String,
    },
}

/// A shared, append-only log of [`Event`]s.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register observers on `project` that append to this log.
    pub fn observe(&self, project: &ClientProject) {
        let diagnostics = self.clone();
        let decorations = self.clone();
        let schema_tags = self.clone();
        project.observe(move |observers| {
            observers.on_diagnostics(move |uri, found| {
                diagnostics.record(Event::Diagnostics {
                    uri: uri.clone(),
                    diagnostics: found.to_vec(),
                });
            });
            observers.on_decorations(move |found| {
                decorations.record(Event::Decorations(found.to_vec()));
            });
            observers.on_schema_tags(move |service_id, tags| {
                schema_tags.record(Event::SchemaTags {
                    service_id: service_id.to_string(),
                    tags: tags.to_vec(),
                });
            });
        });
    }

    fn record(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Marker for [`Self::events_since`].
    #[must_use]
    pub fn checkpoint(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events_since(0)
    }

    #[must_use]
    pub fn events_since(&self, checkpoint: usize) -> Vec<Event> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.get(checkpoint..).unwrap_or_default().to_vec()
    }

    /// Diagnostics publications since `checkpoint`, in order.
    #[must_use]
    pub fn diagnostics_since(&self, checkpoint: usize) -> Vec<(FileUri, Vec<Diagnostic>)> {
        self.events_since(checkpoint)
            .into_iter()
            .filter_map(|event| match event {
                Event::Diagnostics { uri, diagnostics } => Some((uri, diagnostics)),
                _ => None,
            })
            .collect()
    }

    /// The most recently published decoration set.
    #[must_use]
    pub fn latest_decorations(&self) -> Option<Vec<Decoration>> {
        self.events()
            .into_iter()
            .rev()
            .find_map(|event| match event {
                Event::Decorations(decorations) => Some(decorations),
                _ => None,
            })
    }

    /// Number of events since `checkpoint` matching `predicate`.
    pub fn count_since(&self, checkpoint: usize, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events_since(checkpoint)
            .iter()
            .filter(|event| predicate(event))
            .count()
    }
}

impl LoadingNotifier for EventLog {
    fn start(&self, label: &str) {
        self.record(Event::LoadingStarted(label.to_string()));
    }

    fn end(&self, label: &str) {
        self.record(Event::LoadingFinished(label.to_string()));
    }

    fn error(&self, label: &str, message: &str) {
        self.record(Event::LoadingFailed {
            label: label.to_string(),
            message: message.to_string(),
        });
    }
}
