//! Labelled asynchronous loads with progress notifications.
//!
//! Concurrent loads under the same label share one in-flight future: the
//! second caller awaits the first caller's result instead of starting its
//! own load.

use crate::error::Result;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

/// Receives progress of labelled loads.
pub trait LoadingNotifier: Send + Sync {
    fn start(&self, label: &str);
    fn end(&self, label: &str);
    fn error(&self, label: &str, message: &str);
}

/// Reports load progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl LoadingNotifier for TracingNotifier {
    fn start(&self, label: &str) {
        tracing::debug!(label, "Loading started");
    }

    fn end(&self, label: &str) {
        tracing::info!(label, "Loading finished");
    }

    fn error(&self, label: &str, message: &str) {
        tracing::warn!(label, message, "Loading failed");
    }
}

type LoadResult = Option<Arc<dyn Any + Send + Sync>>;
type InFlight = Shared<BoxFuture<'static, LoadResult>>;

/// Runs loads, deduplicating those in flight under the same label.
pub struct LoadingHandler {
    notifier: Arc<dyn LoadingNotifier>,
    in_flight: Mutex<HashMap<String, InFlight>>,
}

impl std::fmt::Debug for LoadingHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("LoadingHandler")
            .field("in_flight", &in_flight.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for LoadingHandler {
    fn default() -> Self {
        Self::new(Arc::new(TracingNotifier))
    }
}

impl LoadingHandler {
    #[must_use]
    pub fn new(notifier: Arc<dyn LoadingNotifier>) -> Self {
        Self {
            notifier,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `load` under `label`.
    ///
    /// Failures are reported to the notifier and become `None`. If a load
    /// with this label is already running, `load` is dropped unpolled and
    /// the running load's result is returned.
    pub async fn handle<T, F>(&self, label: &str, load: F) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let shared = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(running) = in_flight.get(label) {
                tracing::debug!(label, "Joining load already in flight");
                running.clone()
            } else {
                self.notifier.start(label);
                let notifier = Arc::clone(&self.notifier);
                let owned_label = label.to_string();
                let future = async move {
                    match load.await {
                        Ok(value) => {
                            notifier.end(&owned_label);
                            Some(Arc::new(value) as Arc<dyn Any + Send + Sync>)
                        }
                        Err(error) => {
                            notifier.error(&owned_label, &error.to_string());
                            None
                        }
                    }
                }
                .boxed()
                .shared();
                in_flight.insert(label.to_string(), future.clone());
                future
            }
        };

        let result = shared.clone().await;

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if in_flight
                .get(label)
                .is_some_and(|running| running.ptr_eq(&shared))
            {
                in_flight.remove(label);
            }
        }

        match result?.downcast::<T>() {
            Ok(value) => Some(T::clone(&value)),
            Err(_) => {
                tracing::warn!(label, "Load joined under a label used for a different type");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProjectError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl LoadingNotifier for RecordingNotifier {
        fn start(&self, label: &str) {
            self.events.lock().unwrap().push(format!("start {label}"));
        }

        fn end(&self, label: &str) {
            self.events.lock().unwrap().push(format!("end {label}"));
        }

        fn error(&self, label: &str, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("error {label}: {message}"));
        }
    }

    #[tokio::test]
    async fn test_successful_load_notifies_start_and_end() {
        let notifier = Arc::new(RecordingNotifier::default());
        let handler = LoadingHandler::new(notifier.clone());

        let value = handler.handle("Loading schema", async { Ok(42_u32) }).await;
        assert_eq!(value, Some(42));
        assert_eq!(notifier.events(), ["start Loading schema", "end Loading schema"]);
    }

    #[tokio::test]
    async fn test_failed_load_becomes_none() {
        let notifier = Arc::new(RecordingNotifier::default());
        let handler = LoadingHandler::new(notifier.clone());

        let value: Option<u32> = handler
            .handle("Loading usage", async {
                Err(ProjectError::Usage("offline".to_string()))
            })
            .await;
        assert_eq!(value, None);
        assert_eq!(
            notifier.events(),
            [
                "start Loading usage",
                "error Loading usage: Failed to load usage data: offline"
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_loads_with_same_label_share_one_run() {
        let handler = LoadingHandler::default();
        let runs = Arc::new(AtomicUsize::new(0));

        let load = |runs: Arc<AtomicUsize>| async move {
            runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok("schema".to_string())
        };

        let (first, second) = tokio::join!(
            handler.handle("Loading schema", load(runs.clone())),
            handler.handle("Loading schema", load(runs.clone())),
        );
        assert_eq!(first.as_deref(), Some("schema"));
        assert_eq!(second.as_deref(), Some("schema"));
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Finished loads are not reused
        let third = handler.handle("Loading schema", load(runs.clone())).await;
        assert_eq!(third.as_deref(), Some("schema"));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_different_labels_run_independently() {
        let handler = LoadingHandler::default();
        let (a, b) = tokio::join!(
            handler.handle("a", async { Ok(1_u8) }),
            handler.handle("b", async { Ok(2_u8) }),
        );
        assert_eq!((a, b), (Some(1), Some(2)));
    }
}
