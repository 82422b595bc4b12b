use graphql_client_project::LoadingNotifier;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Detect if we're running in a CI environment
fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "CIRCLECI", "BUILDKITE", "JENKINS_URL"]
        .iter()
        .any(|name| std::env::var_os(name).is_some())
}

/// Create a spinner with a message. Hidden in CI environments.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = if is_ci() {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };

    let style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Shows one spinner per in-flight load.
#[derive(Default)]
pub struct SpinnerNotifier {
    spinners: Mutex<HashMap<String, ProgressBar>>,
}

impl SpinnerNotifier {
    fn finish(&self, label: &str) {
        let removed = self
            .spinners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(label);
        if let Some(pb) = removed {
            pb.finish_and_clear();
        }
    }
}

impl LoadingNotifier for SpinnerNotifier {
    fn start(&self, label: &str) {
        self.spinners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(label.to_string(), spinner(&format!("{label}...")));
    }

    fn end(&self, label: &str) {
        self.finish(label);
        tracing::debug!(label, "Load finished");
    }

    fn error(&self, label: &str, message: &str) {
        self.finish(label);
        tracing::warn!(label, error = message, "Load failed");
    }
}
