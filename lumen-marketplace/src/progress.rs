//! Progress reporting for a single installation

use crate::types::{InstallationProgress, InstallationStatus};
use sdk::errors::HostError;
use std::sync::Arc;

/// Receives every progress update of an installation
pub type ProgressCallback = Arc<dyn Fn(&InstallationProgress) + Send + Sync>;

/// Receives the final outcome of an operation, exactly once
pub type CompletionCallback = Box<dyn FnOnce(Result<(), &HostError>) + Send>;

/// Emits progress for one plugin
///
/// Fractions never go backwards and nothing is emitted after the terminal
/// `Installed` or `Error` update.
pub(crate) struct ProgressReporter {
    plugin_id: String,
    callback: Option<ProgressCallback>,
    last: f64,
    finished: bool,
}

impl ProgressReporter {
    pub(crate) fn new(plugin_id: impl Into<String>, callback: Option<ProgressCallback>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            callback,
            last: 0.0,
            finished: false,
        }
    }

    /// Report an intermediate step; terminal statuses go through
    /// [`finish`](Self::finish) and [`fail`](Self::fail)
    pub(crate) fn report(&mut self, status: InstallationStatus, fraction: f64) {
        if status.is_terminal() {
            return;
        }
        let fraction = self.clamp(fraction);
        self.emit(status, fraction, None);
    }

    pub(crate) fn finish(&mut self) {
        self.emit(InstallationStatus::Installed, 1.0, None);
        self.finished = true;
    }

    pub(crate) fn fail(&mut self, error: &HostError) {
        let fraction = self.last;
        self.emit(InstallationStatus::Error, fraction, Some(error.to_string()));
        self.finished = true;
    }

    fn clamp(&self, fraction: f64) -> f64 {
        if fraction.is_nan() {
            return self.last;
        }
        fraction.clamp(self.last, 1.0)
    }

    fn emit(&mut self, status: InstallationStatus, progress: f64, error_message: Option<String>) {
        if self.finished {
            return;
        }
        self.last = progress;

        if let Some(callback) = &self.callback {
            callback(&InstallationProgress {
                plugin_id: self.plugin_id.clone(),
                status,
                progress,
                error_message,
            });
        }
    }
}
