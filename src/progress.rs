//! Progress reporting utilities

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

/// Receiver of coarse-grained status updates.
///
/// Called synchronously from whatever thread is loading or diffing. Purely
/// observational: implementations must return promptly and never influence
/// the comparison.
pub trait ProgressSink: Send + Sync {
    fn report(&self, current: u64, total: u64, message: &str);
}

/// Discards every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _current: u64, _total: u64, _message: &str) {}
}

/// Forwards updates to the `log` facade; messages carry their own label
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, _current: u64, _total: u64, message: &str) {
        log::info!("{}", message);
    }
}

pub fn noop() -> Arc<dyn ProgressSink> {
    Arc::new(NoopProgress)
}

/// Terminal progress for comparison runs, one bar per side of each entity
#[derive(Debug)]
pub struct ProgressReporter {
    multi: Option<MultiProgress>,
}

impl ProgressReporter {
    /// Create a reporter that draws progress bars
    pub fn new_for_run() -> Self {
        Self {
            multi: Some(MultiProgress::new()),
        }
    }

    /// Create minimal reporter (no progress bars, updates go to the log)
    pub fn new_minimal() -> Self {
        Self { multi: None }
    }

    pub fn shows_progress(&self) -> bool {
        self.multi.is_some()
    }

    /// Sink for one labelled unit of work
    pub fn sink_for(&self, label: &str) -> Arc<dyn ProgressSink> {
        match &self.multi {
            Some(multi) => {
                let pb = multi.add(create_progress_bar(label));
                Arc::new(BarProgress { pb })
            }
            None => Arc::new(LogProgress),
        }
    }

    /// Old and new sinks for one entity, so concurrent loads never share a bar
    pub fn side_sinks(&self, entity: &str) -> (Arc<dyn ProgressSink>, Arc<dyn ProgressSink>) {
        (
            self.sink_for(&format!("{} old", entity)),
            self.sink_for(&format!("{} new", entity)),
        )
    }
}

/// A single indicatif bar driven through `ProgressSink`
#[derive(Debug)]
pub struct BarProgress {
    pb: ProgressBar,
}

impl ProgressSink for BarProgress {
    fn report(&self, current: u64, total: u64, message: &str) {
        if total > 0 {
            self.pb.set_length(total);
            self.pb.set_position(current.min(total));
        }
        self.pb.set_message(message.to_string());
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish();
        }
    }
}

/// Create a progress bar for one side of an entity
fn create_progress_bar(label: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:20} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .expect("Invalid progress template")
            .progress_chars("#>-"),
    );
    pb.set_prefix(label.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
