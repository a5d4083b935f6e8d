//! Observer trait for per-step and per-page run events.
//!
//! Inject an `Arc<dyn PipelineObserver>` via
//! [`crate::config::PipelineConfigBuilder::observer`] to receive events as
//! the runner executes each step and stamps each page.
//!
//! # Why an observer instead of return values?
//!
//! Console output is informational only — it is explicitly not part of
//! the run contract. Keeping it behind a trait means the library never
//! prints anything itself: the CLI attaches a progress bar, a service
//! embedding the library can forward events to its own telemetry, and
//! tests attach a recording fake. All methods default to no-ops so
//! implementations only override what they care about.

use std::sync::Arc;

/// Called by the runner as the pipeline progresses.
///
/// The run is strictly sequential, so events arrive in order and never
/// concurrently; `Send + Sync` is still required because the observer is
/// shared through the config.
pub trait PipelineObserver: Send + Sync {
    /// Called once before the first step executes.
    fn on_run_start(&self, total_steps: usize) {
        let _ = total_steps;
    }

    /// Called just before a step executes.
    ///
    /// # Arguments
    /// * `index` — 0-indexed position in the step list
    /// * `total` — number of steps in the list
    /// * `label` — the step's human-readable label
    fn on_step_start(&self, index: usize, total: usize, label: &str) {
        let _ = (index, total, label);
    }

    /// Called when a step completes successfully.
    fn on_step_complete(&self, index: usize, total: usize, label: &str, duration_ms: u64) {
        let _ = (index, total, label, duration_ms);
    }

    /// Called when a step fails. No further step events follow.
    fn on_step_failed(&self, index: usize, total: usize, label: &str, error: &str) {
        let _ = (index, total, label, error);
    }

    /// Called once before the first stamp call, after the page count is
    /// resolved.
    fn on_stamp_start(&self, total_pages: u32) {
        let _ = total_pages;
    }

    /// Called after a page is stamped and the working PDF replaced.
    ///
    /// # Arguments
    /// * `page`        — 1-indexed page number
    /// * `total_pages` — resolved page count
    fn on_page_stamped(&self, page: u32, total_pages: u32) {
        let _ = (page, total_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ObserverHandle = Arc<dyn PipelineObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingObserver {
        steps_started: AtomicUsize,
        steps_completed: AtomicUsize,
        pages_stamped: AtomicUsize,
    }

    impl PipelineObserver for TrackingObserver {
        fn on_step_start(&self, _index: usize, _total: usize, _label: &str) {
            self.steps_started.fetch_add(1, Ordering::SeqCst);
        }

        fn on_step_complete(&self, _index: usize, _total: usize, _label: &str, _ms: u64) {
            self.steps_completed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_stamped(&self, _page: u32, _total: u32) {
            self.pages_stamped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn default_methods_are_noops() {
        // NoopObserver overrides nothing; all calls must be safe.
        let obs = NoopObserver;
        obs.on_run_start(12);
        obs.on_step_start(0, 12, "run mapping tool");
        obs.on_step_failed(0, 12, "run mapping tool", "exit 2");
        obs.on_stamp_start(5);
        obs.on_page_stamped(1, 5);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let obs = TrackingObserver::default();
        obs.on_step_start(0, 3, "a");
        obs.on_step_complete(0, 3, "a", 10);
        obs.on_page_stamped(1, 2);
        obs.on_page_stamped(2, 2);
        assert_eq!(obs.steps_started.load(Ordering::SeqCst), 1);
        assert_eq!(obs.steps_completed.load(Ordering::SeqCst), 1);
        assert_eq!(obs.pages_stamped.load(Ordering::SeqCst), 2);
    }
}
