//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PodcastConfigBuilder::progress_callback`] to receive
//! events as a run moves through extraction and the six generation stages.
//! The CLI drives a progress bar from it; a server could forward events to a
//! log or a websocket without the library knowing about either.
//!
//! # Example
//!
//! ```rust
//! use paper2podcast::{PipelineProgressCallback, PipelineStage, PodcastConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: PipelineStage, duration_ms: u64) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{stage} done in {duration_ms}ms ({done} stages so far)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = PodcastConfig::builder()
//!     .progress_callback(counter as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::PipelineStage;
use std::sync::Arc;

/// Number of stages a run reports: extraction plus six generation stages.
pub const TOTAL_STAGES: usize = 7;

/// Called by the pipeline orchestrator as a run progresses.
///
/// Implementations must be `Send + Sync`: one config (and its callback) is
/// shared by every request the server handles concurrently. All methods have
/// default no-op implementations so callers only override what they need.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once when a run starts, before locator validation.
    fn on_run_start(&self, locator: &str, total_stages: usize) {
        let _ = (locator, total_stages);
    }

    /// Called just before a stage runs.
    fn on_stage_start(&self, stage: PipelineStage) {
        let _ = stage;
    }

    /// Called when a stage succeeds.
    fn on_stage_complete(&self, stage: PipelineStage, duration_ms: u64) {
        let _ = (stage, duration_ms);
    }

    /// Called when a stage fails. The run aborts right after.
    fn on_stage_error(&self, stage: PipelineStage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once when the run ends, successfully or not.
    fn on_run_complete(&self, success: bool, total_duration_ms: u64) {
        let _ = (success, total_duration_ms);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PodcastConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::PromptStage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl PipelineProgressCallback for TrackingCallback {
        fn on_stage_start(&self, _stage: PipelineStage) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_complete(&self, _stage: PipelineStage, _duration_ms: u64) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_error(&self, _stage: PipelineStage, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start("https://arxiv.org/abs/2301.00001", TOTAL_STAGES);
        cb.on_stage_start(PipelineStage::Extraction);
        cb.on_stage_complete(PipelineStage::Extraction, 10);
        cb.on_stage_error(PromptStage::PlanInitial.into(), "boom");
        cb.on_run_complete(false, 42);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_stage_start(PipelineStage::Extraction);
        tracker.on_stage_complete(PipelineStage::Extraction, 5);
        tracker.on_stage_start(PromptStage::PlanInitial.into());
        tracker.on_stage_error(PromptStage::PlanInitial.into(), "timeout");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
