//! Progress handler trait and events

use crate::pipeline::{DecisionStatus, Stage};
use std::time::Duration;

/// Events emitted while a document moves through the workflow
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run accepted; `title` belongs in debug output only
    RunStarted {
        run_id: String,
        title: String,
        content_chars: usize,
    },

    /// Stage entered
    StageStarted { stage: Stage },

    /// Stage finished
    StageCompleted { stage: Stage, duration: Duration },

    /// Run reached the terminal state
    Completed {
        is_sensitive: bool,
        confidence: u8,
        status: DecisionStatus,
        total_time: Duration,
    },

    /// Run aborted
    Failed { error: String },
}

/// Trait for handling progress events during classification
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
