//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted {
                run_id,
                title,
                content_chars,
            } => {
                info!(run_id = %run_id, content_chars, "Starting classification");
                debug!(run_id = %run_id, title = %title, "Document title");
            }
            ProgressEvent::StageStarted { stage } => {
                debug!(stage = %stage, "Starting stage");
            }
            ProgressEvent::StageCompleted { stage, duration } => {
                info!(
                    stage = %stage,
                    duration_ms = duration.as_millis(),
                    "Stage complete"
                );
            }
            ProgressEvent::Completed {
                is_sensitive,
                confidence,
                status,
                total_time,
            } => {
                info!(
                    is_sensitive,
                    confidence,
                    status = %status,
                    total_time_ms = total_time.as_millis(),
                    "Classification complete"
                );
            }
            ProgressEvent::Failed { error } => {
                warn!(error = %error, "Classification failed");
            }
        }
    }
}
