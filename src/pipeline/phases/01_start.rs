use crate::error::ClassifyError;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::state::{ClassificationState, Stage};
use crate::stream::TokenSink;
use async_trait::async_trait;
use tracing::debug;

/// Normalizes the document content
pub struct StartPhase;

#[async_trait]
impl WorkflowPhase for StartPhase {
    fn stage(&self) -> Stage {
        Stage::Start
    }

    async fn execute(
        &self,
        _context: &PipelineContext,
        state: ClassificationState,
        _tokens: Option<&TokenSink>,
    ) -> Result<ClassificationState, ClassifyError> {
        let state = state.with_normalized_content();
        if state.content().is_empty() {
            return Err(ClassifyError::InputInvalid(
                "document content is empty".to_string(),
            ));
        }

        debug!(chars = state.content().chars().count(), "Content normalized");
        Ok(state)
    }
}
