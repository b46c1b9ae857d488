use crate::error::ClassifyError;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::state::{ClassificationState, Stage};
use crate::stream::TokenSink;
use async_trait::async_trait;
use tracing::info;

/// Keyword and phrase matching; a hit marks the document sensitive
pub struct HardConditionPhase;

#[async_trait]
impl WorkflowPhase for HardConditionPhase {
    fn stage(&self) -> Stage {
        Stage::HardCondition
    }

    async fn execute(
        &self,
        context: &PipelineContext,
        state: ClassificationState,
        _tokens: Option<&TokenSink>,
    ) -> Result<ClassificationState, ClassifyError> {
        match context.lexicon.scan(state.content()) {
            Some(hit) => {
                info!(
                    kind = %hit.kind,
                    category = %hit.category,
                    matched = %hit.matched_text,
                    "Lexical rule fired"
                );
                Ok(state.with_lexical_hit(hit))
            }
            None => Ok(state),
        }
    }
}
