use super::context::PipelineContext;
use super::state::{ClassificationState, Stage};
use crate::error::ClassifyError;
use crate::stream::TokenSink;
use async_trait::async_trait;

#[async_trait]
pub trait WorkflowPhase: Send + Sync {
    fn stage(&self) -> Stage;

    /// Consumes the state and returns the next one.
    ///
    /// `tokens` is present only in streaming runs.
    async fn execute(
        &self,
        context: &PipelineContext,
        state: ClassificationState,
        tokens: Option<&TokenSink>,
    ) -> Result<ClassificationState, ClassifyError>;
}
