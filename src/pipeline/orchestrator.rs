use super::context::PipelineContext;
use super::phase_trait::WorkflowPhase;
use super::phases::{AnalysisPhase, DecisionPhase, HardConditionPhase, StartPhase};
use super::state::{ClassificationState, Stage};
use crate::error::ClassifyError;
use crate::progress::{LoggingHandler, ProgressEvent, ProgressHandler};
use crate::stream::TokenSink;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Runs the workflow state machine:
///
/// ```text
/// start → hard_condition ─┬─ sensitive ─────────────────────────────→ decision → terminal
///                         └─ otherwise → semantic_forward → semantic_reverse ─┘
/// ```
pub struct PipelineOrchestrator {
    start: StartPhase,
    hard_condition: HardConditionPhase,
    forward: AnalysisPhase,
    reverse: AnalysisPhase,
    decision: DecisionPhase,
    progress_handler: Arc<dyn ProgressHandler>,
}

impl PipelineOrchestrator {
    pub fn new(progress_handler: Arc<dyn ProgressHandler>) -> Self {
        Self {
            start: StartPhase,
            hard_condition: HardConditionPhase,
            forward: AnalysisPhase::forward(),
            reverse: AnalysisPhase::reverse(),
            decision: DecisionPhase,
            progress_handler,
        }
    }

    /// Stage that follows `current` for the given state
    pub fn next_stage(current: Stage, state: &ClassificationState) -> Stage {
        match current {
            Stage::Start => Stage::HardCondition,
            Stage::HardCondition if state.is_sensitive() => Stage::Decision,
            Stage::HardCondition => Stage::SemanticForward,
            Stage::SemanticForward => Stage::SemanticReverse,
            Stage::SemanticReverse => Stage::Decision,
            Stage::Decision | Stage::Terminal => Stage::Terminal,
        }
    }

    fn phase(&self, stage: Stage) -> Option<&dyn WorkflowPhase> {
        match stage {
            Stage::Start => Some(&self.start),
            Stage::HardCondition => Some(&self.hard_condition),
            Stage::SemanticForward => Some(&self.forward),
            Stage::SemanticReverse => Some(&self.reverse),
            Stage::Decision => Some(&self.decision),
            Stage::Terminal => None,
        }
    }

    pub async fn execute(
        &self,
        context: &PipelineContext,
        state: ClassificationState,
        tokens: Option<&TokenSink>,
    ) -> Result<ClassificationState, ClassifyError> {
        let mut state = state;
        let mut stage = Stage::Start;

        while let Some(phase) = self.phase(stage) {
            self.progress_handler
                .on_progress(&ProgressEvent::StageStarted { stage });

            let phase_start = Instant::now();
            state = phase.execute(context, state.entering(stage), tokens).await?;

            self.progress_handler
                .on_progress(&ProgressEvent::StageCompleted {
                    stage,
                    duration: phase_start.elapsed(),
                });

            let next = Self::next_stage(stage, &state);
            debug!(from = %stage, to = %next, "Stage transition");
            stage = next;
        }

        Ok(state.entering(Stage::Terminal))
    }
}

impl Default for PipelineOrchestrator {
    fn default() -> Self {
        Self::new(Arc::new(LoggingHandler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::{LexicalMatch, PatternKind};
    use crate::pipeline::ClassificationRequest;
    use yare::parameterized;

    fn state() -> ClassificationState {
        ClassificationState::new(ClassificationRequest::new("t", "c"))
    }

    fn sensitive_state() -> ClassificationState {
        state().with_lexical_hit(LexicalMatch {
            kind: PatternKind::Keyword,
            category: "c".to_string(),
            pattern: "p".to_string(),
            matched_text: "p".to_string(),
        })
    }

    #[parameterized(
        start = { Stage::Start, Stage::HardCondition },
        forward = { Stage::SemanticForward, Stage::SemanticReverse },
        reverse = { Stage::SemanticReverse, Stage::Decision },
        decision = { Stage::Decision, Stage::Terminal },
        terminal = { Stage::Terminal, Stage::Terminal },
    )]
    fn test_fixed_transitions(from: Stage, to: Stage) {
        assert_eq!(PipelineOrchestrator::next_stage(from, &state()), to);
    }

    #[test]
    fn test_hard_condition_routing() {
        assert_eq!(
            PipelineOrchestrator::next_stage(Stage::HardCondition, &state()),
            Stage::SemanticForward
        );
        assert_eq!(
            PipelineOrchestrator::next_stage(Stage::HardCondition, &sensitive_state()),
            Stage::Decision
        );
    }

    #[test]
    fn test_terminal_has_no_phase() {
        let orchestrator = PipelineOrchestrator::default();
        assert!(orchestrator.phase(Stage::Terminal).is_none());
        assert_eq!(
            orchestrator.phase(Stage::SemanticReverse).map(|p| p.stage()),
            Some(Stage::SemanticReverse)
        );
    }
}
