use super::llm_helper::{build_request, chat_with_logging};
use crate::error::ClassifyError;
use crate::llm::LLMRequest;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::state::{ClassificationState, Stage};
use crate::prompt::PromptKind;
use crate::stream::TokenSink;
use crate::verdict::{parse_verdict, Verdict, VerdictLabel, VerdictParseError};
use async_trait::async_trait;
use minijinja::context;
use tracing::{info, warn};

/// Which question the analysis asks of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisRole {
    /// "Does this document contain sensitive information?"
    Forward,
    /// "Can this document be made public?"
    Reverse,
}

impl AnalysisRole {
    pub fn stage(&self) -> Stage {
        match self {
            AnalysisRole::Forward => Stage::SemanticForward,
            AnalysisRole::Reverse => Stage::SemanticReverse,
        }
    }

    fn prompt(&self) -> PromptKind {
        match self {
            AnalysisRole::Forward => PromptKind::Forward,
            AnalysisRole::Reverse => PromptKind::Reverse,
        }
    }

    fn expected_labels(&self) -> &'static str {
        match self {
            AnalysisRole::Forward => "Sensitive, NonSensitive",
            AnalysisRole::Reverse => "Public, NonPublic",
        }
    }

    fn accepts(&self, label: VerdictLabel) -> bool {
        match self {
            AnalysisRole::Forward => {
                matches!(label, VerdictLabel::Sensitive | VerdictLabel::NonSensitive)
            }
            AnalysisRole::Reverse => {
                matches!(label, VerdictLabel::Public | VerdictLabel::NonPublic)
            }
        }
    }

    /// Parses a reply and checks the label answers this role's question
    pub fn interpret(&self, raw: &str) -> Result<Verdict, ClassifyError> {
        let malformed = |source| ClassifyError::MalformedModelResponse {
            stage: self.stage().as_str(),
            source,
        };

        let verdict = parse_verdict(raw).map_err(malformed)?;
        if !self.accepts(verdict.label()) {
            return Err(malformed(VerdictParseError::UnexpectedLabel {
                label: verdict.label(),
                expected: self.expected_labels(),
            }));
        }
        Ok(verdict)
    }
}

/// One semantic judgment by the language model
pub struct AnalysisPhase {
    role: AnalysisRole,
}

impl AnalysisPhase {
    pub fn new(role: AnalysisRole) -> Self {
        Self { role }
    }

    pub fn forward() -> Self {
        Self::new(AnalysisRole::Forward)
    }

    pub fn reverse() -> Self {
        Self::new(AnalysisRole::Reverse)
    }

    fn build_prompt(
        &self,
        context: &PipelineContext,
        state: &ClassificationState,
    ) -> Result<LLMRequest, ClassifyError> {
        let system = context.prompts.render(self.role.prompt(), context! {})?;
        let user = context.prompts.render(
            PromptKind::Document,
            context! { title => state.title(), content => state.content() },
        )?;
        Ok(build_request(context, system, user))
    }
}

#[async_trait]
impl WorkflowPhase for AnalysisPhase {
    fn stage(&self) -> Stage {
        self.role.stage()
    }

    async fn execute(
        &self,
        context: &PipelineContext,
        state: ClassificationState,
        _tokens: Option<&TokenSink>,
    ) -> Result<ClassificationState, ClassifyError> {
        let stage = self.stage();
        let request = self.build_prompt(context, &state)?;
        let reply = chat_with_logging(context, stage, request).await?;

        let verdict = match self.role.interpret(&reply) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(stage = %stage, error = %e, "Unusable analysis reply, using degraded verdict");
                Verdict::degraded()
            }
        };

        info!(
            stage = %stage,
            label = %verdict.label(),
            confidence = verdict.confidence(),
            "Analysis verdict"
        );

        let evidence = format!(
            "{} ({}): {}",
            verdict.label(),
            verdict.confidence(),
            verdict.evidence()
        );
        let state = state.with_evidence(stage, evidence);

        Ok(match self.role {
            AnalysisRole::Forward => state.with_forward(verdict),
            AnalysisRole::Reverse => state.with_reverse(verdict),
        })
    }
}
