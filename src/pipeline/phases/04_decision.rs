use super::llm_helper::{build_request, chat_with_logging, stream_with_logging};
use crate::error::ClassifyError;
use crate::llm::LLMRequest;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::state::{ClassificationState, Stage};
use crate::policy::{DecisionStrategy, WeightedOutcome};
use crate::prompt::PromptKind;
use crate::stream::TokenSink;
use crate::verdict::{parse_decision, Verdict};
use async_trait::async_trait;
use minijinja::context;
use tracing::{info, warn};

/// Final judgment: lexical fast path, rules 1 and 2, then weighted synthesis
pub struct DecisionPhase;

impl DecisionPhase {
    fn build_prompt(
        context: &PipelineContext,
        forward: &Verdict,
        reverse: &Verdict,
        weighted: &WeightedOutcome,
    ) -> Result<LLMRequest, ClassifyError> {
        let policy = &context.policy;
        let system = context.prompts.render(
            PromptKind::Decision,
            context! {
                forward_weight => policy.forward_weight,
                reverse_weight => policy.reverse_weight,
                lexical_weight => policy.lexical_weight,
                threshold => policy.confidence_threshold,
            },
        )?;
        let user = context.prompts.render(
            PromptKind::DecisionInput,
            context! {
                forward => forward,
                reverse => reverse,
                lexical_weight => policy.lexical_weight,
                aggregate => format!("{:.2}", weighted.aggregate),
            },
        )?;
        Ok(build_request(context, system, user))
    }

    /// Decision reached without a model; streaming listeners still get it as one token
    async fn settle(
        state: ClassificationState,
        tokens: Option<&TokenSink>,
    ) -> Result<ClassificationState, ClassifyError> {
        if let Some(sink) = tokens {
            let decision = serde_json::json!({
                "is_sensitive": state.is_sensitive(),
                "confidence": state.confidence(),
                "evidence": state.evidence_text(),
            });
            sink.token(decision.to_string()).await?;
        }
        Ok(state)
    }
}

#[async_trait]
impl WorkflowPhase for DecisionPhase {
    fn stage(&self) -> Stage {
        Stage::Decision
    }

    async fn execute(
        &self,
        context: &PipelineContext,
        state: ClassificationState,
        tokens: Option<&TokenSink>,
    ) -> Result<ClassificationState, ClassifyError> {
        if state.is_sensitive() && state.lexical_hit().is_some() {
            info!("Lexical fast path, no model call");
            return Self::settle(state.decided(true, 100), tokens).await;
        }

        let forward = state.forward().cloned().unwrap_or_else(Verdict::degraded);
        let reverse = state.reverse().cloned().unwrap_or_else(Verdict::degraded);
        let policy = &context.policy;

        if let Some(hit) = policy.short_circuit(&forward, &reverse) {
            info!(rule = %hit.rule, confidence = hit.confidence, "Decision rule fired");
            let state = state
                .with_evidence(
                    Stage::Decision,
                    format!(
                        "{} fired: confidence {} exceeds threshold {}",
                        hit.rule, hit.confidence, policy.confidence_threshold
                    ),
                )
                .decided(true, hit.confidence);
            return Self::settle(state, tokens).await;
        }

        let weighted = policy.weigh(&forward, &reverse);

        match policy.strategy {
            DecisionStrategy::Rules => {
                info!(
                    aggregate = weighted.aggregate,
                    is_sensitive = weighted.is_sensitive,
                    "Weighted decision"
                );
                let state = state
                    .with_evidence(
                        Stage::Decision,
                        format!(
                            "weighted aggregate {:.2} (forward {} x {}, reverse {} x {}): {}",
                            weighted.aggregate,
                            forward.sensitivity_score(),
                            policy.forward_weight,
                            reverse.sensitivity_score(),
                            policy.reverse_weight,
                            if weighted.is_sensitive {
                                "sensitive"
                            } else {
                                "non-sensitive"
                            }
                        ),
                    )
                    .decided(weighted.is_sensitive, weighted.confidence);
                Self::settle(state, tokens).await
            }
            DecisionStrategy::Model => {
                let request = Self::build_prompt(context, &forward, &reverse, &weighted)?;
                let reply = match tokens {
                    Some(sink) => stream_with_logging(context, Stage::Decision, request, sink).await?,
                    None => chat_with_logging(context, Stage::Decision, request).await?,
                };

                match parse_decision(&reply) {
                    Ok(decision) => {
                        info!(
                            is_sensitive = decision.is_sensitive,
                            confidence = decision.confidence,
                            aggregate = weighted.aggregate,
                            "Model decision"
                        );
                        let state = if decision.evidence.trim().is_empty() {
                            state
                        } else {
                            state.with_evidence(Stage::Decision, decision.evidence)
                        };
                        Ok(state.decided(decision.is_sensitive, decision.confidence))
                    }
                    Err(e) => {
                        let e = ClassifyError::MalformedModelResponse {
                            stage: Stage::Decision.as_str(),
                            source: e,
                        };
                        warn!(error = %e, "Decision inconclusive");
                        Ok(state.inconclusive())
                    }
                }
            }
        }
    }
}
