//! Pipeline context for managing dependencies

use std::sync::Arc;

use crate::lexicon::Lexicon;
use crate::llm::LLMClient;
use crate::policy::DecisionPolicy;
use crate::prompt::PromptLibrary;

pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Long-lived, read-only dependencies shared by every run
pub struct PipelineContext {
    /// Language-model capability used by the analysis and decision stages
    pub llm_client: Arc<dyn LLMClient>,

    pub lexicon: Arc<Lexicon>,

    pub prompts: Arc<PromptLibrary>,

    pub policy: DecisionPolicy,

    /// Generation limit for every model call
    pub max_tokens: u32,
}

impl PipelineContext {
    pub fn new(
        llm_client: Arc<dyn LLMClient>,
        lexicon: Arc<Lexicon>,
        prompts: Arc<PromptLibrary>,
        policy: DecisionPolicy,
    ) -> Self {
        Self {
            llm_client,
            lexicon,
            prompts,
            policy,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("llm_client", &self.llm_client.name())
            .field("policy", &self.policy)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}
