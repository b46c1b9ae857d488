//! Shared helpers for integration tests: a classifier wired to a scripted model

use secdoc::llm::{LLMClient, MockLLMClient, MockResponse};
use secdoc::pipeline::PipelineContext;
use secdoc::policy::{DecisionPolicy, DecisionStrategy};
use secdoc::progress::NoOpHandler;
use secdoc::{Classifier, Lexicon, PromptLibrary};
use std::sync::Arc;

pub struct Harness {
    pub classifier: Classifier,
    pub llm: Arc<MockLLMClient>,
}

/// Classifier over the built-in lexicon and prompts, replaying `responses` in order
#[allow(dead_code)]
pub fn harness(strategy: DecisionStrategy, responses: Vec<MockResponse>) -> Harness {
    harness_with_policy(DecisionPolicy::default().with_strategy(strategy), responses)
}

#[allow(dead_code)]
pub fn harness_with_policy(policy: DecisionPolicy, responses: Vec<MockResponse>) -> Harness {
    let llm = Arc::new(MockLLMClient::new());
    llm.add_responses(responses);

    let client: Arc<dyn LLMClient> = llm.clone();
    let context = PipelineContext::new(
        client,
        Arc::new(Lexicon::builtin().expect("built-in lexicon compiles")),
        Arc::new(PromptLibrary::builtin().expect("built-in prompts parse")),
        policy,
    );

    Harness {
        classifier: Classifier::with_progress(context, Arc::new(NoOpHandler)),
        llm,
    }
}

/// Analysis-stage reply in the shape the prompts ask for
#[allow(dead_code)]
pub fn verdict(label: &str, confidence: u8, evidence: &str) -> MockResponse {
    MockResponse::text(
        serde_json::json!({
            "result": label,
            "confidence": confidence,
            "evidence": evidence,
        })
        .to_string(),
    )
}

/// Decision-stage reply
#[allow(dead_code)]
pub fn decision(is_sensitive: bool, confidence: u8, evidence: &str) -> MockResponse {
    MockResponse::text(decision_json(is_sensitive, confidence, evidence))
}

#[allow(dead_code)]
pub fn decision_json(is_sensitive: bool, confidence: u8, evidence: &str) -> String {
    serde_json::json!({
        "is_sensitive": is_sensitive,
        "confidence": confidence,
        "evidence": evidence,
    })
    .to_string()
}

/// Splits `text` into fragments of at most `size` characters
#[allow(dead_code)]
pub fn fragments(text: &str, size: usize) -> Vec<String> {
    text.chars()
        .collect::<Vec<_>>()
        .chunks(size)
        .map(|c| c.iter().collect())
        .collect()
}

/// A document no lexicon pattern matches
#[allow(dead_code)]
pub const PLAIN_DOCUMENT: &str = "关于组织开展2024年度全民健身运动会的通知。各单位请于五月底前报名。";
