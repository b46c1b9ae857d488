//! Classification state threaded through the workflow
//!
//! Stages receive the state by value and hand back the next one. Evidence is append-only;
//! the sensitivity flag and confidence change only through [`ClassificationState::with_lexical_hit`]
//! and the two decision setters.

use crate::error::ClassifyError;
use crate::lexicon::LexicalMatch;
use crate::verdict::Verdict;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller input: one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    #[serde(default)]
    pub doc_title: String,
    pub doc_content: String,
}

impl ClassificationRequest {
    pub fn new(doc_title: impl Into<String>, doc_content: impl Into<String>) -> Self {
        Self {
            doc_title: doc_title.into(),
            doc_content: doc_content.into(),
        }
    }

    /// Rejects documents with nothing left after normalization
    pub fn validate(&self) -> Result<(), ClassifyError> {
        if self.doc_content.chars().all(is_ignorable) {
            return Err(ClassifyError::InputInvalid(
                "document content is empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_ignorable(c: char) -> bool {
    c.is_whitespace() || matches!(c, '\u{feff}' | '\u{200b}')
}

/// Removes every whitespace character, including line breaks and full-width spaces
pub fn normalize_content(content: &str) -> String {
    content.chars().filter(|c| !is_ignorable(*c)).collect()
}

/// Workflow stages, in the order a full run visits them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    HardCondition,
    SemanticForward,
    SemanticReverse,
    Decision,
    Terminal,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::HardCondition => "hard_condition",
            Stage::SemanticForward => "semantic_forward",
            Stage::SemanticReverse => "semantic_reverse",
            Stage::Decision => "decision",
            Stage::Terminal => "terminal",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    #[default]
    Pending,
    Decided,
    /// The decision model answered with something unparseable
    Inconclusive,
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionStatus::Pending => write!(f, "pending"),
            DecisionStatus::Decided => write!(f, "decided"),
            DecisionStatus::Inconclusive => write!(f, "inconclusive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    pub stage: Stage,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationState {
    title: String,
    content: String,
    stage: Stage,
    is_sensitive: bool,
    confidence: u8,
    evidence: Vec<EvidenceEntry>,
    forward: Option<Verdict>,
    reverse: Option<Verdict>,
    lexical_hit: Option<LexicalMatch>,
    decision: DecisionStatus,
}

impl ClassificationState {
    /// Fresh state at `start`; content is stored as given until the start stage normalizes it
    pub fn new(request: ClassificationRequest) -> Self {
        Self {
            title: request.doc_title.trim().to_string(),
            content: request.doc_content,
            stage: Stage::Start,
            is_sensitive: false,
            confidence: 0,
            evidence: Vec::new(),
            forward: None,
            reverse: None,
            lexical_hit: None,
            decision: DecisionStatus::Pending,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_sensitive(&self) -> bool {
        self.is_sensitive
    }

    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    pub fn evidence(&self) -> &[EvidenceEntry] {
        &self.evidence
    }

    pub fn forward(&self) -> Option<&Verdict> {
        self.forward.as_ref()
    }

    pub fn reverse(&self) -> Option<&Verdict> {
        self.reverse.as_ref()
    }

    pub fn lexical_hit(&self) -> Option<&LexicalMatch> {
        self.lexical_hit.as_ref()
    }

    pub fn decision(&self) -> DecisionStatus {
        self.decision
    }

    /// `[stage] text` lines joined by newlines
    pub fn evidence_text(&self) -> String {
        self.evidence
            .iter()
            .map(|e| format!("[{}] {}", e.stage, e.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn entering(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_normalized_content(mut self) -> Self {
        self.content = normalize_content(&self.content);
        self
    }

    pub fn with_evidence(mut self, stage: Stage, text: impl Into<String>) -> Self {
        self.evidence.push(EvidenceEntry {
            stage,
            text: text.into(),
        });
        self
    }

    /// Marks the document sensitive on a lexical hit
    pub fn with_lexical_hit(mut self, hit: LexicalMatch) -> Self {
        let text = hit.evidence();
        self.is_sensitive = true;
        self.lexical_hit = Some(hit);
        self.with_evidence(Stage::HardCondition, text)
    }

    pub fn with_forward(mut self, verdict: Verdict) -> Self {
        self.forward = Some(verdict);
        self
    }

    pub fn with_reverse(mut self, verdict: Verdict) -> Self {
        self.reverse = Some(verdict);
        self
    }

    /// Final values set by the decision stage
    pub fn decided(mut self, is_sensitive: bool, confidence: u8) -> Self {
        self.is_sensitive = is_sensitive;
        self.confidence = confidence.min(100);
        self.decision = DecisionStatus::Decided;
        self
    }

    /// Leaves everything else untouched
    pub fn inconclusive(mut self) -> Self {
        self.decision = DecisionStatus::Inconclusive;
        self
    }

    pub fn outcome(&self) -> ClassificationOutcome {
        ClassificationOutcome {
            is_sensitive: self.is_sensitive,
            confidence: self.confidence,
            evidence: self.evidence_text(),
            status: self.decision,
        }
    }
}

/// Caller-facing result of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub is_sensitive: bool,
    pub confidence: u8,
    pub evidence: String,
    pub status: DecisionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::PatternKind;
    use crate::verdict::VerdictLabel;
    use yare::parameterized;

    fn hit() -> LexicalMatch {
        LexicalMatch {
            kind: PatternKind::Keyword,
            category: "流转限制".to_string(),
            pattern: "内部参阅".to_string(),
            matched_text: "内部参阅".to_string(),
        }
    }

    #[parameterized(
        ascii_spaces = { "a b  c", "abc" },
        newlines = { "第一行\n第二行\r\n第三行", "第一行第二行第三行" },
        full_width_space = { "关于\u{3000}通知", "关于通知" },
        tabs = { "\tx\ty\t", "xy" },
        byte_order_mark = { "\u{feff}正文", "正文" },
    )]
    fn test_normalize_content(input: &str, expected: &str) {
        assert_eq!(normalize_content(input), expected);
    }

    #[parameterized(
        empty = { "" },
        spaces = { "   " },
        full_width_only = { "\u{3000}\u{3000}\n" },
    )]
    fn test_blank_content_rejected(content: &str) {
        let err = ClassificationRequest::new("标题", content).validate().unwrap_err();
        assert!(matches!(err, ClassifyError::InputInvalid(_)));
    }

    #[test]
    fn test_untitled_document_accepted() {
        assert!(ClassificationRequest::new("", "正文").validate().is_ok());
    }

    #[test]
    fn test_request_deserializes_without_title() {
        let request: ClassificationRequest =
            serde_json::from_str(r#"{"doc_content": "正文"}"#).unwrap();
        assert_eq!(request.doc_title, "");
    }

    #[test]
    fn test_new_state_defaults() {
        let state = ClassificationState::new(ClassificationRequest::new(" 通知 ", "a b"));
        assert_eq!(state.title(), "通知");
        assert_eq!(state.stage(), Stage::Start);
        assert!(!state.is_sensitive());
        assert_eq!(state.confidence(), 0);
        assert_eq!(state.decision(), DecisionStatus::Pending);
        assert_eq!(state.with_normalized_content().content(), "ab");
    }

    #[test]
    fn test_lexical_hit_sets_flag_and_evidence() {
        let state = ClassificationState::new(ClassificationRequest::new("t", "c"))
            .with_lexical_hit(hit());
        assert!(state.is_sensitive());
        assert_eq!(state.evidence().len(), 1);
        assert!(state.evidence_text().starts_with("[hard_condition] "));
        assert!(state.evidence_text().contains("内部参阅"));
    }

    #[test]
    fn test_evidence_is_appended_in_order() {
        let state = ClassificationState::new(ClassificationRequest::new("t", "c"))
            .with_evidence(Stage::SemanticForward, "one")
            .with_evidence(Stage::SemanticReverse, "two");
        assert_eq!(
            state.evidence_text(),
            "[semantic_forward] one\n[semantic_reverse] two"
        );
    }

    #[test]
    fn test_inconclusive_keeps_values() {
        let state = ClassificationState::new(ClassificationRequest::new("t", "c"))
            .with_forward(Verdict::new(VerdictLabel::NonSensitive, 40, "x"))
            .inconclusive();
        let outcome = state.outcome();
        assert_eq!(outcome.status, DecisionStatus::Inconclusive);
        assert!(!outcome.is_sensitive);
        assert_eq!(outcome.confidence, 0);
        assert!(state.forward().is_some());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ClassificationState::new(ClassificationRequest::new("t", "c"))
            .with_evidence(Stage::Decision, "d")
            .decided(true, 95)
            .outcome();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "is_sensitive": true,
                "confidence": 95,
                "evidence": "[decision] d",
                "status": "decided"
            })
        );
    }
}
