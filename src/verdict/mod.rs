//! Verdict schema and tolerant parsing of model replies
//!
//! Analysis stages must answer with `{result, confidence, evidence}`; the decision stage with
//! `{is_sensitive, confidence, evidence}`. Both go through [`sanitize`] before decoding and are
//! then validated field by field, so a reply either yields a well-formed value or a
//! [`VerdictParseError`] that the calling stage turns into a degraded result.

mod sanitize;

pub use sanitize::sanitize;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Evidence text carried by the degraded verdict
pub const PARSE_FAILURE_EVIDENCE: &str = "parse failure";

#[derive(Debug, Error, PartialEq)]
pub enum VerdictParseError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid label: {0}")]
    InvalidLabel(String),
    #[error("Invalid confidence value: {0} (must be an integer between 0 and 100)")]
    InvalidConfidence(String),
    #[error("Invalid boolean value: {0}")]
    InvalidBoolean(String),
    #[error("Label {label} is not a valid answer here (expected one of {expected})")]
    UnexpectedLabel {
        label: VerdictLabel,
        expected: &'static str,
    },
}

/// Judgment label produced by an analysis stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictLabel {
    Sensitive,
    NonSensitive,
    Public,
    NonPublic,
}

impl VerdictLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictLabel::Sensitive => "Sensitive",
            VerdictLabel::NonSensitive => "NonSensitive",
            VerdictLabel::Public => "Public",
            VerdictLabel::NonPublic => "NonPublic",
        }
    }

    /// True when the label argues for classifying the document as sensitive
    pub fn leans_sensitive(&self) -> bool {
        matches!(self, VerdictLabel::Sensitive | VerdictLabel::NonPublic)
    }
}

impl fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerdictLabel {
    type Err = VerdictParseError;

    /// Accepts the canonical names in any case and spacing, plus the Chinese labels
    /// models tend to answer with for government documents.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match key.as_str() {
            "sensitive" | "classified" | "涉密" => Ok(VerdictLabel::Sensitive),
            "nonsensitive" | "notsensitive" | "unclassified" | "非涉密" => {
                Ok(VerdictLabel::NonSensitive)
            }
            "public" | "公开" => Ok(VerdictLabel::Public),
            "nonpublic" | "notpublic" | "非公开" => Ok(VerdictLabel::NonPublic),
            _ => Err(VerdictParseError::InvalidLabel(s.to_string())),
        }
    }
}

/// Structured judgment of one analysis stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VerdictFields")]
pub struct Verdict {
    label: VerdictLabel,
    confidence: u8,
    evidence: String,
}

/// Wire shape of [`Verdict`]; decoding goes through [`Verdict::new`]
#[derive(Deserialize)]
struct VerdictFields {
    label: VerdictLabel,
    confidence: u8,
    evidence: String,
}

impl From<VerdictFields> for Verdict {
    fn from(fields: VerdictFields) -> Self {
        Verdict::new(fields.label, fields.confidence, fields.evidence)
    }
}

impl Verdict {
    /// Confidence above 100 is clamped
    pub fn new(label: VerdictLabel, confidence: u8, evidence: impl Into<String>) -> Self {
        Self {
            label,
            confidence: confidence.min(100),
            evidence: evidence.into(),
        }
    }

    /// Stand-in used when a stage cannot parse its model reply
    pub fn degraded() -> Self {
        Self::new(VerdictLabel::NonSensitive, 0, PARSE_FAILURE_EVIDENCE)
    }

    pub fn is_degraded(&self) -> bool {
        *self == Self::degraded()
    }

    pub fn label(&self) -> VerdictLabel {
        self.label
    }

    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    pub fn evidence(&self) -> &str {
        &self.evidence
    }

    /// Signed support for "sensitive": `+confidence` when the label leans sensitive,
    /// `-confidence` otherwise. A degraded verdict scores 0.
    pub fn sensitivity_score(&self) -> i32 {
        let magnitude = i32::from(self.confidence);
        if self.label.leans_sensitive() {
            magnitude
        } else {
            -magnitude
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(alias = "label")]
    result: Option<Value>,
    confidence: Option<Value>,
    #[serde(alias = "reason", alias = "reasoning")]
    evidence: Option<Value>,
}

/// Parses an analysis-stage reply into a [`Verdict`]
pub fn parse_verdict(raw: &str) -> Result<Verdict, VerdictParseError> {
    let cleaned = sanitize(raw);
    let parsed: RawVerdict = decode(&cleaned)?;

    let label = match parsed.result {
        Some(Value::String(s)) => s.parse::<VerdictLabel>()?,
        Some(other) => return Err(VerdictParseError::InvalidLabel(other.to_string())),
        None => return Err(VerdictParseError::MissingField("result")),
    };
    let confidence = coerce_confidence(
        parsed
            .confidence
            .as_ref()
            .ok_or(VerdictParseError::MissingField("confidence"))?,
    )?;
    let evidence = coerce_text(
        parsed
            .evidence
            .as_ref()
            .ok_or(VerdictParseError::MissingField("evidence"))?,
    );

    Ok(Verdict::new(label, confidence, evidence))
}

/// Final answer of the decision model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionReply {
    pub is_sensitive: bool,
    pub confidence: u8,
    pub evidence: String,
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(alias = "result")]
    is_sensitive: Option<Value>,
    #[serde(alias = "result_confidence")]
    confidence: Option<Value>,
    #[serde(alias = "result_detail")]
    evidence: Option<Value>,
}

/// Parses a decision-stage reply into a [`DecisionReply`]
pub fn parse_decision(raw: &str) -> Result<DecisionReply, VerdictParseError> {
    let cleaned = sanitize(raw);
    let parsed: RawDecision = decode(&cleaned)?;

    let is_sensitive = coerce_bool(
        parsed
            .is_sensitive
            .as_ref()
            .ok_or(VerdictParseError::MissingField("is_sensitive"))?,
    )?;
    let confidence = coerce_confidence(
        parsed
            .confidence
            .as_ref()
            .ok_or(VerdictParseError::MissingField("confidence"))?,
    )?;
    let evidence = parsed.evidence.as_ref().map(coerce_text).unwrap_or_default();

    Ok(DecisionReply {
        is_sensitive,
        confidence,
        evidence,
    })
}

fn decode<T: serde::de::DeserializeOwned>(cleaned: &str) -> Result<T, VerdictParseError> {
    serde_json::from_str(cleaned).map_err(|e| {
        VerdictParseError::InvalidJson(format!(
            "{}: {}",
            e,
            cleaned.chars().take(100).collect::<String>()
        ))
    })
}

/// Integers, integral floats and numeric strings (optionally with `%`) in 0..=100
fn coerce_confidence(value: &Value) -> Result<u8, VerdictParseError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if (0.0..=100.0).contains(&n) && n.fract() == 0.0 => Ok(n as u8),
        _ => Err(VerdictParseError::InvalidConfidence(value.to_string())),
    }
}

fn coerce_bool(value: &Value) -> Result<bool, VerdictParseError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_i64() == Some(1) => Ok(true),
        Value::Number(n) if n.as_i64() == Some(0) => Ok(false),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "涉密" => Ok(true),
            "false" | "no" | "0" | "非涉密" => Ok(false),
            _ => Err(VerdictParseError::InvalidBoolean(s.clone())),
        },
        other => Err(VerdictParseError::InvalidBoolean(other.to_string())),
    }
}

fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        canonical = { "Sensitive", VerdictLabel::Sensitive },
        lowercase = { "nonsensitive", VerdictLabel::NonSensitive },
        spaced = { "Non Public", VerdictLabel::NonPublic },
        snake = { "non_sensitive", VerdictLabel::NonSensitive },
        hyphen = { "non-public", VerdictLabel::NonPublic },
        chinese_sensitive = { "涉密", VerdictLabel::Sensitive },
        chinese_non_sensitive = { "非涉密", VerdictLabel::NonSensitive },
        chinese_public = { "公开", VerdictLabel::Public },
        chinese_non_public = { "非公开", VerdictLabel::NonPublic },
    )]
    fn test_label_parsing(input: &str, expected: VerdictLabel) {
        assert_eq!(input.parse::<VerdictLabel>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_label_rejected() {
        assert!(matches!(
            "maybe".parse::<VerdictLabel>(),
            Err(VerdictParseError::InvalidLabel(_))
        ));
    }

    #[test]
    fn test_parse_clean_verdict() {
        let verdict =
            parse_verdict(r#"{"result": "涉密", "confidence": 91, "evidence": "底价"}"#).unwrap();
        assert_eq!(verdict.label(), VerdictLabel::Sensitive);
        assert_eq!(verdict.confidence(), 91);
        assert_eq!(verdict.evidence(), "底价");
    }

    #[test]
    fn test_parse_is_stable_under_wrapping() {
        let clean = r#"{"result": "Public", "confidence": 98, "evidence": "公开征求意见"}"#;
        let wrapped = format!("```json\n{}\n``` // trailing note", clean);

        assert_eq!(parse_verdict(clean), parse_verdict(&wrapped));
        assert_eq!(
            parse_verdict(&sanitize(&wrapped)).unwrap(),
            parse_verdict(clean).unwrap()
        );
    }

    #[parameterized(
        integer = { "85", 85 },
        float_integral = { "85.0", 85 },
        string = { "\"85\"", 85 },
        percent = { "\"85%\"", 85 },
        zero = { "0", 0 },
        hundred = { "100", 100 },
    )]
    fn test_confidence_coercion(raw: &str, expected: u8) {
        let reply = format!(
            r#"{{"result": "Public", "confidence": {}, "evidence": "e"}}"#,
            raw
        );
        assert_eq!(parse_verdict(&reply).unwrap().confidence(), expected);
    }

    #[parameterized(
        too_large = { "101" },
        negative = { "-1" },
        fractional = { "85.5" },
        word = { "\"high\"" },
        range_placeholder = { "\"0-100\"" },
    )]
    fn test_confidence_rejected(raw: &str) {
        let reply = format!(
            r#"{{"result": "Public", "confidence": {}, "evidence": "e"}}"#,
            raw
        );
        assert!(matches!(
            parse_verdict(&reply),
            Err(VerdictParseError::InvalidConfidence(_))
        ));
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(
            parse_verdict(r#"{"confidence": 1, "evidence": "e"}"#),
            Err(VerdictParseError::MissingField("result"))
        );
        assert_eq!(
            parse_verdict(r#"{"result": "Public", "evidence": "e"}"#),
            Err(VerdictParseError::MissingField("confidence"))
        );
        assert_eq!(
            parse_verdict(r#"{"result": "Public", "confidence": 1}"#),
            Err(VerdictParseError::MissingField("evidence"))
        );
    }

    #[test]
    fn test_evidence_array_joined() {
        let verdict = parse_verdict(
            r#"{"result": "NonPublic", "confidence": 70, "evidence": ["内部参阅", "底价"]}"#,
        )
        .unwrap();
        assert_eq!(verdict.evidence(), "内部参阅; 底价");
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(
            parse_verdict("I think it is probably fine."),
            Err(VerdictParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_degraded_verdict() {
        let degraded = Verdict::degraded();
        assert_eq!(degraded.label(), VerdictLabel::NonSensitive);
        assert_eq!(degraded.confidence(), 0);
        assert_eq!(degraded.evidence(), "parse failure");
        assert!(degraded.is_degraded());
        assert_eq!(degraded.sensitivity_score(), 0);
    }

    #[test]
    fn test_sensitivity_score_sign() {
        assert_eq!(Verdict::new(VerdictLabel::Sensitive, 80, "").sensitivity_score(), 80);
        assert_eq!(Verdict::new(VerdictLabel::NonPublic, 60, "").sensitivity_score(), 60);
        assert_eq!(Verdict::new(VerdictLabel::NonSensitive, 80, "").sensitivity_score(), -80);
        assert_eq!(Verdict::new(VerdictLabel::Public, 99, "").sensitivity_score(), -99);
    }

    #[test]
    fn test_confidence_clamped_on_construction() {
        assert_eq!(Verdict::new(VerdictLabel::Public, 250, "").confidence(), 100);
    }

    #[test]
    fn test_confidence_clamped_on_deserialize() {
        let verdict: Verdict =
            serde_json::from_str(r#"{"label": "Public", "confidence": 250, "evidence": "x"}"#)
                .unwrap();
        assert_eq!(verdict.confidence(), 100);
        assert_eq!(verdict, Verdict::new(VerdictLabel::Public, 100, "x"));
    }

    #[test]
    fn test_code_fence_quoted_in_evidence() {
        let verdict = parse_verdict(
            r#"{"result":"Public","confidence":98,"evidence":"quotes a ```yaml``` snippet from the appendix"}"#,
        )
        .unwrap();
        assert_eq!(verdict.label(), VerdictLabel::Public);
        assert_eq!(verdict.confidence(), 98);
        assert_eq!(verdict.evidence(), "quotes a ```yaml``` snippet from the appendix");
    }

    #[test]
    fn test_braced_prose_before_verdict() {
        let verdict =
            parse_verdict(r#"如下{注}：{"result": "NonSensitive", "confidence": 70, "evidence": "通知"}"#)
                .unwrap();
        assert_eq!(verdict.label(), VerdictLabel::NonSensitive);
        assert!(!verdict.is_degraded());
    }

    #[test]
    fn test_parse_decision_canonical() {
        let reply = parse_decision(
            r#"{"is_sensitive": false, "confidence": 74, "evidence": "无敏感措辞"}"#,
        )
        .unwrap();
        assert_eq!(
            reply,
            DecisionReply {
                is_sensitive: false,
                confidence: 74,
                evidence: "无敏感措辞".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_decision_three_way_aliases() {
        let reply = parse_decision(
            "```json\n{\"result\": True, // 最终裁决\n\"result_confidence\": 88, \"result_detail\": \"规则 1 满足\"}\n```",
        )
        .unwrap();
        assert!(reply.is_sensitive);
        assert_eq!(reply.confidence, 88);
        assert_eq!(reply.evidence, "规则 1 满足");
    }

    #[parameterized(
        yes = { "\"yes\"", true },
        string_true = { "\"TRUE\"", true },
        one = { "1", true },
        string_zero = { "\"0\"", false },
        chinese = { "\"非涉密\"", false },
    )]
    fn test_decision_bool_coercion(raw: &str, expected: bool) {
        let reply = format!(r#"{{"is_sensitive": {}, "confidence": 50}}"#, raw);
        assert_eq!(parse_decision(&reply).unwrap().is_sensitive, expected);
    }

    #[test]
    fn test_decision_missing_flag() {
        assert_eq!(
            parse_decision(r#"{"confidence": 50, "evidence": "e"}"#),
            Err(VerdictParseError::MissingField("is_sensitive"))
        );
    }
}
