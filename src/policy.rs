//! Decision policy
//!
//! Weights, the short-circuit threshold and the synthesis strategy used by the decision stage.
//! Defaults can be replaced by a TOML file and then by `SECDOC_*` environment variables:
//!
//! ```toml
//! forward_weight = 40
//! reverse_weight = 30
//! lexical_weight = 30
//! confidence_threshold = 90
//! strategy = "rules"
//! ```

use crate::verdict::{Verdict, VerdictLabel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_FORWARD_WEIGHT: f64 = 70.0;
pub const DEFAULT_REVERSE_WEIGHT: f64 = 30.0;
pub const DEFAULT_LEXICAL_WEIGHT: f64 = 0.0;
pub const DEFAULT_CONFIDENCE_THRESHOLD: u8 = 90;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Failed to read policy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse policy file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to parse {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("Policy validation failed: {0}")]
    ValidationFailed(String),
}

/// How rule 3 (weighted synthesis) reaches its answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStrategy {
    /// A decision model weighs the verdicts, given the precomputed aggregate
    #[default]
    Model,
    /// The weighted aggregate is the decision
    Rules,
}

impl FromStr for DecisionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "model" | "llm" => Ok(DecisionStrategy::Model),
            "rules" | "weighted" => Ok(DecisionStrategy::Rules),
            other => Err(format!("unknown decision strategy: {}", other)),
        }
    }
}

impl fmt::Display for DecisionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionStrategy::Model => write!(f, "model"),
            DecisionStrategy::Rules => write!(f, "rules"),
        }
    }
}

/// Short-circuit rules, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    /// Rule 1: forward analysis says Sensitive above the threshold
    ForwardSensitive,
    /// Rule 2: reverse analysis says NonPublic above the threshold
    ReverseNonPublic,
}

impl fmt::Display for DecisionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionRule::ForwardSensitive => write!(f, "rule 1 (forward Sensitive)"),
            DecisionRule::ReverseNonPublic => write!(f, "rule 2 (reverse NonPublic)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleHit {
    pub rule: DecisionRule,
    pub confidence: u8,
}

/// Deterministic result of rule 3
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedOutcome {
    pub aggregate: f64,
    pub is_sensitive: bool,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecisionPolicy {
    pub forward_weight: f64,
    pub reverse_weight: f64,
    /// Weight of the lexical signal; the lexical score is always 0 on the weighted path
    pub lexical_weight: f64,
    pub confidence_threshold: u8,
    pub strategy: DecisionStrategy,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            forward_weight: DEFAULT_FORWARD_WEIGHT,
            reverse_weight: DEFAULT_REVERSE_WEIGHT,
            lexical_weight: DEFAULT_LEXICAL_WEIGHT,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            strategy: DecisionStrategy::default(),
        }
    }
}

impl DecisionPolicy {
    /// The three-way 40/30/30 weighting
    pub fn three_way() -> Self {
        Self {
            forward_weight: 40.0,
            reverse_weight: 30.0,
            lexical_weight: 30.0,
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: DecisionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let text = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| PolicyError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `SECDOC_*` overrides found through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), PolicyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "SECDOC_FORWARD_WEIGHT")? {
            self.forward_weight = v;
        }
        if let Some(v) = parse_var(&lookup, "SECDOC_REVERSE_WEIGHT")? {
            self.reverse_weight = v;
        }
        if let Some(v) = parse_var(&lookup, "SECDOC_LEXICAL_WEIGHT")? {
            self.lexical_weight = v;
        }
        if let Some(v) = parse_var(&lookup, "SECDOC_CONFIDENCE_THRESHOLD")? {
            self.confidence_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "SECDOC_DECISION_STRATEGY")? {
            self.strategy = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        let weights = [
            ("forward_weight", self.forward_weight),
            ("reverse_weight", self.reverse_weight),
            ("lexical_weight", self.lexical_weight),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PolicyError::ValidationFailed(format!(
                    "{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        if self.total_weight() <= 0.0 {
            return Err(PolicyError::ValidationFailed(
                "At least one weight must be greater than zero".to_string(),
            ));
        }
        if self.confidence_threshold > 100 {
            return Err(PolicyError::ValidationFailed(format!(
                "confidence_threshold cannot exceed 100, got {}",
                self.confidence_threshold
            )));
        }
        Ok(())
    }

    fn total_weight(&self) -> f64 {
        self.forward_weight + self.reverse_weight + self.lexical_weight
    }

    /// Rules 1 and 2; the first one that fires wins
    pub fn short_circuit(&self, forward: &Verdict, reverse: &Verdict) -> Option<RuleHit> {
        let threshold = self.confidence_threshold;

        if forward.label() == VerdictLabel::Sensitive && forward.confidence() > threshold {
            return Some(RuleHit {
                rule: DecisionRule::ForwardSensitive,
                confidence: forward.confidence(),
            });
        }
        if reverse.label() == VerdictLabel::NonPublic && reverse.confidence() > threshold {
            return Some(RuleHit {
                rule: DecisionRule::ReverseNonPublic,
                confidence: reverse.confidence(),
            });
        }
        None
    }

    /// `Σ wᵢ·sᵢ / Σ wᵢ` over forward, reverse and the (zero) lexical score
    pub fn aggregate(&self, forward: &Verdict, reverse: &Verdict) -> f64 {
        let total = self.total_weight();
        if total <= 0.0 {
            return 0.0;
        }
        let weighted = self.forward_weight * f64::from(forward.sensitivity_score())
            + self.reverse_weight * f64::from(reverse.sensitivity_score());
        weighted / total
    }

    /// Rule 3 evaluated deterministically; ties go to non-sensitive
    pub fn weigh(&self, forward: &Verdict, reverse: &Verdict) -> WeightedOutcome {
        let aggregate = self.aggregate(forward, reverse);
        WeightedOutcome {
            aggregate,
            is_sensitive: aggregate > 0.0,
            confidence: aggregate.abs().round().min(100.0) as u8,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, PolicyError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| PolicyError::InvalidValue {
                    key: key.to_string(),
                    value: raw,
                })
        }
        _ => Ok(None),
    }
}
