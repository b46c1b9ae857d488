//! Output formatting for classification results
//!
//! Verdicts, lexicon scans and the configuration can be rendered as JSON, YAML or
//! human-readable text. Streaming output does not go through here; it is written as
//! SSE frames by the `stream` command.

use anyhow::{Context, Result};

use crate::config::SecdocConfig;
use crate::lexicon::LexicalMatch;
use crate::pipeline::{ClassificationOutcome, DecisionStatus};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a classification outcome according to the configured format
    pub fn format(&self, outcome: &ClassificationOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(outcome)
                .context("Failed to serialize classification result to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(outcome)
                .context("Failed to serialize classification result to YAML"),
            OutputFormat::Human => Ok(self.format_outcome_human(outcome)),
        }
    }

    /// Formats the result of a lexicon-only scan
    pub fn format_scan(&self, hit: Option<&LexicalMatch>) -> Result<String> {
        let value = serde_json::json!({
            "hit": hit.is_some(),
            "match": hit,
        });
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&value).context("Failed to serialize scan to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(&value).context("Failed to serialize scan to YAML")
            }
            OutputFormat::Human => Ok(match hit {
                Some(hit) => format!(
                    "\u{26A0} Lexicon hit ({})\n{}\nCategory: {}\nPattern:  {}\nMatched:  {}\n",
                    hit.kind, RULE, hit.category, hit.pattern, hit.matched_text
                ),
                None => "\u{2713} No keyword or phrase matched\n".to_string(),
            }),
        }
    }

    /// Formats configuration display
    pub fn format_config(&self, config: &SecdocConfig) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&config.to_display_map())
                .context("Failed to serialize config to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(&config.to_display_map())
                .context("Failed to serialize config to YAML"),
            OutputFormat::Human => Ok(config.to_string()),
        }
    }

    fn format_outcome_human(&self, outcome: &ClassificationOutcome) -> String {
        let mut output = String::new();

        let header = match (outcome.status, outcome.is_sensitive) {
            (DecisionStatus::Inconclusive, _) => "? Inconclusive",
            (_, true) => "\u{26A0} Sensitive",
            (_, false) => "\u{2713} Not sensitive",
        };
        output.push_str(header);
        output.push('\n');
        output.push_str(RULE);
        output.push_str("\n\n");

        let filled = usize::from(outcome.confidence.min(100) / 10);
        let bar = "\u{2588}".repeat(filled) + &"\u{2591}".repeat(10 - filled);
        output.push_str(&format!("Confidence: {} {}%\n\n", bar, outcome.confidence));

        if outcome.evidence.is_empty() {
            output.push_str("Evidence: (none)\n");
        } else {
            output.push_str("Evidence:\n");
            for line in outcome.evidence.lines() {
                output.push_str(&format!("  {}\n", line));
            }
        }

        output
    }
}
