//! secdoc - sensitive-document classification
//!
//! A document is screened in two layers. A lexicon of keywords and regex phrases catches
//! explicit markings ("内部参阅", "机密", budget approvals awaiting sign-off) and decides
//! immediately. Everything else is judged by a language model twice: once asked whether the
//! document is sensitive, once asked whether it could be made public. A decision stage then
//! applies two confidence rules and otherwise combines both verdicts with policy weights.
//!
//! # Core Concepts
//!
//! - **Lexicon**: keyword and phrase pattern sets, loaded from JSON/YAML or built in
//! - **Verdict**: the `{result, confidence, evidence}` judgment a model returns, parsed
//!   tolerantly from messy output
//! - **Workflow**: `start → hard_condition → semantic_forward → semantic_reverse → decision`,
//!   with a fast path from `hard_condition` straight to `decision`
//! - **Streaming**: the decision is delivered as `token` events followed by exactly one
//!   `done` or `error` event
//!
//! # Example Usage
//!
//! ```no_run
//! use secdoc::{ClassificationRequest, Classifier, SecdocConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SecdocConfig::from_env()?;
//! let classifier = Classifier::from_config(&config)?;
//!
//! let outcome = classifier
//!     .classify(ClassificationRequest::new("会议纪要", "本文件为内部参阅材料"))
//!     .await?;
//! println!("sensitive={} confidence={}", outcome.is_sensitive, outcome.confidence);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`lexicon`]: keyword/phrase matching
//! - [`verdict`]: verdict schema, sanitizer and tolerant parser
//! - [`prompt`]: instruction templates
//! - [`policy`]: decision rules and weights
//! - [`pipeline`]: workflow stages, orchestrator and [`Classifier`]
//! - [`stream`]: streaming events and SSE framing
//! - [`llm`]: language-model client abstraction

pub mod cli;
pub mod config;
pub mod error;
pub mod lexicon;
pub mod llm;
pub mod pipeline;
pub mod policy;
pub mod progress;
pub mod prompt;
pub mod stream;
pub mod util;
pub mod verdict;

pub use config::{ConfigError, SecdocConfig};
pub use error::ClassifyError;
pub use lexicon::{LexicalMatch, Lexicon, LexiconError, PatternKind};
pub use llm::{BackendError, GenAIClient, LLMClient, MockLLMClient, MockResponse};
pub use pipeline::{
    ClassificationOutcome, ClassificationRequest, ClassificationState, Classifier,
    DecisionStatus, PipelineContext, Stage,
};
pub use policy::{DecisionPolicy, DecisionStrategy};
pub use prompt::{PromptError, PromptLibrary};
pub use stream::{ClassificationStream, StreamEvent};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};
pub use verdict::{parse_verdict, Verdict, VerdictLabel};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
