//! Prompt templates
//!
//! Every model-facing text lives in a `.j2` template with named slots. The built-in set is
//! embedded at compile time; a prompts directory may override any subset of it by file name.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Failed to read prompt template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid prompt template {name}: {message}")]
    Template { name: &'static str, message: String },

    #[error("Failed to render prompt {name}: {message}")]
    Render { name: &'static str, message: String },
}

/// Named template slots known to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// System instructions of the forward "is it sensitive" analysis
    Forward,
    /// System instructions of the reverse "is it public" analysis
    Reverse,
    /// User message carrying the document; slots `title`, `content`
    Document,
    /// System instructions of the decision model; weight slots
    Decision,
    /// User message of the decision model; verdicts plus `aggregate`
    DecisionInput,
}

impl PromptKind {
    pub const ALL: [PromptKind; 5] = [
        PromptKind::Forward,
        PromptKind::Reverse,
        PromptKind::Document,
        PromptKind::Decision,
        PromptKind::DecisionInput,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            PromptKind::Forward => "forward.j2",
            PromptKind::Reverse => "reverse.j2",
            PromptKind::Document => "document.j2",
            PromptKind::Decision => "decision.j2",
            PromptKind::DecisionInput => "decision_input.j2",
        }
    }

    fn builtin(&self) -> &'static str {
        match self {
            PromptKind::Forward => include_str!("../../resources/prompts/forward.j2"),
            PromptKind::Reverse => include_str!("../../resources/prompts/reverse.j2"),
            PromptKind::Document => include_str!("../../resources/prompts/document.j2"),
            PromptKind::Decision => include_str!("../../resources/prompts/decision.j2"),
            PromptKind::DecisionInput => {
                include_str!("../../resources/prompts/decision_input.j2")
            }
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Compiled prompt templates, shared read-only across runs
pub struct PromptLibrary {
    env: Environment<'static>,
}

impl PromptLibrary {
    pub fn builtin() -> Result<Self, PromptError> {
        Self::load(None)
    }

    /// Built-in templates, with files from `dir` taking precedence where present
    pub fn load(dir: Option<&Path>) -> Result<Self, PromptError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        let mut overridden = 0usize;
        for kind in PromptKind::ALL {
            let source = match dir.map(|d| d.join(kind.file_name())) {
                Some(path) if path.is_file() => {
                    debug!(template = %kind, path = %path.display(), "Using prompt override");
                    overridden += 1;
                    std::fs::read_to_string(&path)
                        .map_err(|source| PromptError::Io { path, source })?
                }
                _ => kind.builtin().to_string(),
            };

            env.add_template_owned(kind.file_name(), source)
                .map_err(|e| PromptError::Template {
                    name: kind.file_name(),
                    message: e.to_string(),
                })?;
        }

        if let Some(dir) = dir {
            info!(dir = %dir.display(), overridden, "Prompt templates loaded");
        }

        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, kind: PromptKind, ctx: S) -> Result<String, PromptError> {
        let template = self
            .env
            .get_template(kind.file_name())
            .map_err(|e| PromptError::Template {
                name: kind.file_name(),
                message: e.to_string(),
            })?;

        template
            .render(ctx)
            .map(|text| text.trim().to_string())
            .map_err(|e| PromptError::Render {
                name: kind.file_name(),
                message: e.to_string(),
            })
    }
}

impl fmt::Debug for PromptLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptLibrary")
            .field("templates", &PromptKind::ALL.len())
            .finish()
    }
}
