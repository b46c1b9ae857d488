//! Errors surfaced by a classification run

use crate::config::ConfigError;
use crate::lexicon::LexiconError;
use crate::llm::BackendError;
use crate::prompt::PromptError;
use crate::verdict::VerdictParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// A model reply could not be parsed. Stages recover from this with a degraded
    /// verdict or an inconclusive decision; it never leaves the pipeline.
    #[error("Malformed model response in {stage}: {source}")]
    MalformedModelResponse {
        stage: &'static str,
        #[source]
        source: VerdictParseError,
    },

    /// The language-model capability failed (network, auth, timeout, interrupted stream)
    #[error("Language model unavailable: {0}")]
    CapabilityUnavailable(#[from] BackendError),

    #[error("Missing required configuration: {key}")]
    ConfigurationMissing { key: String },

    #[error("Invalid input: {0}")]
    InputInvalid(String),

    /// The streaming listener went away before the run finished
    #[error("Classification cancelled: listener disconnected")]
    Cancelled,

    #[error(transparent)]
    Config(ConfigError),

    #[error(transparent)]
    Lexicon(#[from] LexiconError),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl From<ConfigError> for ClassifyError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::MissingKey { key } => ClassifyError::ConfigurationMissing { key },
            other => ClassifyError::Config(other),
        }
    }
}

impl ClassifyError {
    /// True for failures of the model capability, as opposed to setup or input problems
    pub fn is_capability_failure(&self) -> bool {
        matches!(self, ClassifyError::CapabilityUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_maps_to_configuration_missing() {
        let err: ClassifyError = ConfigError::MissingKey {
            key: "SECDOC_MODEL".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            ClassifyError::ConfigurationMissing { ref key } if key == "SECDOC_MODEL"
        ));
    }

    #[test]
    fn test_other_config_errors_wrapped() {
        let err: ClassifyError = ConfigError::InvalidProvider("watson".to_string()).into();
        assert!(matches!(err, ClassifyError::Config(_)));
        assert!(err.to_string().contains("watson"));
    }

    #[test]
    fn test_backend_error_is_capability_failure() {
        let err: ClassifyError = BackendError::TimeoutError { seconds: 60 }.into();
        assert!(err.is_capability_failure());
        assert!(err.to_string().contains("60"));
        assert!(!ClassifyError::Cancelled.is_capability_failure());
    }
}
