pub mod classifier;
pub mod context;
pub mod orchestrator;
pub mod phase_trait;
pub mod phases;
pub mod state;

pub use classifier::Classifier;
pub use context::PipelineContext;
pub use orchestrator::PipelineOrchestrator;
pub use phase_trait::WorkflowPhase;
pub use state::{
    normalize_content, ClassificationOutcome, ClassificationRequest, ClassificationState,
    DecisionStatus, EvidenceEntry, Stage,
};
