// Workflow stages of the classification pipeline
//
// Each stage takes the state by value and returns the next one. The orchestrator decides
// which stage runs next.

pub mod llm_helper;

#[path = "01_start.rs"]
pub mod start;
#[path = "02_hard_condition.rs"]
pub mod hard_condition;
#[path = "03_semantic.rs"]
pub mod semantic;
#[path = "04_decision.rs"]
pub mod decision;

pub use decision::DecisionPhase;
pub use hard_condition::HardConditionPhase;
pub use semantic::{AnalysisPhase, AnalysisRole};
pub use start::StartPhase;
