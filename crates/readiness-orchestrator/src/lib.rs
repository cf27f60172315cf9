pub mod assembler;
pub mod business;
pub mod checklist;
pub mod classify;
pub mod layers;
pub mod logic;
pub mod memory_store;
pub mod progressive;
pub mod service;

pub use assembler::{new_validation_id, AssemblyInput, ReportAssembler};
pub use business::BusinessContextAnalyzer;
pub use checklist::{build_checklist, build_summary};
pub use classify::{classify_error, classify_message, ErrorClass};
pub use layers::{LayerAnalyzers, LayerOrchestrator, LayerOutcome};
pub use logic::DepthAwareLogicAnalyzer;
pub use memory_store::MemoryReportStore;
pub use progressive::ProgressiveAnalyzer;
pub use service::{AnalysisService, Collaborators};
