pub mod analysis_orchestrator;
pub mod persona_assist;
pub mod persona_chat;
pub mod report;
pub mod roadmap_estimator;
pub mod score_aggregator;
pub mod share;

pub use analysis_orchestrator::{
    AnalysisEvent, AnalysisOrchestrator, AnalysisOutcome, AnalysisRequest,
    MAX_CONCURRENT_EVALUATIONS,
};
pub use persona_assist::{validate_theme, MAX_THEME_LEN};
pub use persona_chat::{ChatError, PersonaChat};
pub use share::{SharePayload, ShareError, SHARE_VERSION};
