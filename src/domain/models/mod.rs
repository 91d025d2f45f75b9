pub mod analysis;
pub mod chat;
pub mod config;
pub mod content;
pub mod evaluation;
pub mod finding;
pub mod persona;
pub mod trend;

pub use analysis::{
    AnalysisRecord, AnalysisStatus, CategoryScore, CompetitorQuickResult, CompetitorTarget,
    PersonaResult, PersonaStatus,
};
pub use chat::{
    context_window, validate_chat_message, ChatContext, ChatMessage, ChatRole, MAX_CHATS,
    MAX_CHAT_CONTEXT_MESSAGES, MAX_CHAT_MESSAGE_CHARS,
};
pub use config::{
    Config, DatabaseConfig, FetcherConfig, LoggingConfig, OracleConfig, RateLimitConfig,
};
pub use content::{Image, Link, PerformanceHints, ScrapedContent};
pub use evaluation::{clamp_score, CompetitorComparison, Evaluation, QuickScan};
pub use finding::{
    EffortLevel, EnrichedFinding, Finding, FindingEstimate, ImprovementRoadmap, PriorityItem,
    RoadmapPhase, Severity,
};
pub use persona::{default_personas, Persona, PersonaCategory, PersonaDraft};
pub use trend::{
    normalize_url, HistoryItem, TrendDataPoint, UrlTrend, MAX_HISTORY_ENTRIES, MAX_TREND_POINTS,
};
