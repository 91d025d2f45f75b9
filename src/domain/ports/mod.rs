pub mod fetcher;
pub mod oracle;
pub mod stores;

pub use fetcher::{FetchError, SiteFetcher};
pub use oracle::{OracleError, ScoringOracle};
pub use stores::{
    AnalysisStores, ChatRepository, HistoryRepository, PersonaRepository, Repositories, TrendRepository,
};
