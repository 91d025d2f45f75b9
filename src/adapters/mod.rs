//! Store adapters for the persona, history, trend and chat ports.

pub mod memory;
pub mod sqlite;

pub use memory::{
    in_memory_repositories, InMemoryChatRepository, InMemoryHistoryRepository,
    InMemoryPersonaRepository, InMemoryTrendRepository,
};
