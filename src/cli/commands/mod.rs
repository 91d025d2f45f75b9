//! CLI command implementations.

pub mod analyze;
pub mod chat;
pub mod history;
pub mod personas;
pub mod roadmap;
pub mod trend;
