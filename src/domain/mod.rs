//! Domain layer for the siteprobe analysis pipeline
//!
//! This module contains core models, the analysis status machine and the
//! ports that adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
