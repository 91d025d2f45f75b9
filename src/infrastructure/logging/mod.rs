//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - Pretty or JSON console output
//! - Rolling JSON log files with retention cleanup
//! - Secret scrubbing of every sink

pub mod config;
pub mod logger;
pub mod retention;
pub mod secret_scrubbing;

pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
pub use retention::cleanup_old_logs;
pub use secret_scrubbing::{ScrubbingMakeWriter, SecretScrubber};
